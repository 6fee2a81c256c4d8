//! Source stream helpers shared by the drivers

use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};

/// Read from `source` until `buf` is full or the stream ends
///
/// Returns the number of bytes placed in `buf`.
pub(crate) fn read_filled<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match source.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(got)
}

/// Fill `buf` completely from `source`, failing with [`Error::Underrun`]
/// if the stream ends first
pub(crate) fn fill_exact<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    let got = read_filled(source, buf)?;
    if got < buf.len() {
        return Err(Error::Underrun {
            expected: buf.len(),
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_exact_reports_underrun() {
        let mut source: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 8];
        match fill_exact(&mut source, &mut buf) {
            Err(Error::Underrun { expected: 8, got: 3 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn read_filled_handles_empty_source() {
        let mut source: &[u8] = &[];
        let mut buf = [0u8; 4];
        assert_eq!(read_filled(&mut source, &mut buf).unwrap(), 0);
    }
}
