//! EEPROM command implementations

use std::path::Path;

use memprog_core::{Eeprom, EepromModel, I2cPort};
use memprog_dummy::DummyEeprom;
use memprog_ftdi::{FtdiI2c, Hardware, I2cConfig};

use super::{byte_progress, open_sink, open_source, PortSpec};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the port and bind it to the named model
fn open_eeprom(
    spec: &PortSpec,
    hardware: Hardware,
    model: &str,
    address: u32,
) -> Result<Eeprom<Box<dyn I2cPort>>, Box<dyn std::error::Error>> {
    if address > 0x7F {
        return Err(format!("Invalid I2C address {:#x}: must be 7-bit", address).into());
    }

    let port: Box<dyn I2cPort> = match spec {
        PortSpec::Dummy => Box::new(DummyEeprom::new(model)?),
        PortSpec::Ftdi(options) => {
            // The adapter is bound to the slave address and word-address
            // width up front; the driver then re-resolves the same model
            let geometry = EepromModel::lookup(model)
                .ok_or_else(|| memprog_core::Error::UnsupportedModel(model.into()))?;
            let config = I2cConfig {
                options: options.clone(),
                hardware,
                ..I2cConfig::default()
            };
            Box::new(FtdiI2c::open(&config, address as u8, geometry.addr_bytes)?)
        }
    };

    Ok(Eeprom::new(port, model)?)
}

/// Run the eeprom read command
pub fn run_read(
    spec: &PortSpec,
    hardware: Hardware,
    model: &str,
    address: u32,
    offset: u32,
    count: u32,
    dst: Option<&Path>,
) -> CmdResult {
    let mut eeprom = open_eeprom(spec, hardware, model, address)?;
    let sink = open_sink(dst)?;

    let pb = byte_progress(count as u64)?;
    let mut sink = pb.wrap_write(sink);
    eeprom.read(&mut sink, offset, count as usize)?;
    pb.finish_with_message("Read complete");

    Ok(())
}

/// Run the eeprom write command
pub fn run_write(
    spec: &PortSpec,
    hardware: Hardware,
    model: &str,
    address: u32,
    offset: u32,
    count: u32,
    src: Option<&Path>,
) -> CmdResult {
    let mut eeprom = open_eeprom(spec, hardware, model, address)?;
    let source = open_source(src)?;

    let pb = byte_progress(count as u64)?;
    let mut source = pb.wrap_read(source);
    eeprom.write(&mut source, offset, count as usize)?;
    pb.finish_with_message("Write complete");

    Ok(())
}
