//! Serial-port motion link.

use std::{io::BufReader, time::Duration};

use client_core::LineLink;
use serialport::SerialPort;
use tracing::info;

pub struct SerialConnection {
    pub link: LineLink<Box<dyn SerialPort>>,
    pub reader: BufReader<Box<dyn SerialPort>>,
}

/// Opens `path`. The read timeout bounds each wait of the background reader.
pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> serialport::Result<SerialConnection> {
    let port = serialport::new(path, baud_rate).timeout(read_timeout).open()?;
    let reader = BufReader::new(port.try_clone()?);
    info!(port = path, baud_rate, "motion link connected");

    Ok(SerialConnection {
        link: LineLink::new(port),
        reader,
    })
}
