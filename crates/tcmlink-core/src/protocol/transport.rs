//! Transport handling
//!
//! The transaction layer only needs a byte pipe that can be opened and
//! closed around each exchange and that signals timeouts with
//! [`io::ErrorKind::TimedOut`]. Opening reports [`ProtocolError`] directly
//! so backend failures keep their kind. [`SerialTransport`] provides it on top of
//! the `serialport` crate.

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Byte pipe to the controller
pub trait Transport {
    /// Name identifying the underlying channel, shared by every process
    /// that talks to it (e.g. the serial device path)
    fn identity(&self) -> &str;

    /// Acquire the underlying channel
    fn open(&mut self) -> Result<(), ProtocolError>;

    /// Release the underlying channel
    fn close(&mut self);

    /// Write all bytes
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read up to and including `delimiter`
    fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>>;

    /// Read at most `n` bytes
    fn read_chunk(&mut self, n: usize) -> io::Result<Vec<u8>>;
}

/// Keeps a transport open for its lifetime and closes it on drop
pub struct ScopedTransport<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: Transport + ?Sized> ScopedTransport<'a, T> {
    /// Open `transport` for the lifetime of the returned guard
    pub fn open(transport: &'a mut T) -> Result<Self, ProtocolError> {
        transport.open()?;
        Ok(Self { transport })
    }
}

impl<T: Transport + ?Sized> Deref for ScopedTransport<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for ScopedTransport<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.transport
    }
}

impl<T: Transport + ?Sized> Drop for ScopedTransport<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Serial port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl TransportConfig {
    /// Default settings for the given port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Serial port transport, 8N1 without flow control.
///
/// The port is opened by [`Transport::open`] and dropped by
/// [`Transport::close`], so the device node is only held while an
/// exchange is running.
pub struct SerialTransport {
    config: TransportConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a transport (not yet opened)
    pub fn new(config: TransportConfig) -> Self {
        Self { config, port: None }
    }

    /// Line settings
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether the port is currently held
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is not open"))
    }

    /// Open and configure the port
    pub fn open_port(config: &TransportConfig) -> Result<Box<dyn SerialPort>, ProtocolError> {
        serialport::new(&config.port_name, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout())
            .open()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }
}

impl Transport for SerialTransport {
    fn identity(&self) -> &str {
        &self.config.port_name
    }

    fn open(&mut self) -> Result<(), ProtocolError> {
        if self.port.is_none() {
            self.port = Some(Self::open_port(&self.config)?);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout();
        let port = self.port()?;
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if Instant::now() > deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no delimiter after {} bytes", buf.len()),
                ));
            }
            match port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => {
                    buf.push(byte[0]);
                    if byte[0] == delimiter {
                        return Ok(buf);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn read_chunk(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let port = self.port()?;
        let mut buf = vec![0u8; n];
        let read = port.read(&mut buf)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data available"));
        }
        buf.truncate(read);
        Ok(buf)
    }
}
