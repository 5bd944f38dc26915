//! Shared test fixtures

#![allow(dead_code)]

use std::io;
use std::time::Duration;

use tcmlink_core::protocol::{Action, FileLock, Frame, Protocol, ProtocolError, Transport};
use tempfile::TempDir;

/// Scripted transport: replays `recv_buffer` and records what was sent
pub struct MockTransport {
    pub name: String,
    pub send_buffer: Vec<u8>,
    pub recv_buffer: Vec<u8>,
    pub recv_idx: usize,
    pub is_open: bool,
    pub opens: usize,
    pub closes: usize,
    pub fail_on_send: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            name: "/dev/ttyMOCK0".to_string(),
            send_buffer: Vec::new(),
            recv_buffer: Vec::new(),
            recv_idx: 0,
            is_open: false,
            opens: 0,
            closes: 0,
            fail_on_send: false,
        }
    }

    pub fn with_response(response: Vec<u8>) -> Self {
        let mut mock = Self::new();
        mock.recv_buffer = response;
        mock
    }

    pub fn push_response(&mut self, response: &[u8]) {
        self.recv_buffer.extend_from_slice(response);
    }

    pub fn remaining(&self) -> usize {
        self.recv_buffer.len() - self.recv_idx
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "mock not open"))
        }
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "mock timeout")
}

impl Transport for MockTransport {
    fn identity(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), ProtocolError> {
        self.opens += 1;
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
        self.is_open = false;
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        if self.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        self.send_buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn read_until(&mut self, delimiter: u8) -> io::Result<Vec<u8>> {
        self.ensure_open()?;
        let mut out = Vec::new();
        while self.recv_idx < self.recv_buffer.len() {
            let byte = self.recv_buffer[self.recv_idx];
            self.recv_idx += 1;
            out.push(byte);
            if byte == delimiter {
                return Ok(out);
            }
        }
        Err(timed_out())
    }

    fn read_chunk(&mut self, n: usize) -> io::Result<Vec<u8>> {
        self.ensure_open()?;
        if self.remaining() == 0 {
            return Err(timed_out());
        }
        let end = (self.recv_idx + n).min(self.recv_buffer.len());
        let chunk = self.recv_buffer[self.recv_idx..end].to_vec();
        self.recv_idx = end;
        Ok(chunk)
    }
}

/// Well-formed frame as the controller would answer it
pub fn response(address: i64, action: Action, parameter: i64, data: &str) -> Vec<u8> {
    let mut frame = Frame::new(action);
    frame.set_address(address).unwrap();
    frame.set_parameter(parameter).unwrap();
    if action == Action::Write {
        frame.set_data(data).unwrap();
    }
    frame.serialize()
}

/// Protocol with a short-timeout lock in a private directory
pub fn protocol(address: u16) -> (Protocol<FileLock>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let lock = FileLock::new(dir.path(), Duration::from_millis(100));
    (Protocol::with_lock(address, lock), dir)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
