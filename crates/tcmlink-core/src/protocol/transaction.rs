//! Transaction execution
//!
//! Runs one write-then-read exchange with the controller while holding the
//! transport lock for the whole round trip.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use super::{
    Converter, FileLock, Frame, Message, ProtocolError, ScopedTransport, Transport,
    TransportLock, Value, CLEAR_CHUNK_SIZE, DEFAULT_LOCK_TIMEOUT_MS, TERMINATOR,
};

/// Progress of the current (or last) exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Nothing in flight
    Idle,
    /// Transport lock taken
    LockHeld,
    /// Request written
    Sent,
    /// Waiting for the terminator
    AwaitingResponse,
    /// Response decoded
    Parsed,
    /// Exchange aborted with an error
    Failed,
    /// Transport lock given back
    LockReleased,
}

/// Protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Device address stamped on every request
    pub address: u16,
    /// Directory holding the transport lock files
    pub lock_dir: PathBuf,
    /// How long to wait for another process to release the transport
    pub lock_timeout_ms: u64,
}

impl ProtocolConfig {
    /// File lock described by this configuration
    pub fn file_lock(&self) -> FileLock {
        FileLock::new(&self.lock_dir, Duration::from_millis(self.lock_timeout_ms))
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            address: 0,
            lock_dir: std::env::temp_dir(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

/// Executes request/response exchanges over a shared transport.
///
/// Exchanges take `&mut self`: one protocol instance drives one exchange
/// at a time.
pub struct Protocol<L: TransportLock = FileLock> {
    address: u16,
    lock: L,
    state: TransactionState,
}

impl Protocol<FileLock> {
    /// Create a protocol using a lock file per transport
    pub fn new(config: ProtocolConfig) -> Self {
        Self::with_lock(config.address, config.file_lock())
    }
}

impl Default for Protocol<FileLock> {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}

impl<L: TransportLock> Protocol<L> {
    /// Create a protocol with a custom lock
    pub fn with_lock(address: u16, lock: L) -> Self {
        Self {
            address,
            lock,
            state: TransactionState::Idle,
        }
    }

    /// Device address stamped on every request
    pub fn address(&self) -> u16 {
        self.address
    }

    /// State reached by the last exchange
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Lock guarding the transport
    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Address the message and encode it.
    ///
    /// Returns the request bytes and the converter for the response payload.
    pub fn create_message(&self, message: Message) -> Result<(Vec<u8>, Converter), ProtocolError> {
        let (mut frame, output) = message.into_parts();
        frame.set_address(i64::from(self.address))?;
        Ok((frame.serialize(), output))
    }

    /// Send `message` and return the decoded response payload
    pub fn execute<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        message: Message,
    ) -> Result<Value, ProtocolError> {
        let (request, output) = self.create_message(message)?;
        let response = self.locked(transport, |protocol, transport| {
            protocol.exchange(transport, &request)
        })?;
        output.to_semantic(response.data())
    }

    /// Discard everything waiting in the transport's input buffer.
    ///
    /// Reads fixed-size chunks until the transport times out, which is the
    /// normal end of the drain. Returns the number of discarded bytes.
    pub fn clear<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize, ProtocolError> {
        self.locked(transport, |_, transport| {
            let mut channel = ScopedTransport::open(transport)?;
            tracing::debug!("Clearing message buffer...");
            let mut discarded = 0;
            loop {
                match channel.read_chunk(CLEAR_CHUNK_SIZE) {
                    Ok(bytes) => discarded += bytes.len(),
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                        tracing::debug!("Cleared {} bytes", discarded);
                        return Ok(discarded);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        })
    }

    /// Run `f` with the transport lock held; the lock is released on
    /// every exit path
    fn locked<T, R, F>(&mut self, transport: &mut T, f: F) -> Result<R, ProtocolError>
    where
        T: Transport + ?Sized,
        F: FnOnce(&mut Self, &mut T) -> Result<R, ProtocolError>,
    {
        self.transition(TransactionState::Idle);
        let guard = match self.lock.acquire(transport.identity()) {
            Ok(guard) => guard,
            Err(e) => {
                self.transition(TransactionState::Failed);
                return Err(e);
            }
        };
        self.transition(TransactionState::LockHeld);

        let result = f(self, transport);
        if let Err(e) = &result {
            tracing::debug!("exchange failed: {}", e);
            self.transition(TransactionState::Failed);
        }

        drop(guard);
        self.transition(TransactionState::LockReleased);
        result
    }

    fn exchange<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        request: &[u8],
    ) -> Result<Frame, ProtocolError> {
        let response = {
            let mut channel = ScopedTransport::open(transport)?;
            tracing::debug!("Sending: {:?}", String::from_utf8_lossy(request));
            channel.write(request)?;
            self.transition(TransactionState::Sent);

            self.transition(TransactionState::AwaitingResponse);
            channel.read_until(TERMINATOR).map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut => ProtocolError::CommunicationTimeout,
                _ => ProtocolError::IoError(e),
            })?
        };
        tracing::debug!("Response: {:?}", String::from_utf8_lossy(&response));

        let frame = Frame::parse(&response)?;
        self.transition(TransactionState::Parsed);
        Ok(frame)
    }

    fn transition(&mut self, next: TransactionState) {
        tracing::trace!("transaction state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
