//! Serial Protocol Communication
//!
//! Implements the TCM 1601 request/response protocol: fixed-width ASCII
//! frames terminated by a carriage return and guarded by an additive
//! checksum.
//!
//! Wire layout (request or response):
//!
//! ```text
//! <address:3><action:2><parameter:4><length:2><data:0..99><checksum:3><CR>
//! ```

pub mod converter;
mod error;
pub mod frame;
pub mod lock;
pub mod message;
mod transaction;
pub mod transport;

pub use converter::{Converter, Value};
pub use error::ProtocolError;
pub use frame::{Action, Frame};
pub use lock::{FileLock, FileLockGuard, TransportLock};
pub use message::{Message, MessageKind};
pub use transaction::{Protocol, ProtocolConfig, TransactionState};
pub use transport::{ScopedTransport, SerialTransport, Transport, TransportConfig};

/// Carriage return closing every frame
pub const TERMINATOR: u8 = 0x0D;

/// Data field of every read request
pub const QUERY_MARKER: &str = "=?";

/// Width of the address field
pub const ADDRESS_WIDTH: usize = 3;

/// Width of the action field
pub const ACTION_WIDTH: usize = 2;

/// Width of the parameter number field
pub const PARAMETER_WIDTH: usize = 4;

/// Width of the data length field
pub const LENGTH_WIDTH: usize = 2;

/// Width of the checksum field
pub const CHECKSUM_WIDTH: usize = 3;

/// Largest payload the two-digit length field can describe
pub const MAX_DATA_LEN: usize = 99;

/// Default baud rate of the controller's RS-485 interface
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for responses in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Default time to wait for the transport lock in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Bytes discarded per read while clearing the input buffer
pub const CLEAR_CHUNK_SIZE: usize = 32;
