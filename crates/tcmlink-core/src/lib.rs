//! # tcmlink Core Library
//!
//! Core functionality for talking to Pfeiffer TCM 1601 turbopump controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Fixed-width ASCII frame encoding/decoding with additive checksum
//! - Typed converters between wire fields and semantic values
//! - A locked write-then-read transaction over a shared serial line
//! - Named pump operations built on the parameter numbers
//!
//! ## Example
//!
//! ```rust,ignore
//! use tcmlink_core::driver::open_serial;
//! use tcmlink_core::protocol::{ProtocolConfig, TransportConfig};
//!
//! let mut pump = open_serial(
//!     TransportConfig::new("/dev/ttyUSB0"),
//!     ProtocolConfig::default(),
//! );
//! pump.clear()?;
//! println!("Rotation speed: {} Hz", pump.actual_rotation_speed()?);
//! ```

pub mod driver;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::driver::{open_serial, Tcm1601};
    pub use crate::protocol::{
        Converter, FileLock, Frame, Message, Protocol, ProtocolConfig, ProtocolError,
        SerialTransport, Transport, TransportConfig, TransportLock, Value,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
