//! Frame encoding/decoding
//!
//! Implements the fixed-width ASCII record exchanged with the controller.
//!
//! Frame format:
//! - 3 chars: Address (zero-padded decimal)
//! - 2 chars: Action (`00` read, `10` write)
//! - 4 chars: Parameter number (zero-padded decimal)
//! - 2 chars: Data length (zero-padded decimal)
//! - N chars: Data (at most 99)
//! - 3 chars: Checksum (byte sum of all preceding fields mod 256)
//! - 1 byte: Carriage return

use std::fmt;

use super::{
    ProtocolError, ACTION_WIDTH, ADDRESS_WIDTH, CHECKSUM_WIDTH, LENGTH_WIDTH, MAX_DATA_LEN,
    PARAMETER_WIDTH, QUERY_MARKER, TERMINATOR,
};

/// Characters preceding the data field
const HEADER_LEN: usize = ADDRESS_WIDTH + ACTION_WIDTH + PARAMETER_WIDTH + LENGTH_WIDTH;

/// Shortest possible frame: empty data field
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_WIDTH + 1;

/// Direction of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Query a parameter (`00`)
    Read,
    /// Set a parameter (`10`)
    Write,
}

impl Action {
    /// Wire code of the action
    pub fn code(&self) -> &'static str {
        match self {
            Action::Read => "00",
            Action::Write => "10",
        }
    }

    /// Decode a wire action code
    pub fn from_code(code: &str) -> Result<Self, ProtocolError> {
        match code {
            "00" => Ok(Action::Read),
            "10" => Ok(Action::Write),
            other => Err(ProtocolError::InvalidAction(other.to_string())),
        }
    }
}

/// One wire record, request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    address: u16,
    action: Action,
    parameter: u16,
    data: String,
    checksum: u16,
}

impl Frame {
    /// Create a frame for the given action.
    ///
    /// Read frames start out carrying the query marker, write frames an
    /// empty payload. Every setter keeps the checksum current.
    pub fn new(action: Action) -> Self {
        let data = match action {
            Action::Read => QUERY_MARKER.to_string(),
            Action::Write => String::new(),
        };
        let mut frame = Self {
            address: 0,
            action,
            parameter: 0,
            data,
            checksum: 0,
        };
        frame.seal();
        frame
    }

    /// Decode a frame from raw bytes, terminator included.
    ///
    /// Parsing is all-or-nothing: every structural check and the checksum
    /// must pass before a frame is returned.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < MIN_FRAME_LEN {
            return Err(ProtocolError::MalformedFrame(format!(
                "{} bytes is shorter than the {} byte minimum",
                raw.len(),
                MIN_FRAME_LEN
            )));
        }

        let (body, last) = raw.split_at(raw.len() - 1);
        if last[0] != TERMINATOR {
            return Err(ProtocolError::MalformedFrame(
                "missing carriage return terminator".to_string(),
            ));
        }
        if body.contains(&TERMINATOR) {
            return Err(ProtocolError::MalformedFrame(
                "carriage return before end of frame".to_string(),
            ));
        }

        let text = std::str::from_utf8(body)
            .ok()
            .filter(|t| t.is_ascii())
            .ok_or_else(|| ProtocolError::MalformedFrame("frame is not ASCII".to_string()))?;

        let (header, rest) = text.split_at(HEADER_LEN);
        let (data, checksum_field) = rest.split_at(rest.len() - CHECKSUM_WIDTH);

        let action_end = ADDRESS_WIDTH + ACTION_WIDTH;
        let parameter_end = action_end + PARAMETER_WIDTH;

        let action = Action::from_code(&header[ADDRESS_WIDTH..action_end])?;
        if action == Action::Read && data != QUERY_MARKER {
            return Err(ProtocolError::PayloadMismatch(data.to_string()));
        }

        let declared = parse_digits("length", &header[parameter_end..])? as usize;
        if declared != data.len() {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let frame = Self {
            address: parse_digits("address", &header[..ADDRESS_WIDTH])?,
            action,
            parameter: parse_digits("parameter", &header[action_end..parameter_end])?,
            data: data.to_string(),
            checksum: parse_digits("checksum", checksum_field)?,
        };

        let expected = frame.compute_checksum();
        if expected != frame.checksum {
            return Err(ProtocolError::ChecksumMismatch {
                expected,
                actual: frame.checksum,
            });
        }

        Ok(frame)
    }

    /// Encode the frame to raw bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() + CHECKSUM_WIDTH + 1);
        bytes.extend_from_slice(self.checked_text().as_bytes());
        bytes.extend_from_slice(format!("{:03}", self.checksum).as_bytes());
        bytes.push(TERMINATOR);
        bytes
    }

    /// Set the device address
    pub fn set_address(&mut self, address: i64) -> Result<(), ProtocolError> {
        self.address = fit_field("address", address, ADDRESS_WIDTH)?;
        self.seal();
        Ok(())
    }

    /// Set the action code. Switching to [`Action::Read`] resets the
    /// payload to the query marker.
    pub fn set_action(&mut self, action: Action) {
        self.action = action;
        if action == Action::Read {
            self.data = QUERY_MARKER.to_string();
        }
        self.seal();
    }

    /// Set the parameter number
    pub fn set_parameter(&mut self, parameter: i64) -> Result<(), ProtocolError> {
        self.parameter = fit_field("parameter", parameter, PARAMETER_WIDTH)?;
        self.seal();
        Ok(())
    }

    /// Set the payload. The length field follows the payload.
    ///
    /// A read frame only carries the query marker.
    pub fn set_data(&mut self, data: impl Into<String>) -> Result<(), ProtocolError> {
        let data = data.into();
        if data.len() > MAX_DATA_LEN {
            return Err(ProtocolError::PayloadTooLarge(data.len()));
        }
        if self.action == Action::Read && data != QUERY_MARKER {
            return Err(ProtocolError::PayloadMismatch(data));
        }
        self.data = data;
        self.seal();
        Ok(())
    }

    fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Byte sum of address, action, parameter, length and data, mod 256
    pub fn compute_checksum(&self) -> u16 {
        let sum = self
            .checked_text()
            .bytes()
            .fold(0u32, |acc, b| acc + u32::from(b));
        (sum % 256) as u16
    }

    /// Whether the stored checksum matches the field values
    pub fn checksum_is_valid(&self) -> bool {
        self.compute_checksum() == self.checksum
    }

    /// Device address
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Action code
    pub fn action(&self) -> Action {
        self.action
    }

    /// Parameter number
    pub fn parameter(&self) -> u16 {
        self.parameter
    }

    /// Payload
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Byte length of the payload, as carried in the length field
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// Stored checksum
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Fields covered by the checksum, rendered as on the wire
    fn checked_text(&self) -> String {
        format!(
            "{:03}{}{:04}{:02}{}",
            self.address,
            self.action.code(),
            self.parameter,
            self.length(),
            self.data
        )
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}\\r", self.checked_text(), self.checksum)
    }
}

/// Validate a numeric field value against its rendered width
fn fit_field(field: &'static str, value: i64, width: usize) -> Result<u16, ProtocolError> {
    if value < 0 {
        return Err(ProtocolError::NegativeValue { field, value });
    }
    let rendered = format!("{:0width$}", value, width = width);
    if rendered.len() > width {
        return Err(ProtocolError::FieldTooLarge {
            field,
            value: rendered,
            width,
        });
    }
    // A value of at most four decimal digits always fits
    Ok(value as u16)
}

/// Parse a zero-padded decimal field, rejecting signs and spaces
fn parse_digits(field: &str, text: &str) -> Result<u16, ProtocolError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::MalformedFrame(format!(
            "{} field '{}' is not a decimal number",
            field, text
        )));
    }
    text.parse::<u16>().map_err(|_| {
        ProtocolError::MalformedFrame(format!("{} field '{}' is out of range", field, text))
    })
}
