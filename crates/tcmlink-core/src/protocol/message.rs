//! Request messages
//!
//! A message binds one outgoing [`Frame`] to the converters that translate
//! its payload on the way out and the response payload on the way back.

use super::{Action, Converter, Frame, ProtocolError, Value};

/// Kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Parameter query
    Read,
    /// Parameter command
    Write,
}

/// One request, submitted once to [`Protocol::execute`](super::Protocol::execute)
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Query: the payload is always the query marker
    Read {
        /// Outgoing frame
        frame: Frame,
        /// Applied to the response payload
        output: Converter,
    },
    /// Command: the payload is a caller value run through `input`
    Write {
        /// Outgoing frame
        frame: Frame,
        /// Applied to the value before sending
        input: Converter,
        /// Applied to the response payload
        output: Converter,
    },
}

impl Message {
    /// Create a parameter query
    pub fn read(output: Converter) -> Self {
        Message::Read {
            frame: Frame::new(Action::Read),
            output,
        }
    }

    /// Create a parameter command
    pub fn write(input: Converter, output: Converter) -> Self {
        Message::Write {
            frame: Frame::new(Action::Write),
            input,
            output,
        }
    }

    /// Kind of request
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Read { .. } => MessageKind::Read,
            Message::Write { .. } => MessageKind::Write,
        }
    }

    /// Set the parameter number addressed by this request
    pub fn set_parameter(&mut self, parameter: i64) -> Result<(), ProtocolError> {
        self.frame_mut().set_parameter(parameter)
    }

    /// Builder form of [`set_parameter`](Self::set_parameter)
    pub fn with_parameter(mut self, parameter: i64) -> Result<Self, ProtocolError> {
        self.set_parameter(parameter)?;
        Ok(self)
    }

    /// Encode `value` with the input converter and store it as payload.
    ///
    /// Queries carry nothing but the query marker, so this fails with
    /// `PayloadMismatch` on a read message.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), ProtocolError> {
        match self {
            Message::Read { .. } => Err(ProtocolError::PayloadMismatch(value.into().to_string())),
            Message::Write { frame, input, .. } => {
                let raw = input.to_raw(&value.into())?;
                frame.set_data(raw)
            }
        }
    }

    /// Builder form of [`set_value`](Self::set_value)
    pub fn with_value(mut self, value: impl Into<Value>) -> Result<Self, ProtocolError> {
        self.set_value(value)?;
        Ok(self)
    }

    /// Outgoing frame
    pub fn frame(&self) -> &Frame {
        match self {
            Message::Read { frame, .. } | Message::Write { frame, .. } => frame,
        }
    }

    fn frame_mut(&mut self) -> &mut Frame {
        match self {
            Message::Read { frame, .. } | Message::Write { frame, .. } => frame,
        }
    }

    /// Converter applied before sending; queries never use theirs
    pub fn input_converter(&self) -> Converter {
        match self {
            Message::Read { .. } => Converter::Identity,
            Message::Write { input, .. } => *input,
        }
    }

    /// Converter applied to the response payload
    pub fn output_converter(&self) -> Converter {
        match self {
            Message::Read { output, .. } | Message::Write { output, .. } => *output,
        }
    }

    /// Split into the outgoing frame and the output converter
    pub fn into_parts(self) -> (Frame, Converter) {
        match self {
            Message::Read { frame, output } | Message::Write { frame, output, .. } => {
                (frame, output)
            }
        }
    }
}
