//! TCM 1601 pump controller driver
//!
//! Named pump operations built on the parameter numbers of the controller.
//! Each operation builds one [`Message`] and submits it through the
//! [`Protocol`].

use crate::protocol::{
    Converter, FileLock, Message, Protocol, ProtocolConfig, ProtocolError, SerialTransport,
    Transport, TransportConfig, TransportLock, Value,
};

/// Parameter numbers understood by the controller
pub mod parameter {
    /// Standby mode on/off
    pub const STANDBY: i64 = 2;
    /// Pump station (pump and accessories) on/off
    pub const PUMP_STATION: i64 = 10;
    /// Turbopump motor on/off
    pub const MOTOR_TURBOPUMP: i64 = 23;
    /// Current error code
    pub const ERROR_CODE: i64 = 303;
    /// Rotation speed setpoint in Hz
    pub const SET_ROTATION_SPEED: i64 = 308;
    /// Actual rotation speed in Hz
    pub const ACTUAL_ROTATION_SPEED: i64 = 309;
    /// Motor current in A
    pub const MOTOR_CURRENT: i64 = 310;
    /// Motor operating hours
    pub const MOTOR_OPERATION_HOURS: i64 = 311;
}

/// Open a driver on a serial port, locked through lock files
pub fn open_serial(transport: TransportConfig, protocol: ProtocolConfig) -> Tcm1601<SerialTransport> {
    Tcm1601::new(SerialTransport::new(transport), Protocol::new(protocol))
}

/// Driver for one controller on a transport
pub struct Tcm1601<T: Transport, L: TransportLock = FileLock> {
    transport: T,
    protocol: Protocol<L>,
}

impl<T: Transport, L: TransportLock> Tcm1601<T, L> {
    /// Create a driver from a transport and protocol
    pub fn new(transport: T, protocol: Protocol<L>) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying protocol
    pub fn protocol(&self) -> &Protocol<L> {
        &self.protocol
    }

    /// Consume the driver, returning transport and protocol
    pub fn into_parts(self) -> (T, Protocol<L>) {
        (self.transport, self.protocol)
    }

    /// Submit a prepared message
    pub fn query(&mut self, message: Message) -> Result<Value, ProtocolError> {
        self.protocol.execute(&mut self.transport, message)
    }

    /// Drop stale bytes from the line; call once before the first query
    pub fn clear(&mut self) -> Result<usize, ProtocolError> {
        self.protocol.clear(&mut self.transport)
    }

    /// Switch standby mode
    pub fn set_standby(&mut self, on: bool) -> Result<bool, ProtocolError> {
        self.write_flag(parameter::STANDBY, on)
    }

    /// Whether the pump is in standby
    pub fn is_standby(&mut self) -> Result<bool, ProtocolError> {
        self.read_flag(parameter::STANDBY)
    }

    /// Switch the pump station
    pub fn set_pump_station(&mut self, on: bool) -> Result<bool, ProtocolError> {
        self.write_flag(parameter::PUMP_STATION, on)
    }

    /// Whether the pump station is on
    pub fn is_pump_station(&mut self) -> Result<bool, ProtocolError> {
        self.read_flag(parameter::PUMP_STATION)
    }

    /// Switch the turbopump motor
    pub fn set_motor_pump(&mut self, on: bool) -> Result<bool, ProtocolError> {
        self.write_flag(parameter::MOTOR_TURBOPUMP, on)
    }

    /// Whether the turbopump motor is on
    pub fn is_motor_pump(&mut self) -> Result<bool, ProtocolError> {
        self.read_flag(parameter::MOTOR_TURBOPUMP)
    }

    /// Actual rotation speed in Hz
    pub fn actual_rotation_speed(&mut self) -> Result<i64, ProtocolError> {
        self.read_integer(parameter::ACTUAL_ROTATION_SPEED)
    }

    /// Rotation speed setpoint in Hz
    pub fn rotation_speed_setpoint(&mut self) -> Result<i64, ProtocolError> {
        self.read_integer(parameter::SET_ROTATION_SPEED)
    }

    /// Motor operating hours
    pub fn motor_operation_hours(&mut self) -> Result<i64, ProtocolError> {
        self.read_integer(parameter::MOTOR_OPERATION_HOURS)
    }

    /// Current error code as reported, e.g. `000000` or `Err001`
    pub fn error_code(&mut self) -> Result<String, ProtocolError> {
        let value = self.read(parameter::ERROR_CODE, Converter::Text)?;
        match value {
            Value::Text(code) => Ok(code),
            other => Err(mismatch(Converter::Text, other)),
        }
    }

    /// Motor current in A
    pub fn motor_current(&mut self) -> Result<f64, ProtocolError> {
        let value = self.read(parameter::MOTOR_CURRENT, Converter::Float)?;
        value
            .as_float()
            .ok_or_else(|| mismatch(Converter::Float, value))
    }

    fn read(&mut self, parameter: i64, output: Converter) -> Result<Value, ProtocolError> {
        let message = Message::read(output).with_parameter(parameter)?;
        self.query(message)
    }

    fn read_flag(&mut self, parameter: i64) -> Result<bool, ProtocolError> {
        let value = self.read(parameter, Converter::Boolean)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(Converter::Boolean, value))
    }

    fn read_integer(&mut self, parameter: i64) -> Result<i64, ProtocolError> {
        let value = self.read(parameter, Converter::Integer)?;
        value
            .as_integer()
            .ok_or_else(|| mismatch(Converter::Integer, value))
    }

    fn write_flag(&mut self, parameter: i64, on: bool) -> Result<bool, ProtocolError> {
        let message = Message::write(Converter::Boolean, Converter::Boolean)
            .with_parameter(parameter)?
            .with_value(on)?;
        let value = self.query(message)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(Converter::Boolean, value))
    }
}

fn mismatch(converter: Converter, value: Value) -> ProtocolError {
    ProtocolError::UnsupportedValue {
        converter: converter.name(),
        value: format!("{:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_serial_does_not_touch_port() {
        let pump = open_serial(
            TransportConfig::new("/dev/ttyUSB0"),
            ProtocolConfig {
                address: 1,
                ..ProtocolConfig::default()
            },
        );
        assert!(!pump.transport().is_open());
        assert_eq!(pump.transport().identity(), "/dev/ttyUSB0");
        assert_eq!(pump.protocol().address(), 1);
    }

    #[test]
    fn test_mismatch_names_converter() {
        let err = mismatch(Converter::Boolean, Value::Integer(3));
        assert!(err.to_string().contains("boolean"));
    }
}
