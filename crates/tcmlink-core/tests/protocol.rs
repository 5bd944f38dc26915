mod common;

use common::{init_tracing, protocol, response, MockTransport};
use pretty_assertions::assert_eq;
use tcmlink_core::protocol::{
    Action, Converter, Message, ProtocolError, SerialTransport, TransactionState, Transport,
    TransportConfig, TransportLock, Value, CLEAR_CHUNK_SIZE,
};

fn read_speed() -> Message {
    Message::read(Converter::Integer)
        .with_parameter(309)
        .expect("parameter fits")
}

#[test]
fn test_read_message_returns_integer() {
    init_tracing();
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::with_response(response(1, Action::Write, 309, "001234"));

    let value = protocol.execute(&mut mock, read_speed()).unwrap();

    assert_eq!(value, Value::Integer(1234));
    assert_eq!(mock.send_buffer, b"00100030902=?155\r".to_vec());
    assert_eq!(protocol.state(), TransactionState::LockReleased);
    assert_eq!(mock.opens, 1);
    assert_eq!(mock.closes, 1);
    assert!(!mock.is_open);
}

#[test]
fn test_write_message_sends_encoded_value() {
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::with_response(response(1, Action::Write, 2, "111111"));
    let message = Message::write(Converter::Boolean, Converter::Boolean)
        .with_parameter(2)
        .unwrap()
        .with_value(true)
        .unwrap();

    let value = protocol.execute(&mut mock, message).unwrap();

    assert_eq!(value, Value::Bool(true));
    assert_eq!(mock.send_buffer, b"00110000206111111064\r".to_vec());
}

#[test]
fn test_timeout_releases_lock() {
    init_tracing();
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::new();

    let result = protocol.execute(&mut mock, read_speed());

    assert!(matches!(result, Err(ProtocolError::CommunicationTimeout)));
    assert_eq!(protocol.state(), TransactionState::LockReleased);
    assert_eq!(mock.opens, mock.closes);

    // Lock is free again: another holder can take it ...
    drop(protocol.lock().acquire(mock.identity()).expect("lock released"));

    // ... and the next transaction proceeds
    mock.push_response(&response(1, Action::Write, 309, "000820"));
    let value = protocol.execute(&mut mock, read_speed()).unwrap();
    assert_eq!(value, Value::Integer(820));
}

#[test]
fn test_response_without_terminator_times_out() {
    let (mut protocol, _dir) = protocol(1);
    let mut full = response(1, Action::Write, 309, "001234");
    full.pop();
    let mut mock = MockTransport::with_response(full);

    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::CommunicationTimeout)
    ));
    assert!(!mock.is_open);
}

#[test]
fn test_inbound_checksum_is_validated() {
    let (mut protocol, _dir) = protocol(1);
    let mut corrupted = response(1, Action::Write, 309, "001234");
    corrupted[12] = b'9';
    let mut mock = MockTransport::with_response(corrupted);

    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
    assert_eq!(protocol.state(), TransactionState::LockReleased);
    assert_eq!(mock.opens, mock.closes);
}

#[test]
fn test_inbound_length_mismatch() {
    let (mut protocol, _dir) = protocol(1);
    // Declares 7 bytes of data but carries 6
    let mut mock = MockTransport::with_response(b"00110030907001234079\r".to_vec());

    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::LengthMismatch {
            declared: 7,
            actual: 6
        })
    ));
}

#[test]
fn test_output_converter_errors_propagate() {
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::with_response(response(1, Action::Write, 309, "12345"));

    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::WrongFieldWidth {
            expected: 6,
            actual: 5,
            ..
        })
    ));
}

#[test]
fn test_busy_lock_fails_without_touching_transport() {
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::with_response(response(1, Action::Write, 309, "001234"));

    let held = protocol.lock().acquire(mock.identity()).unwrap();
    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::LockUnavailable(_))
    ));
    assert_eq!(protocol.state(), TransactionState::Failed);
    assert_eq!(mock.opens, 0);

    drop(held);
    assert_eq!(
        protocol.execute(&mut mock, read_speed()).unwrap(),
        Value::Integer(1234)
    );
}

#[test]
fn test_missing_serial_port_is_serial_error() {
    let (mut protocol, _dir) = protocol(1);
    let mut port = SerialTransport::new(TransportConfig::new("/dev/tcmlink-no-such-port"));

    assert!(matches!(
        protocol.execute(&mut port, read_speed()),
        Err(ProtocolError::SerialError(_))
    ));
    assert!(matches!(
        protocol.clear(&mut port),
        Err(ProtocolError::SerialError(_))
    ));
    assert_eq!(protocol.state(), TransactionState::LockReleased);
    assert!(!port.is_open());
    drop(protocol.lock().acquire(port.identity()).expect("lock released"));
}

#[test]
fn test_write_failure_closes_transport() {
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::new();
    mock.fail_on_send = true;

    assert!(matches!(
        protocol.execute(&mut mock, read_speed()),
        Err(ProtocolError::IoError(_))
    ));
    assert_eq!(mock.opens, 1);
    assert_eq!(mock.closes, 1);
    assert!(mock.send_buffer.is_empty());
}

#[test]
fn test_clear_drains_until_timeout() {
    let (mut protocol, _dir) = protocol(0);
    let mut mock = MockTransport::with_response(vec![b'x'; CLEAR_CHUNK_SIZE * 2 + 5]);

    let discarded = protocol.clear(&mut mock).unwrap();

    assert_eq!(discarded, CLEAR_CHUNK_SIZE * 2 + 5);
    assert_eq!(mock.remaining(), 0);
    assert_eq!(protocol.state(), TransactionState::LockReleased);
    assert!(!mock.is_open);
}

#[test]
fn test_clear_on_empty_buffer() {
    let (mut protocol, _dir) = protocol(0);
    let mut mock = MockTransport::new();
    assert_eq!(protocol.clear(&mut mock).unwrap(), 0);
}

#[test]
fn test_clear_then_query() {
    let (mut protocol, _dir) = protocol(1);
    let mut mock = MockTransport::with_response(b"garbage\r".to_vec());
    protocol.clear(&mut mock).unwrap();

    mock.push_response(&response(1, Action::Write, 309, "000001"));
    assert_eq!(
        protocol.execute(&mut mock, read_speed()).unwrap(),
        Value::Integer(1)
    );
}

#[test]
fn test_sequential_transactions() {
    let (mut protocol, _dir) = protocol(3);
    let mut mock = MockTransport::new();
    mock.push_response(&response(3, Action::Write, 310, "000150"));
    mock.push_response(&response(3, Action::Write, 303, "Err001"));

    let current = Message::read(Converter::Float).with_parameter(310).unwrap();
    let error = Message::read(Converter::Text).with_parameter(303).unwrap();

    assert_eq!(protocol.execute(&mut mock, current).unwrap(), Value::Float(1.5));
    assert_eq!(
        protocol.execute(&mut mock, error).unwrap(),
        Value::Text("Err001".to_string())
    );
    assert_eq!(mock.opens, 2);
    assert_eq!(mock.closes, 2);
    assert!(mock.send_buffer.starts_with(b"003000310"));
}
