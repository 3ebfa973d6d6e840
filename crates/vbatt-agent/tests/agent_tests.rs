//! Integration tests for the agent client against an in-process broker

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use vbatt_agent::{AgentError, BatteryAgent, BoardReading, ControlClient};
use vbatt_config::AgentProfile;
use vbatt_core::wire::{FRAME_HEADER_LEN, FrameHeader, OP_UPDATE};
use vbatt_core::{Broker, BrokerError, ChargeStatus, Property, PropertyValue};

/// Serves the control protocol for one connection on a plain thread
struct TestBroker {
    #[allow(dead_code)]
    temp_dir: TempDir,
    socket_path: PathBuf,
    broker: Arc<Broker>,
}

impl TestBroker {
    fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let socket_path = temp_dir.path().join("pipower5.ctl");
        let listener = UnixListener::bind(&socket_path).unwrap();
        let broker = Arc::new(Broker::new());

        let served = Arc::clone(&broker);
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            loop {
                let mut header = [0u8; FRAME_HEADER_LEN];
                if stream.read_exact(&mut header).is_err() {
                    return;
                }
                let header = FrameHeader::parse(header).unwrap();
                let mut payload = vec![0u8; header.len];
                stream.read_exact(&mut payload).unwrap();
                let status = match served.handle_frame(header.opcode, &payload) {
                    Ok(()) => 0,
                    Err(e) => e.errno(),
                };
                stream.write_all(&status.to_le_bytes()).unwrap();
            }
        });

        Self {
            temp_dir,
            socket_path,
            broker,
        }
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            control_socket: self.socket_path.clone(),
            ..Default::default()
        }
    }
}

#[test]
fn test_agent_session() {
    let server = TestBroker::start();
    let profile = server.profile();

    let client = ControlClient::connect(&profile.control_socket).unwrap();
    let mut agent = BatteryAgent::register(client, &profile).unwrap();
    assert!(server.broker.is_registered());
    assert_eq!(
        server.broker.get_property(Property::VoltageMaxDesign).unwrap(),
        PropertyValue::Int(8_400_000)
    );

    agent
        .publish(&BoardReading {
            battery_voltage_mv: 4_050.0,
            battery_current_ma: 350.0,
            battery_percentage: 76.0,
            is_charging: false,
            is_input_plugged_in: false,
        })
        .unwrap();
    assert_eq!(
        server.broker.get_property(Property::Capacity).unwrap(),
        PropertyValue::Int(76)
    );
    assert_eq!(
        server.broker.get_property(Property::Status).unwrap(),
        PropertyValue::Status(ChargeStatus::Discharging)
    );
    assert_eq!(
        server.broker.get_property(Property::PowerNow).unwrap(),
        PropertyValue::Int(1_417_500)
    );
    assert_eq!(agent.record().capacity, 76);

    agent.shutdown().unwrap();
    assert!(!server.broker.is_registered());
}

#[test]
fn test_rejections_surface_as_errors() {
    let server = TestBroker::start();
    let mut client = ControlClient::connect(&server.socket_path).unwrap();

    let err = client.send_raw(OP_UPDATE, &[0u8; 10]).unwrap_err();
    assert!(matches!(
        err,
        AgentError::Rejected(BrokerError::InvalidInput(_))
    ));

    let err = client.send_raw(0x1234, &[]).unwrap_err();
    assert!(matches!(
        err,
        AgentError::Rejected(BrokerError::UnsupportedOperation(0x1234))
    ));

    client.unregister().unwrap();

    server.broker.close();
    let err = client.unregister().unwrap_err();
    assert!(matches!(err, AgentError::Rejected(BrokerError::NotAvailable)));
}

#[test]
fn test_missing_socket() {
    let dir = TempDir::new().unwrap();
    let result = ControlClient::connect(&dir.path().join("absent.ctl"));
    assert!(matches!(result, Err(AgentError::SocketNotFound(_))));
}

#[test]
fn test_profile_with_long_name_is_rejected() {
    let profile = AgentProfile {
        name: "a battery name that is far too long to fit".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        BatteryAgent::initial_record(&profile),
        Err(AgentError::InvalidProfile(_))
    ));
}

#[test]
fn test_reading_deserializes_from_json() {
    let reading: BoardReading = serde_json::from_str(
        r#"{"battery_voltage_mv":8100.0,"battery_current_ma":-900.0,"battery_percentage":55.0,"is_charging":true,"is_input_plugged_in":true}"#,
    )
    .unwrap();
    assert_eq!(reading.status(), ChargeStatus::Charging);
}
