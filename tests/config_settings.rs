mod common;

use common::{settings, PORT};
use devio_serial::{
    BaudRate, DataBits, ErrorKind, FlowControl, LineSettings, Parity, SerialConfig, StartBits,
    StopBits,
};

#[test]
fn test_supported_values_round_trip() {
    let mut config = SerialConfig::new(PORT, settings()).unwrap();
    let data_bits = [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight];
    let parities = [Parity::None, Parity::Odd, Parity::Even];
    let stop_bits = [StopBits::One, StopBits::Two];

    for rate in BaudRate::ALL.into_iter().filter(|r| r.is_supported()) {
        for bits in data_bits {
            for parity in parities {
                for stop in stop_bits {
                    config.set_baud_rate(rate).unwrap();
                    config.set_data_bits(bits);
                    config.set_parity(parity).unwrap();
                    config.set_stop_bits(stop).unwrap();
                    assert_eq!(config.baud_rate(), rate);
                    assert_eq!(config.data_bits(), bits);
                    assert_eq!(config.parity(), parity);
                    assert_eq!(config.stop_bits(), stop);
                }
            }
        }
    }
}

#[test]
fn test_unsupported_values_leave_config_unchanged() {
    let mut config = SerialConfig::new(PORT, settings()).unwrap();
    let before = config.settings();

    for rate in [BaudRate::Bps14400, BaudRate::Bps128000, BaudRate::Bps256000] {
        let err = config.set_baud_rate(rate).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }
    for parity in [Parity::Mark, Parity::Space] {
        assert_eq!(config.set_parity(parity).unwrap_err().kind(), ErrorKind::UnsupportedValue);
    }
    assert_eq!(
        config.set_stop_bits(StopBits::OnePointFive).unwrap_err().kind(),
        ErrorKind::UnsupportedValue
    );
    for start in [StartBits::One, StartBits::OnePointFive, StartBits::Two] {
        assert_eq!(
            config.set_start_bits(start).unwrap_err().kind(),
            ErrorKind::OperationNotSupported
        );
    }
    assert_eq!(config.set_parity_char('M').unwrap_err().kind(), ErrorKind::UnsupportedValue);
    assert_eq!(config.set_parity_char('?').unwrap_err().kind(), ErrorKind::InvalidArgument);

    assert_eq!(config.settings(), before);
}

#[test]
fn test_timeout_round_trip() {
    let mut config = SerialConfig::new(PORT, settings()).unwrap();
    for ms in (0..=5000).step_by(10) {
        config.set_timeout(ms);
        assert_eq!(config.timeout(), ms);
    }

    config.set_timeout(25);
    assert_eq!(config.timeout(), 20);
    config.set_timeout(9);
    assert_eq!(config.timeout(), 0);
    assert!(config.is_blocking());
}

#[test]
fn test_blocking_controls_are_independent() {
    let mut s = settings();
    s.buffer_size = 0;
    s.timeout_ms = 300;
    let mut config = SerialConfig::new(PORT, s).unwrap();
    assert_eq!(config.buffer_size(), 0);
    assert!(!config.is_blocking());

    config.set_blocking();
    assert_eq!(config.timeout(), 0);
    assert_eq!(config.buffer_size(), 0);
}

#[test]
fn test_flow_control_reflects_mode_set() {
    let mut config = SerialConfig::new(PORT, settings()).unwrap();
    assert!(!config.use_xon_xoff());

    config.set_flow_control(FlowControl::Software, 0x01, 0x02).unwrap();
    assert!(config.use_xon_xoff());
    assert_eq!(config.flow_control(), FlowControl::Software);
    assert_eq!(config.xon_char(), 0x01);
    assert_eq!(config.xoff_char(), 0x02);

    config.set_flow_control(FlowControl::Hardware, 0, 0).unwrap();
    assert!(!config.use_xon_xoff());
    assert_eq!(config.flow_control(), FlowControl::Hardware);
    // characters stay queryable
    assert_eq!(config.xon_char(), 0x01);

    config.set_use_xon_xoff(0x11, 0x13).unwrap();
    assert!(config.use_xon_xoff());
    config.set_xon_char(0x05).unwrap();
    assert_eq!(config.xon_char(), 0x05);
}

#[test]
fn test_parity_char_setter() {
    let mut config = SerialConfig::new(PORT, settings()).unwrap();
    config.set_parity_char('O').unwrap();
    assert_eq!(config.parity(), Parity::Odd);
    assert_eq!(config.parity_char(), 'O');
    config.set_parity_char('e').unwrap();
    assert_eq!(config.parity_char(), 'E');
}

#[test]
fn test_settings_serde_round_trip() {
    let mut s = settings();
    s.parity = Parity::Even;
    s.flow_control = FlowControl::Hardware;
    let json = serde_json::to_string(&s).unwrap();
    let parsed: LineSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, s);

    let config = SerialConfig::new(PORT, parsed).unwrap();
    assert_eq!(config.settings(), s);
}
