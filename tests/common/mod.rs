#![allow(dead_code)]

use devio_serial::serial::{ScriptedBackend, DEFAULT_XOFF_CHAR, DEFAULT_XON_CHAR};
use devio_serial::{
    BaudRate, DataBits, FlowControl, LineSettings, Parity, SerialChannel, SerialConfig, StartBits,
    StopBits,
};

pub const PORT: &str = "/dev/ttyLOOP0";

pub fn settings() -> LineSettings {
    LineSettings {
        baud_rate: BaudRate::Bps115200,
        data_bits: DataBits::Eight,
        parity: Parity::None,
        start_bits: StartBits::One,
        stop_bits: StopBits::One,
        flow_control: FlowControl::None,
        xon_char: DEFAULT_XON_CHAR,
        xoff_char: DEFAULT_XOFF_CHAR,
        use_eof: true,
        eof_char: b'\n',
        buffer_size: 16,
        timeout_ms: 200,
    }
}

pub fn scripted_channel(settings: LineSettings) -> (SerialChannel<ScriptedBackend>, ScriptedBackend) {
    let config = SerialConfig::new(PORT, settings).expect("valid settings");
    let backend = ScriptedBackend::with_port(PORT);
    (SerialChannel::with_backend(config, backend.clone()), backend)
}
