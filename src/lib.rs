pub mod serial;

pub use serial::{
    BaudRate, DataBits, ErrorKind, FlowControl, LineSettings, Parity, Result, SerialChannel,
    SerialConfig, SerialError, StartBits, StopBits,
};
