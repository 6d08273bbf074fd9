//! Portable line-discipline configuration.
//!
//! [`SerialConfig`] validates every change against the native block before
//! committing it, so a rejected setter never leaves a half-updated
//! configuration behind.

use serde::{Deserialize, Serialize};

use super::line_discipline::{
    baud_from_code, speed_code, LineDiscipline, TIMEOUT_UNIT_MS, VDISABLE, VEOF, VSTART, VSTOP,
};
use super::{Result, SerialError};

pub const DEFAULT_XON_CHAR: u8 = 0x11; // DC1
pub const DEFAULT_XOFF_CHAR: u8 = 0x13; // DC3

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaudRate {
    Bps110,
    Bps300,
    Bps600,
    Bps1200,
    Bps2400,
    Bps4800,
    Bps9600,
    Bps14400,
    Bps19200,
    Bps38400,
    Bps57600,
    Bps115200,
    Bps128000,
    Bps230400,
    Bps256000,
    Bps460800,
}

impl BaudRate {
    pub const ALL: [BaudRate; 16] = [
        BaudRate::Bps110,
        BaudRate::Bps300,
        BaudRate::Bps600,
        BaudRate::Bps1200,
        BaudRate::Bps2400,
        BaudRate::Bps4800,
        BaudRate::Bps9600,
        BaudRate::Bps14400,
        BaudRate::Bps19200,
        BaudRate::Bps38400,
        BaudRate::Bps57600,
        BaudRate::Bps115200,
        BaudRate::Bps128000,
        BaudRate::Bps230400,
        BaudRate::Bps256000,
        BaudRate::Bps460800,
    ];

    pub fn bps(self) -> u32 {
        match self {
            BaudRate::Bps110 => 110,
            BaudRate::Bps300 => 300,
            BaudRate::Bps600 => 600,
            BaudRate::Bps1200 => 1200,
            BaudRate::Bps2400 => 2400,
            BaudRate::Bps4800 => 4800,
            BaudRate::Bps9600 => 9600,
            BaudRate::Bps14400 => 14400,
            BaudRate::Bps19200 => 19200,
            BaudRate::Bps38400 => 38400,
            BaudRate::Bps57600 => 57600,
            BaudRate::Bps115200 => 115200,
            BaudRate::Bps128000 => 128000,
            BaudRate::Bps230400 => 230400,
            BaudRate::Bps256000 => 256000,
            BaudRate::Bps460800 => 460800,
        }
    }

    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bps() == bps)
    }

    /// Whether the native block has a speed code for this rate.
    pub fn is_supported(self) -> bool {
        speed_code(self).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Single-character coding: `N`, `O`, `E`, `M`, `S`.
    pub fn as_char(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(Parity::None),
            'O' => Some(Parity::Odd),
            'E' => Some(Parity::Even),
            'M' => Some(Parity::Mark),
            'S' => Some(Parity::Space),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartBits {
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Hardware,
    Software,
}

/// Complete parameter set for a [`SerialConfig`].
///
/// There is deliberately no `Default`: every field has to be chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    pub baud_rate: BaudRate,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub start_bits: StartBits,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    pub xon_char: u8,
    pub xoff_char: u8,
    pub use_eof: bool,
    pub eof_char: u8,
    pub buffer_size: usize,
    pub timeout_ms: u32,
}

/// Line discipline for one named port.
///
/// Read blocking is controlled by two fields: `buffer_size` (minimum bytes)
/// and `timeout` (milliseconds). A zero buffer size with a nonzero timeout
/// gives timed non-blocking reads; both zero gives a 1-byte blocking read.
///
/// The timeout is stored in 10 ms ticks, truncating: `set_timeout(25)` reads
/// back as 20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    name: String,
    line: LineDiscipline,
    eof_char: u8,
}

impl SerialConfig {
    pub fn new(name: impl Into<String>, settings: LineSettings) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SerialError::InvalidArgument("port name must not be empty"));
        }
        if settings.start_bits != StartBits::One {
            return Err(SerialError::OperationNotSupported(
                "start bits other than one cannot be configured",
            ));
        }

        let mut config = Self {
            name,
            line: LineDiscipline::raw(),
            eof_char: VDISABLE,
        };
        config.set_baud_rate(settings.baud_rate)?;
        config.set_data_bits(settings.data_bits);
        config.set_parity(settings.parity)?;
        config.set_stop_bits(settings.stop_bits)?;
        // The characters stay queryable and settable one at a time even when
        // software flow is off, so the pair is held to the same rules.
        validate_xon_xoff(settings.xon_char, settings.xoff_char)?;
        config.set_flow_control(settings.flow_control, settings.xon_char, settings.xoff_char)?;
        config.line.cc[VSTART] = settings.xon_char;
        config.line.cc[VSTOP] = settings.xoff_char;
        config.set_eof_char(settings.eof_char)?;
        config.set_use_eof(settings.use_eof)?;
        config.set_buffer_size(settings.buffer_size);
        config.set_timeout(settings.timeout_ms);
        Ok(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current configuration in portable form.
    pub fn settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate(),
            data_bits: self.data_bits(),
            parity: self.parity(),
            start_bits: self.start_bits(),
            stop_bits: self.stop_bits(),
            flow_control: self.flow_control(),
            xon_char: self.xon_char(),
            xoff_char: self.xoff_char(),
            use_eof: self.use_eof(),
            eof_char: self.eof_char(),
            buffer_size: self.buffer_size(),
            timeout_ms: self.timeout(),
        }
    }

    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<()> {
        let code = speed_code(rate).ok_or_else(|| SerialError::unsupported("baud rate", rate))?;
        self.line.set_speed(code);
        Ok(())
    }

    pub fn baud_rate(&self) -> BaudRate {
        // The speed field is only ever written from the table.
        baud_from_code(self.line.speed()).unwrap_or(BaudRate::Bps9600)
    }

    pub fn set_data_bits(&mut self, bits: DataBits) {
        self.line.set_data_bits(bits);
    }

    pub fn data_bits(&self) -> DataBits {
        self.line.data_bits()
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        if self.line.set_parity(parity) {
            Ok(())
        } else {
            Err(SerialError::unsupported("parity", parity))
        }
    }

    pub fn parity(&self) -> Parity {
        self.line.parity()
    }

    pub fn set_parity_char(&mut self, c: char) -> Result<()> {
        let parity = Parity::from_char(c)
            .ok_or(SerialError::InvalidArgument("parity character must be one of N, O, E, M, S"))?;
        self.set_parity(parity)
    }

    pub fn parity_char(&self) -> char {
        self.parity().as_char()
    }

    /// Start bits are fixed by the UART; this always fails.
    pub fn set_start_bits(&mut self, _bits: StartBits) -> Result<()> {
        Err(SerialError::OperationNotSupported(
            "start bits cannot be configured",
        ))
    }

    pub fn start_bits(&self) -> StartBits {
        StartBits::One
    }

    pub fn set_stop_bits(&mut self, bits: StopBits) -> Result<()> {
        if self.line.set_stop_bits(bits) {
            Ok(())
        } else {
            Err(SerialError::unsupported("stop bits", bits))
        }
    }

    pub fn stop_bits(&self) -> StopBits {
        self.line.stop_bits()
    }

    /// `xon` and `xoff` are only used in software mode, where they must
    /// differ from each other and from the disabled value 0.
    pub fn set_flow_control(&mut self, mode: FlowControl, xon: u8, xoff: u8) -> Result<()> {
        if mode == FlowControl::Software {
            validate_xon_xoff(xon, xoff)?;
        }
        self.line.set_flow_control(mode, xon, xoff);
        Ok(())
    }

    pub fn flow_control(&self) -> FlowControl {
        self.line.flow_control()
    }

    pub fn set_use_xon_xoff(&mut self, xon: u8, xoff: u8) -> Result<()> {
        self.set_flow_control(FlowControl::Software, xon, xoff)
    }

    pub fn use_xon_xoff(&self) -> bool {
        self.flow_control() == FlowControl::Software
    }

    pub fn set_xon_char(&mut self, xon: u8) -> Result<()> {
        validate_xon_xoff(xon, self.xoff_char())?;
        self.line.cc[VSTART] = xon;
        Ok(())
    }

    pub fn xon_char(&self) -> u8 {
        self.line.cc[VSTART]
    }

    pub fn set_xoff_char(&mut self, xoff: u8) -> Result<()> {
        validate_xon_xoff(self.xon_char(), xoff)?;
        self.line.cc[VSTOP] = xoff;
        Ok(())
    }

    pub fn xoff_char(&self) -> u8 {
        self.line.cc[VSTOP]
    }

    /// Character 0 is reserved for "no end-of-frame", so enabling requires
    /// a nonzero end-of-frame character.
    pub fn set_use_eof(&mut self, enable: bool) -> Result<()> {
        if !enable {
            self.line.cc[VEOF] = VDISABLE;
            return Ok(());
        }
        if self.eof_char == VDISABLE {
            return Err(SerialError::unsupported("end-of-frame character", self.eof_char));
        }
        self.line.cc[VEOF] = self.eof_char;
        Ok(())
    }

    pub fn use_eof(&self) -> bool {
        self.line.cc[VEOF] != VDISABLE
    }

    pub fn set_eof_char(&mut self, eof: u8) -> Result<()> {
        if self.use_eof() {
            if eof == VDISABLE {
                return Err(SerialError::unsupported("end-of-frame character", eof));
            }
            self.line.cc[VEOF] = eof;
        }
        self.eof_char = eof;
        Ok(())
    }

    pub fn eof_char(&self) -> u8 {
        self.eof_char
    }

    /// Minimum bytes per read; also the initial size of framed reads.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.line.vmin = size;
    }

    pub fn buffer_size(&self) -> usize {
        self.line.vmin
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.line.vtime = timeout_ms / TIMEOUT_UNIT_MS;
    }

    pub fn timeout(&self) -> u32 {
        self.line.vtime * TIMEOUT_UNIT_MS
    }

    pub fn set_blocking(&mut self) {
        self.line.vtime = 0;
    }

    pub fn is_blocking(&self) -> bool {
        self.line.vtime == 0
    }
}

fn validate_xon_xoff(xon: u8, xoff: u8) -> Result<()> {
    if xon == VDISABLE || xoff == VDISABLE {
        return Err(SerialError::InvalidArgument(
            "XON/XOFF characters must be nonzero",
        ));
    }
    if xon == xoff {
        return Err(SerialError::InvalidArgument(
            "XON and XOFF characters must differ",
        ));
    }
    Ok(())
}
