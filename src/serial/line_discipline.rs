//! Native line-discipline block.
//!
//! Laid out like a POSIX `termios`: speed codes, `c_cflag`/`c_iflag` bit
//! patterns and a control-character array. Only [`super::config`] touches it;
//! everything outside the config sees the enumerated view.

use super::config::{BaudRate, DataBits, FlowControl, Parity, StopBits};

// c_cflag
const CSIZE: u32 = 0o000060;
const CS5: u32 = 0o000000;
const CS6: u32 = 0o000020;
const CS7: u32 = 0o000040;
const CS8: u32 = 0o000060;
const CSTOPB: u32 = 0o000100;
const CREAD: u32 = 0o000200;
const PARENB: u32 = 0o000400;
const PARODD: u32 = 0o001000;
const CLOCAL: u32 = 0o004000;
const CRTSCTS: u32 = 0o20000000000;

// c_iflag
const IXON: u32 = 0o002000;
const IXOFF: u32 = 0o010000;

// c_cc
pub(crate) const VEOF: usize = 4;
pub(crate) const VSTART: usize = 8;
pub(crate) const VSTOP: usize = 9;
const NCCS: usize = 32;

/// Character value that disables a control character slot.
pub(crate) const VDISABLE: u8 = 0;

const SPEED_CODES: [(BaudRate, u32); 13] = [
    (BaudRate::Bps110, 0o000003),
    (BaudRate::Bps300, 0o000007),
    (BaudRate::Bps600, 0o000010),
    (BaudRate::Bps1200, 0o000011),
    (BaudRate::Bps2400, 0o000013),
    (BaudRate::Bps4800, 0o000014),
    (BaudRate::Bps9600, 0o000015),
    (BaudRate::Bps19200, 0o000016),
    (BaudRate::Bps38400, 0o000017),
    (BaudRate::Bps57600, 0o010001),
    (BaudRate::Bps115200, 0o010002),
    (BaudRate::Bps230400, 0o010003),
    (BaudRate::Bps460800, 0o010004),
];

pub(crate) fn speed_code(rate: BaudRate) -> Option<u32> {
    SPEED_CODES
        .iter()
        .find(|(r, _)| *r == rate)
        .map(|(_, code)| *code)
}

pub(crate) fn baud_from_code(code: u32) -> Option<BaudRate> {
    SPEED_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(rate, _)| *rate)
}

/// `vmin` and `vtime` are widened compared to `cc_t` so buffer sizes above
/// 255 bytes and timeouts above 2.55 s are representable. `vtime` counts
/// [`TIMEOUT_UNIT_MS`] ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineDiscipline {
    pub iflag: u32,
    pub cflag: u32,
    pub ispeed: u32,
    pub ospeed: u32,
    pub cc: [u8; NCCS],
    pub vmin: usize,
    pub vtime: u32,
}

pub(crate) const TIMEOUT_UNIT_MS: u32 = 10;

impl LineDiscipline {
    /// Receiver enabled, modem lines ignored, everything else cleared.
    pub fn raw() -> Self {
        Self {
            iflag: 0,
            cflag: CREAD | CLOCAL,
            ispeed: 0,
            ospeed: 0,
            cc: [VDISABLE; NCCS],
            vmin: 0,
            vtime: 0,
        }
    }

    pub fn set_speed(&mut self, code: u32) {
        self.ispeed = code;
        self.ospeed = code;
    }

    pub fn speed(&self) -> u32 {
        self.ospeed
    }

    pub fn set_data_bits(&mut self, bits: DataBits) {
        let cs = match bits {
            DataBits::Five => CS5,
            DataBits::Six => CS6,
            DataBits::Seven => CS7,
            DataBits::Eight => CS8,
        };
        self.cflag = (self.cflag & !CSIZE) | cs;
    }

    pub fn data_bits(&self) -> DataBits {
        match self.cflag & CSIZE {
            CS5 => DataBits::Five,
            CS6 => DataBits::Six,
            CS7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    /// Returns `false` without touching the block when the parity has no
    /// bit pattern.
    pub fn set_parity(&mut self, parity: Parity) -> bool {
        let bits = match parity {
            Parity::None => 0,
            Parity::Odd => PARENB | PARODD,
            Parity::Even => PARENB,
            Parity::Mark | Parity::Space => return false,
        };
        self.cflag = (self.cflag & !(PARENB | PARODD)) | bits;
        true
    }

    pub fn parity(&self) -> Parity {
        match (self.cflag & PARENB != 0, self.cflag & PARODD != 0) {
            (false, _) => Parity::None,
            (true, true) => Parity::Odd,
            (true, false) => Parity::Even,
        }
    }

    pub fn set_stop_bits(&mut self, bits: StopBits) -> bool {
        match bits {
            StopBits::One => self.cflag &= !CSTOPB,
            StopBits::Two => self.cflag |= CSTOPB,
            StopBits::OnePointFive => return false,
        }
        true
    }

    pub fn stop_bits(&self) -> StopBits {
        if self.cflag & CSTOPB != 0 {
            StopBits::Two
        } else {
            StopBits::One
        }
    }

    pub fn set_flow_control(&mut self, mode: FlowControl, xon: u8, xoff: u8) {
        self.cflag &= !CRTSCTS;
        self.iflag &= !(IXON | IXOFF);
        match mode {
            FlowControl::None => {}
            FlowControl::Hardware => self.cflag |= CRTSCTS,
            FlowControl::Software => {
                self.iflag |= IXON | IXOFF;
                self.cc[VSTART] = xon;
                self.cc[VSTOP] = xoff;
            }
        }
    }

    pub fn flow_control(&self) -> FlowControl {
        if self.cflag & CRTSCTS != 0 {
            FlowControl::Hardware
        } else if self.iflag & (IXON | IXOFF) != 0 {
            FlowControl::Software
        } else {
            FlowControl::None
        }
    }
}
