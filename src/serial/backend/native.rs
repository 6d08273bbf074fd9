use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};

use super::{Backend, Device};
use crate::serial::translate::{
    translate_control_error, translate_io_error, translate_serialport_error,
};
use crate::serial::{
    DataBits, FlowControl, Parity, Result, SerialConfig, SerialDeviceInfo, SerialError, StopBits,
};

#[cfg(unix)]
type NativeHandle = serialport::TTYPort;
#[cfg(windows)]
type NativeHandle = serialport::COMPort;

/// Used for "blocking" reads: `serialport` always needs a finite timeout.
const BLOCKING_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

// Initial speed for the open call; the real line discipline is applied
// immediately afterwards.
const OPEN_BAUD_RATE: u32 = 9600;

/// List the serial ports the OS knows about.
pub fn discover_ports() -> Result<Vec<SerialDeviceInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| translate_serialport_error("<enumerate>", e))?;
    let mut devices = Vec::new();

    for port in ports {
        let device = match port.port_type {
            SerialPortType::UsbPort(usb_info) => SerialDeviceInfo {
                port_name: port.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                serial_number: usb_info.serial_number,
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
            },
            _ => SerialDeviceInfo {
                port_name: port.port_name,
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
        };
        devices.push(device);
    }

    log::debug!("Discovered {} serial ports", devices.len());
    Ok(devices)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    fn open(&self, port_name: &str) -> Result<Box<dyn Device>> {
        // serialport opens the TTY with TIOCEXCL and the COM port with no
        // sharing, so the handle is exclusive on both platforms.
        let port = serialport::new(port_name, OPEN_BAUD_RATE)
            .timeout(BLOCKING_TIMEOUT)
            .open_native()
            .map_err(|e| translate_serialport_error(port_name, e))?;

        Ok(Box::new(NativeDevice {
            port,
            name: port_name.to_string(),
        }))
    }
}

pub struct NativeDevice {
    port: NativeHandle,
    name: String,
}

impl NativeDevice {
    fn configure(&mut self, config: &SerialConfig) -> Result<()> {
        let parity = port_parity(config.parity())?;
        let stop_bits = port_stop_bits(config.stop_bits())?;
        let timeout = if config.is_blocking() {
            BLOCKING_TIMEOUT
        } else {
            Duration::from_millis(u64::from(config.timeout()))
        };

        let port = &mut self.port;
        port.set_baud_rate(config.baud_rate().bps())
            .and_then(|_| port.set_data_bits(port_data_bits(config.data_bits())))
            .and_then(|_| port.set_parity(parity))
            .and_then(|_| port.set_stop_bits(stop_bits))
            .and_then(|_| port.set_flow_control(port_flow_control(config.flow_control())))
            .and_then(|_| port.set_timeout(timeout))
            .map_err(|e| translate_serialport_error(&self.name, e))
    }

    /// Pushes the fields `serialport` has no setter for: the minimum read
    /// size, the inter-byte timer and, in software mode, the XON/XOFF
    /// characters.
    #[cfg(unix)]
    fn apply_termios(&mut self, config: &SerialConfig) -> std::io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let fd = self.port.as_raw_fd();
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: fd belongs to the open TTY owned by self.port and
        // tcgetattr fully initialises the struct when it returns 0.
        let mut termios = unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            termios.assume_init()
        };
        patch_termios(&mut termios, config);
        // SAFETY: same fd, termios is a valid initialised struct.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_termios(&mut self, config: &SerialConfig) -> std::io::Result<()> {
        let (xon, xoff) = (config.xon_char(), config.xoff_char());
        if config.flow_control() == FlowControl::Software
            && (xon, xoff) != (crate::serial::DEFAULT_XON_CHAR, crate::serial::DEFAULT_XOFF_CHAR)
        {
            log::warn!(
                "{}: custom XON/XOFF characters 0x{:02X}/0x{:02X} are not applied on this platform",
                self.name,
                xon,
                xoff
            );
        }
        log::debug!(
            "{}: minimum read size {} is not applied on this platform",
            self.name,
            config.buffer_size()
        );
        Ok(())
    }
}

/// VMIN is the buffer size and VTIME the timeout in tenths of a second
/// (rounded up), both saturating at what a `cc_t` holds. A blocking config
/// leaves VTIME at 0.
#[cfg(unix)]
fn patch_termios(termios: &mut libc::termios, config: &SerialConfig) {
    let cc_max = usize::from(libc::cc_t::MAX);
    termios.c_cc[libc::VMIN] = config.buffer_size().min(cc_max) as libc::cc_t;
    let deciseconds = config.timeout().div_ceil(100) as usize;
    termios.c_cc[libc::VTIME] = deciseconds.min(cc_max) as libc::cc_t;
    if config.flow_control() == FlowControl::Software {
        termios.c_cc[libc::VSTART] = config.xon_char() as libc::cc_t;
        termios.c_cc[libc::VSTOP] = config.xoff_char() as libc::cc_t;
    }
}

impl Device for NativeDevice {
    fn apply(&mut self, config: &SerialConfig) -> Result<()> {
        self.configure(config)?;
        self.apply_termios(config)
            .map_err(|e| translate_control_error(&self.name, e))?;

        log::debug!(
            "Configured {}: {} baud, {:?} data bits, parity {}, {:?} stop bits, {:?} flow, min read {}, timeout {} ms",
            self.name,
            config.baud_rate().bps(),
            config.data_bits(),
            config.parity_char(),
            config.stop_bits(),
            config.flow_control(),
            config.buffer_size(),
            config.timeout()
        );
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => match translate_io_error(&self.name, e) {
                Some(err) => Err(err),
                None => Ok(0),
            },
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = match self.port.write(buf) {
            Ok(n) => n,
            Err(e) => match translate_io_error(&self.name, e) {
                Some(err) => return Err(err),
                None => 0,
            },
        };
        self.port
            .flush()
            .map_err(|e| translate_control_error(&self.name, e))?;
        Ok(written)
    }

    fn purge_input(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| translate_serialport_error(&self.name, e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the handle releases it; close(2) failures are not surfaced
        // by serialport.
        drop(self);
        Ok(())
    }
}

fn port_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

// Mark/space parity and 1.5 stop bits have no serialport mapping. A
// SerialConfig never holds them since its setters reject them first.
fn port_parity(parity: Parity) -> Result<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(SerialError::unsupported("parity", parity)),
    }
}

fn port_stop_bits(bits: StopBits) -> Result<serialport::StopBits> {
    match bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(SerialError::unsupported("stop bits", bits)),
    }
}

fn port_flow_control(mode: FlowControl) -> serialport::FlowControl {
    match mode {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
        FlowControl::Software => serialport::FlowControl::Software,
    }
}
