use std::sync::Arc;

use super::backend::{Backend, Device, NativeBackend};
use super::{Result, SerialConfig, SerialError};

/// A blocking channel over one serial device.
///
/// Closed → [`open`](Self::open) → Open → [`close`](Self::close) → Closed.
/// Dropping an open channel closes it.
///
/// Every I/O call blocks the calling thread until it is satisfied, the
/// configured timeout expires, or the device fails. There is no cancellation
/// beyond the timeout; closing the port from another thread is
/// platform-dependent and best-effort at most, so callers that need to abort
/// should use a finite timeout instead. Independent channels on distinct
/// ports share no state and can live on separate threads.
pub struct SerialChannel<B: Backend = NativeBackend> {
    config: Arc<SerialConfig>,
    backend: B,
    device: Option<Box<dyn Device>>,
    carry: Vec<u8>,
}

impl SerialChannel<NativeBackend> {
    pub fn new(config: impl Into<Arc<SerialConfig>>) -> Self {
        Self::with_backend(config, NativeBackend)
    }
}

impl<B: Backend> SerialChannel<B> {
    pub fn with_backend(config: impl Into<Arc<SerialConfig>>, backend: B) -> Self {
        Self {
            config: config.into(),
            backend,
            device: None,
            carry: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.config.name()
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Mutable access to the bound config. A config still shared with other
    /// channels is copied first. Changes reach the device on the next
    /// [`open`](Self::open) or [`reconfigure`](Self::reconfigure).
    pub fn config_mut(&mut self) -> &mut SerialConfig {
        Arc::make_mut(&mut self.config)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Bytes read past the last end-of-frame character, waiting for the
    /// next framed read.
    pub fn carried_over(&self) -> &[u8] {
        &self.carry
    }

    /// Acquire the device and push the config to it. On any failure the
    /// handle is released and the channel stays closed.
    pub fn open(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Err(SerialError::InvalidState("channel is already open"));
        }

        let mut device = self.backend.open(self.config.name())?;
        if let Err(e) = device.apply(&self.config) {
            log::warn!("Failed to configure {}: {}", self.config.name(), e);
            if let Err(close_err) = device.close() {
                log::warn!("Failed to release {}: {}", self.config.name(), close_err);
            }
            return Err(e);
        }

        self.carry.clear();
        self.device = Some(device);
        log::info!("Opened serial channel on {}", self.config.name());
        Ok(())
    }

    /// Push the current config to an open device. A failure closes the
    /// channel rather than leaving it partially configured.
    pub fn reconfigure(&mut self) -> Result<()> {
        let device = self
            .device
            .as_mut()
            .ok_or(SerialError::InvalidState("channel is not open"))?;
        if let Err(e) = device.apply(&self.config) {
            log::warn!("Failed to reconfigure {}: {}", self.config.name(), e);
            let _ = self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Release the device. The channel is closed afterwards even when the
    /// release itself fails. Closing a closed channel does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.carry.clear();
        let Some(device) = self.device.take() else {
            return Ok(());
        };
        match device.close() {
            Ok(()) => {
                log::info!("Closed serial channel on {}", self.config.name());
                Ok(())
            }
            Err(e) => {
                log::warn!("Error while closing {}: {}", self.config.name(), e);
                Err(e)
            }
        }
    }

    fn device(&mut self) -> Result<&mut Box<dyn Device>> {
        self.device
            .as_mut()
            .ok_or(SerialError::InvalidState("channel is not open"))
    }

    /// Fill `buf` from the device.
    ///
    /// `buf` is zeroed first, then underlying reads are issued into the
    /// remaining space until it is full or the device reports end-of-data.
    /// Returns the number of bytes read, which is short only on end-of-data.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let device = self.device()?;
        buf.fill(0);

        let mut count = 0;
        while count < buf.len() {
            let n = device.read(&mut buf[count..])?;
            if n == 0 {
                break;
            }
            count += n;
        }
        Ok(count)
    }

    /// Read one frame terminated by the config's end-of-frame character.
    ///
    /// The delimiter is consumed and not part of the frame. Bytes that
    /// arrived after it are kept for the next call, and the device input
    /// queue is purged. A failed purge is logged and the frame still
    /// returned. If the device runs dry before a delimiter shows up,
    /// whatever was gathered comes back as a short, undelimited frame.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut frame = Vec::new();
        self.read_frame_into(&mut frame)?;
        Ok(frame)
    }

    /// [`read_frame`](Self::read_frame) into a caller-provided buffer, which
    /// must be empty. Returns the frame length.
    pub fn read_frame_into(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        if self.device.is_none() {
            return Err(SerialError::InvalidState("channel is not open"));
        }
        if !self.config.use_eof() {
            return Err(SerialError::InvalidAccess(
                "framed reads need end-of-frame detection enabled",
            ));
        }
        let mut capacity = self.config.buffer_size();
        if capacity == 0 {
            return Err(SerialError::InvalidArgument(
                "framed reads need a nonzero buffer size",
            ));
        }
        if !out.is_empty() {
            return Err(SerialError::InvalidArgument("output buffer must be empty"));
        }

        let eof = self.config.eof_char();
        let Some(device) = self.device.as_mut() else {
            return Err(SerialError::InvalidState("channel is not open"));
        };
        let mut growth = 1;
        out.reserve(capacity);

        loop {
            let start = out.len();
            if !self.carry.is_empty() {
                let take = self.carry.len().min(capacity - start);
                out.extend(self.carry.drain(..take));
            } else {
                out.resize(capacity, 0);
                let n = match device.read(&mut out[start..]) {
                    Ok(n) => n,
                    Err(e) => {
                        out.truncate(start);
                        return Err(e);
                    }
                };
                out.truncate(start + n);
                if n == 0 {
                    break;
                }
            }

            if let Some(pos) = out[start..].iter().position(|&b| b == eof) {
                let end = start + pos;
                let mut rest = out.split_off(end + 1);
                out.truncate(end);
                // Bytes from this chunk precede anything not yet drained.
                rest.append(&mut self.carry);
                self.carry = rest;
                // The frame is already out of the device; losing the purge
                // only risks stale input on the next read.
                if let Err(e) = device.purge_input() {
                    log::warn!("Failed to purge input on {}: {}", self.config.name(), e);
                }
                log::debug!(
                    "Frame of {} bytes on {}, {} carried over",
                    out.len(),
                    self.config.name(),
                    self.carry.len()
                );
                return Ok(out.len());
            }

            if out.len() >= capacity {
                growth += 1;
                capacity *= growth;
                out.reserve(capacity - out.len());
            }
        }

        log::debug!(
            "Undelimited frame of {} bytes on {}",
            out.len(),
            self.config.name()
        );
        Ok(out.len())
    }

    /// Write all of `buf` in one device call.
    ///
    /// A device that accepts fewer bytes without reporting an error is
    /// treated as a line fault and yields `IoError`.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let name = self.config.name().to_string();
        let device = self.device()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let written = device.write(buf)?;
        if written == 0 {
            return Err(SerialError::IoError {
                port: name,
                message: "device accepted no bytes".to_string(),
            });
        }
        if written != buf.len() {
            return Err(SerialError::IoError {
                port: name,
                message: format!("partial write: {} of {} bytes", written, buf.len()),
            });
        }
        Ok(written)
    }
}

impl<B: Backend> Drop for SerialChannel<B> {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{
        BaudRate, DataBits, ErrorKind, FlowControl, LineSettings, Parity, ScriptedBackend,
        StartBits, StopBits,
    };

    fn channel(buffer_size: usize) -> (SerialChannel<ScriptedBackend>, ScriptedBackend) {
        let settings = LineSettings {
            baud_rate: BaudRate::Bps115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            start_bits: StartBits::One,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            xon_char: 0x11,
            xoff_char: 0x13,
            use_eof: true,
            eof_char: b'\n',
            buffer_size,
            timeout_ms: 100,
        };
        let config = SerialConfig::new("loop0", settings).unwrap();
        let backend = ScriptedBackend::with_port("loop0");
        (SerialChannel::with_backend(config, backend.clone()), backend)
    }

    #[test]
    fn test_frame_grows_by_increasing_factor() {
        let (mut ch, backend) = channel(2);
        backend.push_incoming(b"abcdefghijk\n".to_vec());
        ch.open().unwrap();
        let frame = ch.read_frame().unwrap();
        assert_eq!(frame, b"abcdefghijk");
        // capacity 2, then 4 (x2), then 12 (x3)
        assert_eq!(backend.read_requests(), vec![2, 2, 8]);
    }

    #[test]
    fn test_purge_discards_unread_driver_bytes() {
        let (mut ch, backend) = channel(2);
        backend.push_incoming(b"a\nbcd".to_vec());
        backend.push_incoming(b"e\nf".to_vec());
        ch.open().unwrap();

        assert_eq!(ch.read_frame().unwrap(), b"a");
        assert!(ch.carried_over().is_empty());
        assert_eq!(ch.read_frame().unwrap(), b"e");
        assert!(ch.carried_over().is_empty());
        assert_eq!(backend.pending_incoming(), 0);
        assert_eq!(backend.stats().purges, 2);
    }

    #[test]
    fn test_bytes_after_delimiter_are_carried() {
        let (mut ch, backend) = channel(4);
        backend.push_incoming(b"x\nab\nc".to_vec());
        ch.open().unwrap();

        assert_eq!(ch.read_frame().unwrap(), b"x");
        assert_eq!(ch.carried_over(), b"ab");
    }

    #[test]
    fn test_delimiter_in_partially_drained_carry() {
        let (mut ch, backend) = channel(8);
        backend.push_incoming(b"a\nbc\nde\n".to_vec());
        ch.open().unwrap();
        assert_eq!(ch.read_frame().unwrap(), b"a");
        assert_eq!(ch.carried_over(), b"bc\nde\n");

        ch.config_mut().set_buffer_size(2);
        assert_eq!(ch.read_frame().unwrap(), b"bc");
        assert_eq!(ch.carried_over(), b"de\n");
        assert_eq!(ch.read_frame().unwrap(), b"de");
        assert!(ch.carried_over().is_empty());
        assert_eq!(backend.stats().reads, 1);
    }

    #[test]
    fn test_read_error_leaves_output_clean() {
        let (mut ch, backend) = channel(8);
        backend.push_incoming(b"abc".to_vec());
        backend.fail_next_read(std::io::ErrorKind::BrokenPipe.into());
        ch.open().unwrap();
        let mut out = Vec::new();
        let err = ch.read_frame_into(&mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(out.is_empty());
    }

    #[test]
    fn test_config_mut_copies_shared_config() {
        let (ch, backend) = channel(8);
        let shared = Arc::new(ch.config().clone());
        let mut a = SerialChannel::with_backend(Arc::clone(&shared), backend);
        a.config_mut().set_timeout(1000);
        assert_eq!(a.config().timeout(), 1000);
        assert_eq!(shared.timeout(), 100);
    }
}
