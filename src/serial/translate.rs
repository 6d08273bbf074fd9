//! OS error translation.
//!
//! Raw platform codes are consulted first (errno on unix, Win32 error codes on
//! Windows), then the portable [`io::ErrorKind`]. End-of-data conditions are
//! not errors and come back as `None`.

use std::io;

use super::{ErrorKind, SerialError};

enum Outcome {
    EndOfData,
    Failure(ErrorKind),
}

/// Translates a failed device operation. `None` means end-of-data: the
/// caller treats it as a zero-byte transfer.
pub fn translate_io_error(port: &str, err: io::Error) -> Option<SerialError> {
    let outcome = err
        .raw_os_error()
        .and_then(platform::classify)
        .unwrap_or_else(|| classify_kind(err.kind()));
    match outcome {
        Outcome::EndOfData => None,
        Outcome::Failure(kind) => Some(SerialError::os(kind, port, err.to_string())),
    }
}

/// Like [`translate_io_error`] for contexts where no data transfer happens,
/// such as opening or configuring a port; end-of-data becomes a device error.
pub fn translate_control_error(port: &str, err: io::Error) -> SerialError {
    let message = err.to_string();
    translate_io_error(port, err)
        .unwrap_or_else(|| SerialError::os(ErrorKind::DeviceError, port, message))
}

pub fn translate_serialport_error(port: &str, err: serialport::Error) -> SerialError {
    let kind = match err.kind() {
        serialport::ErrorKind::NoDevice => ErrorKind::FileNotFound,
        serialport::ErrorKind::InvalidInput => ErrorKind::CreateFailed,
        serialport::ErrorKind::Io(io_kind) => match classify_kind(io_kind) {
            Outcome::Failure(kind) => kind,
            Outcome::EndOfData => ErrorKind::DeviceError,
        },
        serialport::ErrorKind::Unknown => ErrorKind::DeviceError,
    };
    SerialError::os(kind, port, err.description)
}

fn classify_kind(kind: io::ErrorKind) -> Outcome {
    use io::ErrorKind as K;
    match kind {
        K::TimedOut | K::WouldBlock | K::UnexpectedEof => Outcome::EndOfData,
        K::NotFound => Outcome::Failure(ErrorKind::FileNotFound),
        K::PermissionDenied => Outcome::Failure(ErrorKind::AccessDenied),
        K::AlreadyExists => Outcome::Failure(ErrorKind::AlreadyExists),
        K::ReadOnlyFilesystem => Outcome::Failure(ErrorKind::ReadOnly),
        K::BrokenPipe | K::WriteZero => Outcome::Failure(ErrorKind::IoError),
        K::OutOfMemory => Outcome::Failure(ErrorKind::OutOfMemory),
        _ => Outcome::Failure(ErrorKind::DeviceError),
    }
}

#[cfg(unix)]
mod platform {
    use super::{ErrorKind, Outcome};

    pub(super) fn classify(code: i32) -> Option<Outcome> {
        let kind = match code {
            libc::ENOENT | libc::ENODEV | libc::ENXIO => ErrorKind::FileNotFound,
            libc::EACCES | libc::EPERM => ErrorKind::AccessDenied,
            libc::EEXIST => ErrorKind::AlreadyExists,
            libc::EROFS => ErrorKind::ReadOnly,
            libc::ENAMETOOLONG | libc::ENOTDIR => ErrorKind::CreateFailed,
            libc::EPIPE | libc::EIO | libc::ENOBUFS | libc::EOVERFLOW => ErrorKind::IoError,
            libc::ENOMEM => ErrorKind::OutOfMemory,
            libc::ETIMEDOUT => return Some(Outcome::EndOfData),
            c if c == libc::EAGAIN || c == libc::EWOULDBLOCK => return Some(Outcome::EndOfData),
            _ => return None,
        };
        Some(Outcome::Failure(kind))
    }
}

#[cfg(windows)]
mod platform {
    use super::{ErrorKind, Outcome};
    use windows_sys::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_ALREADY_EXISTS, ERROR_BROKEN_PIPE, ERROR_CANNOT_MAKE,
        ERROR_FILENAME_EXCED_RANGE, ERROR_FILE_EXISTS, ERROR_FILE_NOT_FOUND, ERROR_FILE_READ_ONLY,
        ERROR_HANDLE_EOF, ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_NAME, ERROR_INVALID_USER_BUFFER,
        ERROR_NOT_ENOUGH_MEMORY, ERROR_PATH_NOT_FOUND,
    };

    pub(super) fn classify(code: i32) -> Option<Outcome> {
        let kind = match code as u32 {
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => ErrorKind::FileNotFound,
            ERROR_ACCESS_DENIED => ErrorKind::AccessDenied,
            ERROR_ALREADY_EXISTS | ERROR_FILE_EXISTS => ErrorKind::AlreadyExists,
            ERROR_FILE_READ_ONLY => ErrorKind::ReadOnly,
            ERROR_CANNOT_MAKE | ERROR_INVALID_NAME | ERROR_FILENAME_EXCED_RANGE => {
                ErrorKind::CreateFailed
            }
            ERROR_BROKEN_PIPE | ERROR_INVALID_USER_BUFFER | ERROR_INSUFFICIENT_BUFFER => {
                ErrorKind::IoError
            }
            ERROR_NOT_ENOUGH_MEMORY => ErrorKind::OutOfMemory,
            ERROR_HANDLE_EOF => return Some(Outcome::EndOfData),
            _ => return None,
        };
        Some(Outcome::Failure(kind))
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use super::Outcome;

    pub(super) fn classify(_code: i32) -> Option<Outcome> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(err: io::Error) -> Option<ErrorKind> {
        translate_io_error("/dev/ttyTEST", err).map(|e| e.kind())
    }

    #[test]
    fn test_end_of_data_is_filtered() {
        assert!(kind_of(io::Error::from(io::ErrorKind::TimedOut)).is_none());
        assert!(kind_of(io::Error::from(io::ErrorKind::WouldBlock)).is_none());
        assert!(kind_of(io::Error::from(io::ErrorKind::UnexpectedEof)).is_none());
    }

    #[test]
    fn test_portable_kinds() {
        assert_eq!(kind_of(io::ErrorKind::NotFound.into()), Some(ErrorKind::FileNotFound));
        assert_eq!(kind_of(io::ErrorKind::PermissionDenied.into()), Some(ErrorKind::AccessDenied));
        assert_eq!(kind_of(io::ErrorKind::AlreadyExists.into()), Some(ErrorKind::AlreadyExists));
        assert_eq!(kind_of(io::ErrorKind::BrokenPipe.into()), Some(ErrorKind::IoError));
        assert_eq!(kind_of(io::ErrorKind::OutOfMemory.into()), Some(ErrorKind::OutOfMemory));
        assert_eq!(kind_of(io::ErrorKind::Other.into()), Some(ErrorKind::DeviceError));
    }

    #[test]
    fn test_message_carries_port_name() {
        let err = translate_io_error("/dev/ttyTEST", io::ErrorKind::NotFound.into()).unwrap();
        assert!(err.to_string().contains("/dev/ttyTEST"));
    }

    #[test]
    fn test_control_error_never_end_of_data() {
        let err = translate_control_error("COM3", io::ErrorKind::TimedOut.into());
        assert_eq!(err.kind(), ErrorKind::DeviceError);
    }

    #[test]
    fn test_serialport_errors() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert_eq!(translate_serialport_error("COM3", err).kind(), ErrorKind::FileNotFound);

        let err = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
            "busy",
        );
        assert_eq!(translate_serialport_error("COM3", err).kind(), ErrorKind::AccessDenied);

        let err = serialport::Error::new(serialport::ErrorKind::Unknown, "?");
        assert_eq!(translate_serialport_error("COM3", err).kind(), ErrorKind::DeviceError);
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_codes() {
        let raw = |code| kind_of(io::Error::from_raw_os_error(code));
        assert_eq!(raw(libc::ENOENT), Some(ErrorKind::FileNotFound));
        assert_eq!(raw(libc::ENXIO), Some(ErrorKind::FileNotFound));
        assert_eq!(raw(libc::EACCES), Some(ErrorKind::AccessDenied));
        assert_eq!(raw(libc::EROFS), Some(ErrorKind::ReadOnly));
        assert_eq!(raw(libc::ENAMETOOLONG), Some(ErrorKind::CreateFailed));
        assert_eq!(raw(libc::EIO), Some(ErrorKind::IoError));
        assert_eq!(raw(libc::ENOMEM), Some(ErrorKind::OutOfMemory));
        assert_eq!(raw(libc::EAGAIN), None);
        assert_eq!(raw(libc::EBUSY), Some(ErrorKind::DeviceError));
    }
}
