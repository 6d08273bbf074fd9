mod common;

use std::io;

use common::{scripted_channel, settings};
use devio_serial::ErrorKind;

#[test]
fn test_full_write_returns_length() {
    let (mut channel, backend) = scripted_channel(settings());
    channel.open().unwrap();
    assert_eq!(channel.write(b"STATUS\n").unwrap(), 7);
    assert_eq!(backend.written(), b"STATUS\n");
}

#[test]
fn test_zero_byte_write_is_io_error() {
    let (mut channel, backend) = scripted_channel(settings());
    backend.limit_writes(Some(0));
    channel.open().unwrap();
    assert_eq!(channel.write(b"ping").unwrap_err().kind(), ErrorKind::IoError);
}

#[test]
fn test_partial_write_is_io_error() {
    let (mut channel, backend) = scripted_channel(settings());
    backend.limit_writes(Some(3));
    channel.open().unwrap();
    let err = channel.write(b"abcdef").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoError);
    assert!(err.to_string().contains("3 of 6"));
}

#[test]
fn test_write_error_is_translated() {
    let (mut channel, backend) = scripted_channel(settings());
    backend.fail_next_write(io::ErrorKind::PermissionDenied.into());
    channel.open().unwrap();
    assert_eq!(channel.write(b"x").unwrap_err().kind(), ErrorKind::AccessDenied);
    // channel stays usable
    assert_eq!(channel.write(b"x").unwrap(), 1);
}

#[test]
fn test_empty_write_skips_device() {
    let (mut channel, backend) = scripted_channel(settings());
    channel.open().unwrap();
    assert_eq!(channel.write(b"").unwrap(), 0);
    assert_eq!(backend.stats().writes, 0);
}
