/// NDJSON message protocol for streaming captures to a host.
///
/// All messages are newline-delimited JSON (NDJSON).
/// Uses `heapless` types for no_std/no-alloc operation.
use core::fmt::Write;

use heapless::{String, Vec};
use serde::Serialize;

use crate::frame::{AddressString, MAX_FRAME_LEN};

/// Frame octets as contiguous lowercase hex
pub type HexString = String<{ 2 * MAX_FRAME_LEN }>;

/// Messages sent from the sniffer to the host
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// One captured frame
    #[serde(rename = "frame")]
    Frame {
        /// Frame length in octets
        len: u8,
        ch: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        rssi: Option<i8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lqi: Option<u8>,
        /// Long source address, if the frame carries one
        #[serde(skip_serializing_if = "Option::is_none")]
        src: Option<&'a AddressString>,
        data: &'a HexString,
        /// Uptime in milliseconds when captured
        ts: u32,
    },
    /// Sniffer status report
    #[serde(rename = "status")]
    Status {
        /// "disabled", "idle", "receiving" or "sleeping"
        state: &'static str,
        channel: u8,
        /// Chip identifier
        board: &'static str,
        /// Firmware version
        version: &'static str,
    },
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 512;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

/// Serialize a DeviceMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_message(msg: &DeviceMessage, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(msg, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}

/// Serialize into a fresh `MsgBuffer`, newline included.
pub fn to_msg_buffer(msg: &DeviceMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok();
    let len = serialize_message(msg, &mut buf)?;
    buf.truncate(len);
    Some(buf)
}

/// Encode octets as contiguous lowercase hex.
pub fn encode_hex(bytes: &[u8], buf: &mut HexString) {
    for b in bytes.iter().take(MAX_FRAME_LEN) {
        let _ = write!(buf, "{:02x}", b);
    }
}
