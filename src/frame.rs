/// Captured 802.15.4 frame records.
///
/// The radio driver hands over its receive buffer with the PHY length octet
/// at index 0, so the frame control field starts at octet 1. Only the
/// long-source-address bit is decoded; no further MAC parsing happens here.
use core::fmt::Write;

use heapless::Vec;

/// Maximum PHY payload size (aMaxPHYPacketSize).
pub const MAX_FRAME_LEN: usize = 127;

/// Length of an extended (64-bit) address.
pub const LONG_ADDRESS_LEN: usize = 8;

const FRAME_CONTROL_OFFSET: usize = 1;
const LONG_SOURCE_BIT: u8 = 0x40;
const SOURCE_ADDRESS_OFFSET: usize = 3;

/// "aa:bb:cc:dd:ee:ff:00:11"
pub type AddressString = heapless::String<24>;

/// Receive metadata reported alongside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    /// Channel the frame was received on
    pub channel: u8,
    pub rssi: Option<i8>,
    pub lqi: Option<u8>,
    /// Uptime in milliseconds when received
    pub timestamp_ms: u32,
}

/// Immutable snapshot of one received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    bytes: Vec<u8, MAX_FRAME_LEN>,
    source_address: Option<[u8; LONG_ADDRESS_LEN]>,
    info: FrameInfo,
}

impl FrameRecord {
    /// Build a record from the first `length` octets of `raw`.
    ///
    /// `length` is clamped to `raw.len()` and `MAX_FRAME_LEN`; nothing past
    /// `raw[length - 1]` is read. The source address is only taken when the
    /// frame control bit is set and the frame is long enough to hold it.
    pub fn from_raw(raw: &[u8], length: usize, info: FrameInfo) -> Self {
        let available = raw.len().min(MAX_FRAME_LEN);
        let len = if length > available {
            log::warn!(
                "Frame length {} exceeds {} available octets, truncating",
                length,
                available
            );
            available
        } else {
            length
        };

        let mut bytes = Vec::new();
        let _ = bytes.extend_from_slice(&raw[..len]);

        Self {
            source_address: long_source_address(&bytes),
            bytes,
            info,
        }
    }

    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn has_long_source_address(&self) -> bool {
        self.source_address.is_some()
    }

    pub fn source_address(&self) -> Option<&[u8; LONG_ADDRESS_LEN]> {
        self.source_address.as_ref()
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }
}

fn long_source_address(frame: &[u8]) -> Option<[u8; LONG_ADDRESS_LEN]> {
    let control = *frame.get(FRAME_CONTROL_OFFSET)?;
    if control & LONG_SOURCE_BIT == 0 {
        return None;
    }
    frame
        .get(SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + LONG_ADDRESS_LEN)?
        .try_into()
        .ok()
}

/// RSSI the driver writes over the first FCS octet of a received buffer
/// (`raw[raw[0] - 1]`). Falls back to the last octet when the length octet
/// is zero or larger than the buffer.
pub fn trailer_rssi(raw: &[u8]) -> Option<i8> {
    let phy_len = *raw.first()? as usize;
    let index = if phy_len == 0 || phy_len > raw.len() {
        raw.len() - 1
    } else {
        phy_len - 1
    };
    Some(raw[index] as i8)
}

/// Map RSSI to link quality: -80 dBm and below is 0, -30 dBm and above 255,
/// linear in between.
pub fn rssi_to_lqi(rssi: i8) -> u8 {
    match rssi {
        i8::MIN..=-81 => 0,
        -30..=i8::MAX => u8::MAX,
        _ => ((rssi as i32 + 80) * 255 / 50) as u8,
    }
}

/// Format an 8-octet address as colon-separated lowercase hex.
pub fn format_address(addr: &[u8; LONG_ADDRESS_LEN], buf: &mut AddressString) {
    for (i, b) in addr.iter().enumerate() {
        if i > 0 {
            let _ = buf.push(':');
        }
        let _ = write!(buf, "{:02x}", b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_SOURCE: [u8; 16] = [
        0x0f, 0x40, 0xcc, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xaa, 0xbb, 0xcc, 0xdd,
        0xee,
    ];

    #[test]
    fn long_source_address_taken_from_offset_three() {
        let record = FrameRecord::from_raw(&WITH_SOURCE, 15, FrameInfo::default());
        assert_eq!(record.length(), 15);
        assert_eq!(record.bytes(), &WITH_SOURCE[..15]);
        assert!(record.has_long_source_address());
        assert_eq!(
            record.source_address(),
            Some(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08])
        );
    }

    #[test]
    fn no_source_address_without_control_bit() {
        let mut raw = WITH_SOURCE;
        raw[1] = 0x00;
        let record = FrameRecord::from_raw(&raw, 5, FrameInfo::default());
        assert_eq!(record.length(), 5);
        assert!(!record.has_long_source_address());
        assert_eq!(record.source_address(), None);
    }

    #[test]
    fn control_bit_on_short_frame_reads_nothing_past_length() {
        let record = FrameRecord::from_raw(&WITH_SOURCE, 5, FrameInfo::default());
        assert_eq!(record.bytes(), &[0x0f, 0x40, 0xcc, 0x01, 0x02]);
        assert!(!record.has_long_source_address());

        // Exactly long enough
        let record = FrameRecord::from_raw(&WITH_SOURCE, 11, FrameInfo::default());
        assert!(record.has_long_source_address());
    }

    #[test]
    fn zero_length_frame() {
        let record = FrameRecord::from_raw(&WITH_SOURCE, 0, FrameInfo::default());
        assert_eq!(record.length(), 0);
        assert!(record.bytes().is_empty());
        assert!(!record.has_long_source_address());

        let record = FrameRecord::from_raw(&[], 0, FrameInfo::default());
        assert_eq!(record.length(), 0);
    }

    #[test]
    fn length_clamped_to_buffer_and_phy_maximum() {
        let record = FrameRecord::from_raw(&WITH_SOURCE, 200, FrameInfo::default());
        assert_eq!(record.length(), WITH_SOURCE.len());

        let big = [0u8; 200];
        let record = FrameRecord::from_raw(&big, 200, FrameInfo::default());
        assert_eq!(record.length(), MAX_FRAME_LEN);
    }

    #[test]
    fn info_is_carried() {
        let info = FrameInfo {
            channel: 15,
            rssi: Some(-60),
            lqi: Some(200),
            timestamp_ms: 1234,
        };
        let record = FrameRecord::from_raw(&WITH_SOURCE, 3, info);
        assert_eq!(record.info(), &info);
    }

    #[test]
    fn rssi_read_from_fcs_position() {
        // PHY length 6: MAC octets 1..=4, FCS octets 5..=6 with RSSI at 5.
        let raw = [0x06, 0x41, 0x88, 0x01, 0x02, 0xc4, 0x00, 0x00];
        assert_eq!(trailer_rssi(&raw), Some(-60));
    }

    #[test]
    fn rssi_falls_back_to_last_octet() {
        assert_eq!(trailer_rssi(&[0x00, 0x11, 0xb0]), Some(-80));
        assert_eq!(trailer_rssi(&[0x7f, 0x11, 0xd8]), Some(-40));
        assert_eq!(trailer_rssi(&[]), None);
    }

    #[test]
    fn lqi_scale() {
        assert_eq!(rssi_to_lqi(-100), 0);
        assert_eq!(rssi_to_lqi(-81), 0);
        assert_eq!(rssi_to_lqi(-80), 0);
        assert_eq!(rssi_to_lqi(-55), 127);
        assert_eq!(rssi_to_lqi(-30), 255);
        assert_eq!(rssi_to_lqi(10), 255);
    }

    #[test]
    fn format_address_lowercase_colon_separated() {
        let mut s = AddressString::new();
        format_address(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x0a, 0xff], &mut s);
        assert_eq!(s.as_str(), "de:ad:be:ef:00:01:0a:ff");
    }
}
