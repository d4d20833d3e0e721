/// Frame capture pipeline.
///
/// The radio driver calls [`CaptureSink::on_frame`] for every received
/// frame, from its own execution context and independently of console
/// commands. The sink never touches the radio controller.
///
/// Precondition supplied by the driver: frame events are delivered one at a
/// time. `on_frame` takes `&mut self`, so a single sink cannot be entered
/// twice; the firmware guarantees it by draining frames from one task.
/// Each frame's output is rendered completely before it is emitted as a
/// single write, so reports never interleave.
use core::fmt::Write;

use crate::config::OutputFormat;
use crate::frame::{format_address, AddressString, FrameInfo, FrameRecord};
use crate::protocol::{encode_hex, to_msg_buffer, DeviceMessage, HexString};

/// Capacity of a rendered text report (header + address + 127 * "xx ").
pub const REPORT_LEN: usize = 512;

pub type ReportBuffer = heapless::String<REPORT_LEN>;

/// Receives every captured frame.
///
/// Either driver integration style (a registered callback or a fixed
/// entry point the driver invokes) ends in a call to a `FrameConsumer`
/// through [`CaptureSink`].
pub trait FrameConsumer {
    fn consume(&mut self, record: &FrameRecord);
}

impl<F: FnMut(&FrameRecord)> FrameConsumer for F {
    fn consume(&mut self, record: &FrameRecord) {
        self(record)
    }
}

/// Render the human-readable report for one frame:
///
/// ```text
/// Received frame: 12 bytes
/// Source address: 01:02:03:04:05:06:07:08
/// 0c 40 cc 01 02 03 04 05 06 07 08 aa
/// ```
///
/// The address line only appears when the frame carries a long source
/// address; the hex line is omitted for empty frames.
pub fn render_report(record: &FrameRecord, buf: &mut ReportBuffer) {
    let _ = write!(buf, "Received frame: {} bytes", record.length());

    if let Some(addr) = record.source_address() {
        let mut addr_str = AddressString::new();
        format_address(addr, &mut addr_str);
        let _ = write!(buf, "\nSource address: {}", addr_str);
    }

    for (i, b) in record.bytes().iter().enumerate() {
        let sep = if i == 0 { '\n' } else { ' ' };
        let _ = write!(buf, "{}{:02x}", sep, b);
    }
}

/// Emits the text report as one `log::info!` record.
pub struct LogConsumer;

impl FrameConsumer for LogConsumer {
    fn consume(&mut self, record: &FrameRecord) {
        let mut report = ReportBuffer::new();
        render_report(record, &mut report);
        log::info!("{}", report);
    }
}

/// Serializes each frame as one NDJSON line and hands it to `write`.
pub struct NdjsonConsumer<W: FnMut(&[u8])> {
    write: W,
}

impl<W: FnMut(&[u8])> NdjsonConsumer<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }
}

impl<W: FnMut(&[u8])> FrameConsumer for NdjsonConsumer<W> {
    fn consume(&mut self, record: &FrameRecord) {
        let src = record.source_address().map(|addr| {
            let mut s = AddressString::new();
            format_address(addr, &mut s);
            s
        });
        let mut data = HexString::new();
        encode_hex(record.bytes(), &mut data);

        let info = record.info();
        let msg = DeviceMessage::Frame {
            len: record.length() as u8,
            ch: info.channel,
            rssi: info.rssi,
            lqi: info.lqi,
            src: src.as_ref(),
            data: &data,
            ts: info.timestamp_ms,
        };

        match to_msg_buffer(&msg) {
            Some(line) => (self.write)(line.as_slice()),
            None => log::warn!("Dropped {}-byte frame: serialization failed", record.length()),
        }
    }
}

/// Consumer selected by [`OutputFormat`].
pub enum FormatConsumer<W: FnMut(&[u8])> {
    Text(LogConsumer),
    Ndjson(NdjsonConsumer<W>),
}

impl<W: FnMut(&[u8])> FormatConsumer<W> {
    /// `write` receives NDJSON lines; unused for `Text`.
    pub fn new(format: OutputFormat, write: W) -> Self {
        match format {
            OutputFormat::Text => FormatConsumer::Text(LogConsumer),
            OutputFormat::Ndjson => FormatConsumer::Ndjson(NdjsonConsumer::new(write)),
        }
    }
}

impl<W: FnMut(&[u8])> FrameConsumer for FormatConsumer<W> {
    fn consume(&mut self, record: &FrameRecord) {
        match self {
            FormatConsumer::Text(c) => c.consume(record),
            FormatConsumer::Ndjson(c) => c.consume(record),
        }
    }
}

/// Turns raw driver buffers into [`FrameRecord`]s and forwards them.
pub struct CaptureSink<C: FrameConsumer> {
    consumer: C,
    frames: u32,
}

impl<C: FrameConsumer> CaptureSink<C> {
    pub const fn new(consumer: C) -> Self {
        Self {
            consumer,
            frames: 0,
        }
    }

    /// Handle one received frame. See [`FrameRecord::from_raw`] for how
    /// `raw` and `length` are interpreted.
    pub fn on_frame(&mut self, raw: &[u8], length: usize, info: FrameInfo) -> FrameRecord {
        let record = FrameRecord::from_raw(raw, length, info);
        self.frames = self.frames.wrapping_add(1);
        self.consumer.consume(&record);
        record
    }

    /// Frames handled since creation
    pub fn frames_captured(&self) -> u32 {
        self.frames
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: [u8; 12] = [
        0x0c, 0x40, 0xcc, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xaa,
    ];

    fn report_for(raw: &[u8], length: usize) -> ReportBuffer {
        let record = FrameRecord::from_raw(raw, length, FrameInfo::default());
        let mut buf = ReportBuffer::new();
        render_report(&record, &mut buf);
        buf
    }

    #[test]
    fn report_with_source_address() {
        let report = report_for(&FRAME, 12);
        assert_eq!(
            report.as_str(),
            "Received frame: 12 bytes\n\
             Source address: 01:02:03:04:05:06:07:08\n\
             0c 40 cc 01 02 03 04 05 06 07 08 aa"
        );
    }

    #[test]
    fn report_without_source_address() {
        let report = report_for(&[0x05, 0x00, 0x11, 0x22, 0x33], 5);
        assert_eq!(report.as_str(), "Received frame: 5 bytes\n05 00 11 22 33");
    }

    #[test]
    fn empty_frame_reports_length_only() {
        let report = report_for(&FRAME, 0);
        assert_eq!(report.as_str(), "Received frame: 0 bytes");
    }

    #[test]
    fn largest_frame_fits_report_buffer() {
        let raw = [0x41u8; 127];
        let report = report_for(&raw, 127);

        let mut expected = std::string::String::from(
            "Received frame: 127 bytes\nSource address: 41:41:41:41:41:41:41:41\n41",
        );
        expected.push_str(&" 41".repeat(126));
        assert_eq!(report.as_str(), expected);
        // header 3, address line 2, hex separators 126
        assert_eq!(report.matches(' ').count(), 3 + 2 + 126);
        assert!(report.len() < REPORT_LEN);
    }

    #[test]
    fn sink_forwards_and_returns_record() {
        let mut seen = std::vec::Vec::new();
        let mut sink = CaptureSink::new(|r: &FrameRecord| seen.push(r.length()));
        let record = sink.on_frame(&FRAME, 12, FrameInfo::default());
        sink.on_frame(&FRAME, 0, FrameInfo::default());
        assert_eq!(sink.frames_captured(), 2);
        assert!(record.has_long_source_address());
        drop(sink);
        assert_eq!(seen, [12, 0]);
    }

    #[test]
    fn sink_never_reads_past_length() {
        let mut sink = CaptureSink::new(LogConsumer);
        let record = sink.on_frame(&FRAME[..3], 3, FrameInfo::default());
        assert_eq!(record.bytes(), &FRAME[..3]);
        assert!(!record.has_long_source_address());
    }

    #[test]
    fn ndjson_consumer_writes_one_line_per_frame() {
        let mut lines: std::vec::Vec<std::string::String> = std::vec::Vec::new();
        {
            let mut sink = CaptureSink::new(NdjsonConsumer::new(|line: &[u8]| {
                lines.push(core::str::from_utf8(line).unwrap().to_owned())
            }));
            let info = FrameInfo {
                channel: 15,
                rssi: Some(-70),
                lqi: None,
                timestamp_ms: 42,
            };
            sink.on_frame(&FRAME, 12, info);
            sink.on_frame(&FRAME, 0, info);
        }
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with('\n'));
        assert!(lines[0].contains(r#""src":"01:02:03:04:05:06:07:08""#));
        assert!(lines[0].contains(r#""data":"0c40cc0102030405060708aa""#));
        assert!(lines[0].contains(r#""ch":15"#));
        assert!(lines[0].contains(r#""rssi":-70"#));
        assert!(lines[1].contains(r#""len":0"#));
        assert!(!lines[1].contains("src"));
    }

    #[test]
    fn format_consumer_follows_output_format() {
        let mut count = 0;
        {
            let mut text = FormatConsumer::new(OutputFormat::Text, |_: &[u8]| count += 1);
            let record = FrameRecord::from_raw(&FRAME, 12, FrameInfo::default());
            text.consume(&record);
            assert!(matches!(text, FormatConsumer::Text(_)));
        }
        assert_eq!(count, 0);

        {
            let mut json = FormatConsumer::new(OutputFormat::Ndjson, |_: &[u8]| count += 1);
            let record = FrameRecord::from_raw(&FRAME, 12, FrameInfo::default());
            json.consume(&record);
        }
        assert_eq!(count, 1);
    }
}
