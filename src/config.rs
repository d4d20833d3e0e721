/// Sniffer start-up configuration.
///
/// Nothing here is persisted; every boot starts from these values.
use crate::channel::DEFAULT_CHANNEL;

/// How captured frames are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report (length, source address, hex dump)
    Text,
    /// One JSON object per frame (see `protocol`)
    Ndjson,
}

impl OutputFormat {
    /// Format selected at build time; the `ndjson` feature switches to NDJSON.
    pub const BUILD_DEFAULT: Self = if cfg!(feature = "ndjson") {
        OutputFormat::Ndjson
    } else {
        OutputFormat::Text
    };
}

#[derive(Debug, Clone, Copy)]
pub struct SnifferConfig {
    /// Channel applied at bring-up
    pub channel: u8,
    /// Receive frames regardless of destination address
    pub promiscuous: bool,
    /// Keep the receiver armed between frames while receiving
    pub rx_when_idle: bool,
    pub format: OutputFormat,
}

impl SnifferConfig {
    pub const fn new() -> Self {
        Self {
            channel: DEFAULT_CHANNEL,
            promiscuous: true,
            rx_when_idle: true,
            format: OutputFormat::BUILD_DEFAULT,
        }
    }
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sniffer_bring_up() {
        let config = SnifferConfig::default();
        assert_eq!(config.channel, 11);
        assert!(config.promiscuous);
        assert!(config.rx_when_idle);
        assert_eq!(config.format, OutputFormat::BUILD_DEFAULT);
    }

    #[test]
    fn build_default_format_follows_feature() {
        let expected = if cfg!(feature = "ndjson") {
            OutputFormat::Ndjson
        } else {
            OutputFormat::Text
        };
        assert_eq!(OutputFormat::BUILD_DEFAULT, expected);
        assert_eq!(SnifferConfig::new().format, expected);
    }
}
