/// IEEE 802.15.4 channel selection for the 2.4 GHz O-QPSK PHY.
///
/// Storing a channel has no effect on the radio; reception has to be
/// restarted before a new channel is used.
use core::fmt;

/// Lowest 2.4 GHz O-QPSK channel.
pub const MIN_CHANNEL: u8 = 11;

/// Highest 2.4 GHz O-QPSK channel.
pub const MAX_CHANNEL: u8 = 26;

/// Channel selected at power-on.
pub const DEFAULT_CHANNEL: u8 = MIN_CHANNEL;

/// A channel number guaranteed to lie in `MIN_CHANNEL..=MAX_CHANNEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Validate a raw channel number.
    pub fn new(value: i32) -> Result<Self, ChannelError> {
        if value < MIN_CHANNEL as i32 || value > MAX_CHANNEL as i32 {
            return Err(ChannelError::OutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Center frequency in MHz (2405 + 5 * (k - 11)).
    pub const fn center_frequency_mhz(self) -> u16 {
        2405 + 5 * (self.0 as u16 - MIN_CHANNEL as u16)
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self(DEFAULT_CHANNEL)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Requested channel lies outside 11..=26.
    OutOfRange(i32),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::OutOfRange(value) => write!(
                f,
                "channel {} outside {}..={}",
                value, MIN_CHANNEL, MAX_CHANNEL
            ),
        }
    }
}

impl core::error::Error for ChannelError {}

/// Holds the channel the next reception will use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSelector {
    current: Channel,
}

impl ChannelSelector {
    pub const fn new() -> Self {
        Self {
            current: Channel(DEFAULT_CHANNEL),
        }
    }

    /// Replace the stored channel. Out-of-range values leave it untouched.
    pub fn set_channel(&mut self, value: i32) -> Result<Channel, ChannelError> {
        let channel = Channel::new(value)?;
        self.current = channel;
        Ok(channel)
    }

    /// Store an already validated channel.
    pub fn select(&mut self, channel: Channel) {
        self.current = channel;
    }

    pub fn get_channel(&self) -> Channel {
        self.current
    }
}
