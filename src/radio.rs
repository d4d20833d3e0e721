/// Radio state machine for promiscuous 802.15.4 reception.
///
/// `RadioController` exclusively owns the radio state and the selected
/// channel, and drives the hardware through the [`Radio`] trait. Every
/// operation is a synchronous request that takes effect before it returns.
///
/// ```text
///   Disabled --enable--> Idle --start_receive--> Receiving
///      ^                  ^ |                       |
///      |                  | +--sleep--> Sleeping <--+ sleep
///      +--- disable ---   +---- stop_receive -------+
///                         Sleeping --enable/start_receive--> Idle/Receiving
/// ```
use core::fmt;

use crate::channel::{Channel, ChannelError, ChannelSelector};
use crate::config::SnifferConfig;

/// Radio power/receive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Disabled,
    Idle,
    Receiving,
    Sleeping,
}

impl RadioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioState::Disabled => "disabled",
            RadioState::Idle => "idle",
            RadioState::Receiving => "receiving",
            RadioState::Sleeping => "sleeping",
        }
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareError {
    /// Driver operation that failed, e.g. "enable"
    pub operation: &'static str,
    /// Driver-specific error code
    pub code: i32,
}

impl HardwareError {
    pub const fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "radio {} failed (error {})", self.operation, self.code)
    }
}

impl core::error::Error for HardwareError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The operation needs an enabled radio.
    NotEnabled,
    /// `sleep()` while already sleeping.
    AlreadySleeping,
    /// Start-up channel outside 11..=26.
    Channel(ChannelError),
    /// Passed through unchanged from the driver.
    Hardware(HardwareError),
}

impl From<HardwareError> for RadioError {
    fn from(e: HardwareError) -> Self {
        RadioError::Hardware(e)
    }
}

impl From<ChannelError> for RadioError {
    fn from(e: ChannelError) -> Self {
        RadioError::Channel(e)
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::NotEnabled => f.write_str("radio is not enabled"),
            RadioError::AlreadySleeping => f.write_str("radio is already in sleep mode"),
            RadioError::Channel(e) => write!(f, "{}", e),
            RadioError::Hardware(e) => write!(f, "{}", e),
        }
    }
}

impl core::error::Error for RadioError {}

/// Hardware radio collaborator.
///
/// Implemented by the firmware on top of the chip driver, and by test
/// doubles on the host. Calls must not block; they either complete promptly
/// or fail immediately. Received frames are delivered separately, to a
/// [`crate::capture::CaptureSink`].
pub trait Radio {
    fn enable(&mut self) -> Result<(), HardwareError>;
    fn disable(&mut self) -> Result<(), HardwareError>;
    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), HardwareError>;
    fn set_rx_when_idle(&mut self, enabled: bool) -> Result<(), HardwareError>;
    fn set_channel(&mut self, channel: Channel) -> Result<(), HardwareError>;
    fn receive(&mut self) -> Result<(), HardwareError>;
    fn sleep(&mut self) -> Result<(), HardwareError>;
    /// State as reported by the driver.
    fn get_state(&self) -> RadioState;
}

/// Owns the radio, its state and the selected channel.
pub struct RadioController<R: Radio> {
    radio: R,
    state: RadioState,
    channels: ChannelSelector,
    promiscuous: bool,
    rx_when_idle: bool,
}

impl<R: Radio> RadioController<R> {
    /// Wrap a driver. Starts `Disabled` on the default channel.
    pub fn new(radio: R) -> Self {
        let defaults = SnifferConfig::new();
        Self {
            radio,
            state: RadioState::Disabled,
            channels: ChannelSelector::new(),
            promiscuous: defaults.promiscuous,
            rx_when_idle: defaults.rx_when_idle,
        }
    }

    /// Apply `config` and enable the radio, leaving it `Idle`.
    ///
    /// The stored settings only change if the radio comes up.
    pub fn bring_up(&mut self, config: &SnifferConfig) -> Result<RadioState, RadioError> {
        let channel = Channel::new(config.channel as i32)?;
        let previous = (self.channels, self.promiscuous, self.rx_when_idle);

        self.channels.select(channel);
        self.promiscuous = config.promiscuous;
        self.rx_when_idle = config.rx_when_idle;

        self.enable().inspect_err(|_| {
            (self.channels, self.promiscuous, self.rx_when_idle) = previous;
        })
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    /// State as the driver reports it, which may lag `state()` on real
    /// hardware while a transition settles.
    pub fn hardware_state(&self) -> RadioState {
        self.radio.get_state()
    }

    pub fn channel(&self) -> Channel {
        self.channels.get_channel()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Store a new channel. Takes effect on the next `start_receive()`.
    pub fn set_channel(&mut self, value: i32) -> Result<Channel, ChannelError> {
        let channel = self.channels.set_channel(value)?;
        if self.state == RadioState::Receiving {
            log::info!("Channel {} selected, restart reception to apply", channel);
        } else {
            log::info!("Channel {} selected", channel);
        }
        Ok(channel)
    }

    /// Power the radio up. Also wakes it from sleep.
    pub fn enable(&mut self) -> Result<RadioState, RadioError> {
        match self.state {
            RadioState::Idle | RadioState::Receiving => {
                log::warn!("Radio already enabled ({})", self.state);
                Ok(self.state)
            }
            RadioState::Disabled | RadioState::Sleeping => {
                self.radio.enable()?;
                self.radio.set_promiscuous(self.promiscuous)?;
                self.radio.set_rx_when_idle(false)?;
                self.radio.set_channel(self.channels.get_channel())?;
                Ok(self.transition(RadioState::Idle))
            }
        }
    }

    /// Start (or restart) promiscuous reception on the selected channel.
    pub fn start_receive(&mut self) -> Result<RadioState, RadioError> {
        match self.state {
            RadioState::Disabled => Err(RadioError::NotEnabled),
            RadioState::Sleeping => {
                self.enable()?;
                self.arm_receiver()
            }
            RadioState::Idle | RadioState::Receiving => self.arm_receiver(),
        }
    }

    /// Stop reception. Stopping an already stopped receiver is a no-op.
    pub fn stop_receive(&mut self) -> Result<RadioState, RadioError> {
        match self.state {
            RadioState::Disabled => Err(RadioError::NotEnabled),
            RadioState::Receiving => {
                self.radio.set_rx_when_idle(false)?;
                Ok(self.transition(RadioState::Idle))
            }
            RadioState::Idle | RadioState::Sleeping => {
                log::warn!("Receiver already stopped ({})", self.state);
                Ok(self.state)
            }
        }
    }

    /// Enter low-power sleep. Leave it with `enable()` or `start_receive()`.
    pub fn sleep(&mut self) -> Result<RadioState, RadioError> {
        match self.state {
            RadioState::Disabled => Err(RadioError::NotEnabled),
            RadioState::Sleeping => Err(RadioError::AlreadySleeping),
            RadioState::Idle | RadioState::Receiving => {
                self.radio.sleep()?;
                Ok(self.transition(RadioState::Sleeping))
            }
        }
    }

    /// Power the radio down from any state.
    pub fn disable(&mut self) -> Result<RadioState, RadioError> {
        if self.state != RadioState::Disabled {
            self.radio.disable()?;
            self.transition(RadioState::Disabled);
        }
        Ok(self.state)
    }

    fn arm_receiver(&mut self) -> Result<RadioState, RadioError> {
        let channel = self.channels.get_channel();
        self.radio.set_channel(channel)?;
        self.radio.set_rx_when_idle(self.rx_when_idle)?;
        self.radio.receive()?;
        log::info!(
            "Receiving on channel {} ({} MHz)",
            channel,
            channel.center_frequency_mhz()
        );
        Ok(self.transition(RadioState::Receiving))
    }

    fn transition(&mut self, to: RadioState) -> RadioState {
        if self.state != to {
            log::info!("Radio {} -> {}", self.state, to);
            self.state = to;
        }
        to
    }
}

/// Recording driver double shared by the library's tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    #[derive(Default)]
    pub struct MockRadio {
        pub calls: Vec<&'static str>,
        pub fail_on: Option<&'static str>,
        pub channel: Option<u8>,
        pub promiscuous: bool,
        pub rx_when_idle: bool,
        pub state: Option<RadioState>,
    }

    impl MockRadio {
        pub fn failing_on(operation: &'static str) -> Self {
            Self {
                fail_on: Some(operation),
                ..Self::default()
            }
        }

        fn call(&mut self, operation: &'static str) -> Result<(), HardwareError> {
            self.calls.push(operation);
            if self.fail_on == Some(operation) {
                Err(HardwareError::new(operation, -1))
            } else {
                Ok(())
            }
        }
    }

    impl Radio for MockRadio {
        fn enable(&mut self) -> Result<(), HardwareError> {
            self.call("enable")?;
            self.state = Some(RadioState::Idle);
            Ok(())
        }

        fn disable(&mut self) -> Result<(), HardwareError> {
            self.call("disable")?;
            self.state = Some(RadioState::Disabled);
            Ok(())
        }

        fn set_promiscuous(&mut self, enabled: bool) -> Result<(), HardwareError> {
            self.call("set_promiscuous")?;
            self.promiscuous = enabled;
            Ok(())
        }

        fn set_rx_when_idle(&mut self, enabled: bool) -> Result<(), HardwareError> {
            self.call("set_rx_when_idle")?;
            self.rx_when_idle = enabled;
            Ok(())
        }

        fn set_channel(&mut self, channel: Channel) -> Result<(), HardwareError> {
            self.call("set_channel")?;
            self.channel = Some(channel.get());
            Ok(())
        }

        fn receive(&mut self) -> Result<(), HardwareError> {
            self.call("receive")?;
            self.state = Some(RadioState::Receiving);
            Ok(())
        }

        fn sleep(&mut self) -> Result<(), HardwareError> {
            self.call("sleep")?;
            self.state = Some(RadioState::Sleeping);
            Ok(())
        }

        fn get_state(&self) -> RadioState {
            self.state.unwrap_or(RadioState::Disabled)
        }
    }
}
