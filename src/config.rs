// ABOUTME: Modem connection configuration with builder-style setters and validation
// ABOUTME: Carries the device path, baud whitelist, command timeout, and concat-mode toggle

use crate::error::{SmsError, SmsResult};
use std::time::Duration;

/// Baud rates accepted by the transport; anything else is a validation error.
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [
    9600, 14400, 19200, 38400, 57600, 115200, 128000, 256000,
];

/// Default serial speed (8N1 assumed).
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-command response deadline.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one modem on one serial port.
///
/// One configured transport owns exactly one port; there is no multi-port
/// multiplexing.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// OS path of the serial device, e.g. `/dev/ttyUSB0`
    pub device: String,
    /// Serial speed; must be one of [`SUPPORTED_BAUD_RATES`]
    pub baud_rate: u32,
    /// Deadline applied to every issued command
    pub command_timeout: Duration,
    /// Reassemble concatenated messages (on by default)
    pub concatenate: bool,
    /// Capacity of the lifecycle event channel
    pub event_capacity: usize,
}

impl ModemConfig {
    /// Create a configuration for `device` with defaults everywhere else.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            concatenate: true,
            event_capacity: 64,
        }
    }

    /// Set the serial speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-command response deadline.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Disable concatenated-message reassembly; fragments are then listed
    /// and delivered individually.
    pub fn without_concatenation(mut self) -> Self {
        self.concatenate = false;
        self
    }

    /// Check the configuration before any I/O.
    pub fn validate(&self) -> SmsResult<()> {
        if self.device.is_empty() {
            return Err(SmsError::Validation("device path is empty".into()));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(SmsError::Validation(format!(
                "unsupported baud rate {}, expected one of {:?}",
                self.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }
        validate_timeout(self.command_timeout)?;
        Ok(())
    }
}

/// Per-command timeouts must fall in 1 ms ..= 60 s.
pub(crate) fn validate_timeout(timeout: Duration) -> SmsResult<()> {
    if timeout < Duration::from_millis(1) || timeout > Duration::from_millis(60_000) {
        return Err(SmsError::Validation(format!(
            "command timeout {timeout:?} outside 1ms..=60s"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(ModemConfig::new("/dev/ttyUSB0").validate().is_ok());
    }

    #[test]
    fn rejects_off_list_baud() {
        let config = ModemConfig::new("/dev/ttyUSB0").with_baud_rate(12_345);
        assert!(matches!(config.validate(), Err(SmsError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let config =
            ModemConfig::new("/dev/ttyUSB0").with_command_timeout(Duration::from_secs(120));
        assert!(matches!(config.validate(), Err(SmsError::Validation(_))));
        assert!(validate_timeout(Duration::from_millis(1)).is_ok());
        assert!(validate_timeout(Duration::from_millis(60_000)).is_ok());
    }
}
