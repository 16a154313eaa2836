//! Timing configuration for device operations

use std::env;
use std::time::Duration;

use tracing::warn;

/// Read a delay in seconds from the environment, falling back to `default`
///
/// Values that are not representable as a `Duration` (negative, NaN, or too
/// large) are ignored.
fn env_secs(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| Duration::try_from_secs_f64(*v).is_ok())
        .unwrap_or(default)
}

/// Delays applied after device operations, in seconds
///
/// Values are read from `ADBCTL_*` environment variables when the config is
/// built, so each session captures its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// Pause after a key event so the device can settle
    pub key_event_delay: f64,
    pub tap_delay: f64,
    pub swipe_delay: f64,
    /// Pause between `ime set` and the verification query during restore
    pub ime_settle_delay: f64,
    /// Upper bound for the on-device `screencap` call
    pub screenshot_timeout: f64,
}

impl TimingConfig {
    /// Build the config from the environment
    pub fn from_env() -> Self {
        Self {
            key_event_delay: env_secs("ADBCTL_KEY_EVENT_DELAY", 0.5),
            tap_delay: env_secs("ADBCTL_TAP_DELAY", 0.0),
            swipe_delay: env_secs("ADBCTL_SWIPE_DELAY", 0.0),
            ime_settle_delay: env_secs("ADBCTL_IME_SETTLE_DELAY", 0.0),
            screenshot_timeout: env_secs("ADBCTL_SCREENSHOT_TIMEOUT", 10.0),
        }
    }

    /// All delays zero; useful for tests and scripted runs
    pub fn immediate() -> Self {
        Self {
            key_event_delay: 0.0,
            tap_delay: 0.0,
            swipe_delay: 0.0,
            ime_settle_delay: 0.0,
            screenshot_timeout: 10.0,
        }
    }

    /// Seconds to `Duration`; negative or NaN becomes zero, overflow saturates
    pub(crate) fn duration(secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs).unwrap_or_else(|e| {
            warn!("invalid delay {}s: {}", secs, e);
            if secs > 0.0 {
                Duration::MAX
            } else {
                Duration::ZERO
            }
        })
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_secs_fallback() {
        assert_eq!(env_secs("ADBCTL_TEST_UNSET_DELAY", 0.25), 0.25);
    }

    #[test]
    fn test_env_secs_rejects_negative() {
        env::set_var("ADBCTL_TEST_NEGATIVE_DELAY", "-1.5");
        assert_eq!(env_secs("ADBCTL_TEST_NEGATIVE_DELAY", 0.5), 0.5);
        env::set_var("ADBCTL_TEST_VALID_DELAY", "2.5");
        assert_eq!(env_secs("ADBCTL_TEST_VALID_DELAY", 0.5), 2.5);
    }

    #[test]
    fn test_env_secs_rejects_unrepresentable() {
        env::set_var("ADBCTL_TEST_HUGE_DELAY", "1e20");
        assert_eq!(env_secs("ADBCTL_TEST_HUGE_DELAY", 0.5), 0.5);
        env::set_var("ADBCTL_TEST_NAN_DELAY", "NaN");
        assert_eq!(env_secs("ADBCTL_TEST_NAN_DELAY", 0.5), 0.5);
    }

    #[test]
    fn test_duration_never_panics() {
        assert_eq!(TimingConfig::duration(1e20), Duration::MAX);
        assert_eq!(TimingConfig::duration(f64::INFINITY), Duration::MAX);
        assert_eq!(TimingConfig::duration(-1.0), Duration::ZERO);
        assert_eq!(TimingConfig::duration(f64::NAN), Duration::ZERO);
        assert_eq!(TimingConfig::duration(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_immediate_has_no_delays() {
        let timing = TimingConfig::immediate();
        assert_eq!(timing.key_event_delay, 0.0);
        assert_eq!(TimingConfig::duration(timing.tap_delay), Duration::ZERO);
    }
}
