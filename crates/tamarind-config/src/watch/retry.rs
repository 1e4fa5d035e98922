//! Webhook retry policy

use std::str::FromStr;
use std::time::Duration;

use tamarind_common::TamarindError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    Fixed(Duration),
    /// `base * 2^(attempt-1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// Attempts made for one event before it counts as a single failure
///
/// Always makes at least one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
        }
    }

    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay before the attempt following failed attempt number `attempt`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let shift = attempt.saturating_sub(1).min(20);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(200),
                max: Duration::from_secs(5),
            },
        }
    }
}

/// Backoff kind by name, as used in configuration files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffKind {
    None,
    Fixed,
    Exponential,
}

impl BackoffKind {
    pub fn with_delays(self, base: Duration, max: Duration) -> Backoff {
        match self {
            BackoffKind::None => Backoff::None,
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential { base, max },
        }
    }
}

impl FromStr for BackoffKind {
    type Err = TamarindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(BackoffKind::None),
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(TamarindError::Configuration(format!(
                "retry backoff '{}' must be one of none, fixed, exponential",
                other
            ))),
        }
    }
}
