//! Time-of-day gate — is the channel currently accepting submissions?

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::error::ConfigError;

/// The daily window during which submissions are accepted.
///
/// Hours are fractional (`9.5` = 09:30) in the configured UTC offset.
/// `start == end` means the gate is always open. Overnight windows
/// that wrap midnight (e.g. 22–06) are not supported; the window must
/// lie within one calendar day, and `start > end` is rejected at
/// startup.
#[derive(Debug, Clone, Copy)]
pub struct OperatingHours {
    start: f32,
    end: f32,
    offset: FixedOffset,
}

impl OperatingHours {
    /// Build a window, validating the bounds at startup.
    pub fn new(start: f32, end: f32, offset: FixedOffset) -> Result<Self, ConfigError> {
        if !(0.0..=24.0).contains(&start) || !(0.0..=24.0).contains(&end) {
            return Err(ConfigError::InvalidValue {
                key: "operating hours".into(),
                message: format!("hours must be within 0..=24, got {start}-{end}"),
            });
        }
        if start > end {
            return Err(ConfigError::InvalidValue {
                key: "operating hours".into(),
                message: format!("window start {start} is after end {end}"),
            });
        }
        Ok(Self { start, end, offset })
    }

    /// A window that never closes.
    pub fn always_open(offset: FixedOffset) -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            offset,
        }
    }

    /// The UTC offset this window (and the ledger's calendar day) uses.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Whether `now` falls inside the window. Pure and total.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if (self.end - self.start).abs() < f32::EPSILON {
            return true;
        }
        let local = now.with_timezone(&self.offset);
        let hour = local.hour() as f32 + local.minute() as f32 / 60.0;
        self.start <= hour && hour < self.end
    }
}
