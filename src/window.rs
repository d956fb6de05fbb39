//! Time windows and the window filter
//!
//! A [`TimeWindow`] is right-closed: `after` is excluded and `before` is
//! included, matching the "end of period" timestamps carried by shard names.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::manifest::ManifestEntry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Invalid window bound '{0}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")]
    InvalidBound(String),

    #[error("Window is empty: after ({after}) must be earlier than before ({before})")]
    Empty { after: Bound, before: Bound },

    #[error("Date range is reversed: {start} is after {end}")]
    ReversedRange { start: String, end: String },
}

/// One side of a window as given by the caller.
///
/// Remembers whether it was given as a plain date so artifact names keep the
/// caller's spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bound {
    at: NaiveDateTime,
    date_only: bool,
}

impl Bound {
    pub fn at(&self) -> NaiveDateTime {
        self.at
    }
}

impl From<NaiveDateTime> for Bound {
    fn from(at: NaiveDateTime) -> Self {
        Self { at, date_only: false }
    }
}

impl From<NaiveDate> for Bound {
    fn from(date: NaiveDate) -> Self {
        Self {
            at: date.and_time(NaiveTime::MIN),
            date_only: true,
        }
    }
}

impl FromStr for Bound {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date.into());
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(at.into());
            }
        }
        Err(WindowError::InvalidBound(s.to_string()))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_only {
            write!(f, "{}", self.at.format("%Y-%m-%d"))
        } else {
            write!(f, "{}", self.at.format("%Y-%m-%dT%H%M%S"))
        }
    }
}

/// Right-closed interval `(after, before]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    after: Bound,
    before: Bound,
}

impl TimeWindow {
    pub fn new(after: impl Into<Bound>, before: impl Into<Bound>) -> Result<Self, WindowError> {
        let after = after.into();
        let before = before.into();
        if after.at >= before.at {
            return Err(WindowError::Empty { after, before });
        }
        Ok(Self { after, before })
    }

    pub fn parse(after: &str, before: &str) -> Result<Self, WindowError> {
        Self::new(after.parse::<Bound>()?, before.parse::<Bound>()?)
    }

    pub fn after(&self) -> Bound {
        self.after
    }

    pub fn before(&self) -> Bound {
        self.before
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.after.at < ts && ts <= self.before.at
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.after, self.before)
    }
}

/// Select the entries whose timestamp falls inside the window, keeping manifest order.
pub fn filter(manifest: &[ManifestEntry], window: &TimeWindow) -> Vec<ManifestEntry> {
    manifest
        .iter()
        .filter(|entry| window.contains(entry.timestamp))
        .cloned()
        .collect()
}
