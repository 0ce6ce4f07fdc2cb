/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! The eight canonical severity levels and their rank ordering.

use std::fmt;
use std::str::FromStr;

/// A log severity. Ordered by `rank()`, lowest rank is least severe.
///
/// Names are case-insensitive on parse; `Display` always renders the
/// lowercase canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Level {
    /// All eight levels in ascending rank order.
    pub const ALL: [Level; 8] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    /// Integer rank used for all level comparisons. `debug` = 0 .. `emergency` = 7.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Lowercase canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
            Level::Alert => "alert",
            Level::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unrecognized level name.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized log level: {0:?}")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "notice" => Ok(Level::Notice),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            "alert" => Ok(Level::Alert),
            "emergency" => Ok(Level::Emergency),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

/// The minimum rank admitted by a set of level names, compared by rank rather
/// than by identity (used by the Sampling decorator's `smart` strategy, §4.5).
pub fn min_rank(levels: &[Level]) -> Option<u8> {
    levels.iter().map(|l| l.rank()).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_is_monotonic_with_declaration_order() {
        for pair in Level::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("Error".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("emergency".parse::<Level>().unwrap(), Level::Emergency);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn display_is_lowercase_canonical() {
        assert_eq!(Level::Critical.to_string(), "critical");
    }

    #[test]
    fn min_rank_picks_lowest() {
        assert_eq!(min_rank(&[Level::Error, Level::Critical]), Some(Level::Error.rank()));
    }
}
