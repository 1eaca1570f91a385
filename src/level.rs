// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Severity levels.

use std::fmt;
use std::str::FromStr;

/// The severity of a log record.
///
/// Levels are totally ordered: `All < Trace < Debug < Info < Warn < Error < Fatal < Off`.
/// `All` and `Off` are only meaningful as writer thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Lowest threshold; accepts everything.
    All = 0,
    /// The "trace" level.
    Trace = 1,
    /// The "debug" level.
    Debug = 2,
    /// The "info" level.
    Info = 3,
    /// The "warn" level.
    Warn = 4,
    /// The "error" level.
    Error = 5,
    /// The "fatal" level.
    Fatal = 6,
    /// Highest threshold; accepts nothing.
    Off = 7,
}

const LEVEL_NAMES: [&str; 8] = ["ALL", "TRACE", "DEBUG", "INFO", "WARN", "ERROR", "FATAL", "OFF"];

impl Level {
    /// All levels in ascending order.
    pub const ALL_LEVELS: [Level; 8] = [
        Level::All,
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Off,
    ];

    /// Look up a level by its symbolic name, ignoring case.
    ///
    /// Unknown names map to [`Level::Off`], so a misspelled threshold silences a writer instead
    /// of failing.
    pub fn from_name(name: &str) -> Level {
        LEVEL_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name.trim()))
            .map_or(Level::Off, |i| Level::ALL_LEVELS[i])
    }

    /// Look up a level by its ordinal. Out of range ordinals map to [`Level::Off`].
    pub fn from_ordinal(ordinal: usize) -> Level {
        Level::ALL_LEVELS
            .get(ordinal)
            .copied()
            .unwrap_or(Level::Off)
    }

    /// The upper-case symbolic name of this level.
    pub fn name(self) -> &'static str {
        LEVEL_NAMES[self as usize]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Level::from_name(s))
    }
}

#[cfg(feature = "bridge-log")]
impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}
