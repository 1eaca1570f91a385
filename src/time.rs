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

//! Rendering timestamps with date patterns.
//!
//! A pattern is either a `strftime` string (anything containing `%`) or a compact pattern
//! made of the tokens below; every other character is copied verbatim.
//!
//! | token  | meaning                  |
//! |--------|--------------------------|
//! | `yyyy` | four digit year          |
//! | `yy`   | two digit year           |
//! | `mm`   | month, `01`-`12`         |
//! | `dd`   | day of month             |
//! | `HH`   | hour, `00`-`23`          |
//! | `MM`   | minute                   |
//! | `SS`   | second                   |
//! | `ms`   | milliseconds, 3 digits   |
//! | `us`   | microseconds, 6 digits   |
//! | `ns`   | nanoseconds, 9 digits    |

use std::fmt::Write;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;

/// Pattern used by `%{date}` when no format is given.
pub const DEFAULT_DATE_PATTERN: &str = "yyyy/mm/dd HH:MM:SS.us";

const TOKENS: [&str; 10] = ["yyyy", "yy", "mm", "dd", "HH", "MM", "SS", "ms", "us", "ns"];

/// Render `ts` in `tz` using `pattern`.
pub fn format_timestamp(ts: Timestamp, tz: &TimeZone, pattern: &str) -> String {
    let zoned = ts.to_zoned(tz.clone());
    format_zoned(&zoned, pattern)
}

/// Render `zoned` using `pattern`.
pub fn format_zoned(zoned: &Zoned, pattern: &str) -> String {
    if pattern.contains('%') {
        return jiff::fmt::strtime::format(pattern, zoned).unwrap_or_else(|_| pattern.to_string());
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while !rest.is_empty() {
        let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
            continue;
        };

        let nanos = zoned.subsec_nanosecond();
        // SAFETY: write to a string always succeeds
        match *token {
            "yyyy" => write!(out, "{:04}", zoned.year()).unwrap(),
            "yy" => write!(out, "{:02}", zoned.year().rem_euclid(100)).unwrap(),
            "mm" => write!(out, "{:02}", zoned.month()).unwrap(),
            "dd" => write!(out, "{:02}", zoned.day()).unwrap(),
            "HH" => write!(out, "{:02}", zoned.hour()).unwrap(),
            "MM" => write!(out, "{:02}", zoned.minute()).unwrap(),
            "SS" => write!(out, "{:02}", zoned.second()).unwrap(),
            "ms" => write!(out, "{:03}", nanos / 1_000_000).unwrap(),
            "us" => write!(out, "{:06}", nanos / 1_000).unwrap(),
            _ => write!(out, "{nanos:09}").unwrap(),
        }
        rest = &rest[token.len()..];
    }

    out
}
