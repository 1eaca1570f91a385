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

use std::fmt::Write;

use jiff::tz::TimeZone;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;
use crate::time::DEFAULT_DATE_PATTERN;
use crate::time::format_timestamp;
use crate::variable::FIELD;
use crate::variable::split_arg;

/// The template used when none is configured.
pub const DEFAULT_TEMPLATE: &str =
    "%{Prefix} - %{Time:yyyy-mm-dd HH:MM:SS.ms} - %{Level:5} - %{File}:%{Line:3} - %{Message}";

/// A layout that renders records through a `%{Field[:arg]}` template.
///
/// Supported fields, matched case-insensitively:
///
/// * `Prefix`: the process prefix.
/// * `Time[:pattern]`: the record time, see [`crate::time`] for patterns.
/// * `Level[:width]`, `File[:width]`, `Line[:width]`: left aligned to `width`.
/// * `Package`: the caller's module path.
/// * `Message`: the message body.
///
/// Unknown fields render as nothing and are listed by [`TextLayout::unsupported_fields`].
///
/// Output with the default template:
///
/// ```text
/// my_app - 2024-08-11 22:44:57.172 - ERROR - src/main.rs:51  - Hello error!
/// my_app - 2024-08-11 22:44:57.172 - WARN  - src/main.rs:52  - Hello warn!
/// ```
///
/// # Examples
///
/// ```
/// use logrota::layout::TextLayout;
///
/// let layout = TextLayout::new("%{Level} %{Message}");
/// assert!(layout.unsupported_fields().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    template: String,
    segments: Vec<Segment>,
    unsupported: Vec<String>,
    timezone: TimeZone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Prefix,
    Time(Option<String>),
    Level(Option<usize>),
    File(Option<usize>),
    Line(Option<usize>),
    Package,
    Message,
}

impl Default for TextLayout {
    fn default() -> Self {
        TextLayout::new(DEFAULT_TEMPLATE)
    }
}

impl TextLayout {
    /// Compile a layout from a template.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut segments = vec![];
        let mut unsupported = vec![];
        let mut last = 0;

        for (range, inner) in FIELD.tokens(&template) {
            if range.start > last {
                segments.push(Segment::Literal(template[last..range.start].to_string()));
            }
            last = range.end;

            let (name, arg) = split_arg(inner);
            let width = || arg.and_then(|w| w.trim().parse::<usize>().ok());
            let segment = match name.to_ascii_uppercase().as_str() {
                "PREFIX" => Segment::Prefix,
                "TIME" => Segment::Time(arg.filter(|p| !p.is_empty()).map(str::to_string)),
                "LEVEL" => Segment::Level(width()),
                "FILE" => Segment::File(width()),
                "LINE" => Segment::Line(width()),
                "PACKAGE" => Segment::Package,
                "MESSAGE" => Segment::Message,
                _ => {
                    unsupported.push(name.to_string());
                    continue;
                }
            };
            segments.push(segment);
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Self {
            template,
            segments,
            unsupported,
            timezone: TimeZone::system(),
        }
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// The template this layout was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Field names in the template that this layout does not know.
    pub fn unsupported_fields(&self) -> &[String] {
        &self.unsupported
    }
}

fn write_padded(out: &mut String, value: impl std::fmt::Display, width: Option<usize>) {
    // SAFETY: write to a string always succeeds
    write!(out, "{value:<width$}", width = width.unwrap_or(0)).unwrap();
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut out = String::with_capacity(self.template.len() + record.message().len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Prefix => out.push_str(record.prefix()),
                Segment::Time(pattern) => {
                    let pattern = pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN);
                    out.push_str(&format_timestamp(record.time(), &self.timezone, pattern));
                }
                Segment::Level(width) => write_padded(&mut out, record.level().name(), *width),
                Segment::File(width) => write_padded(&mut out, record.file(), *width),
                Segment::Line(width) => write_padded(&mut out, record.line(), *width),
                Segment::Package => out.push_str(record.module_path()),
                Segment::Message => out.push_str(record.message()),
            }
        }

        Ok(out.into_bytes())
    }
}
