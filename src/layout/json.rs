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

use jiff::tz::TimeZone;
use serde::Serialize;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;
use crate::time::DEFAULT_DATE_PATTERN;
use crate::time::format_timestamp;

/// A JSON layout for formatting log records.
///
/// Output format:
///
/// ```json
/// {"File":"src/main.rs","Level":"ERROR","Line":51,"Message":"Hello error!","PackageName":"my_app","Prefix":"my_app","Time":"2024/08/11 22:44:57.172051"}
/// ```
///
/// # Examples
///
/// ```
/// use logrota::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default().indent(true);
/// ```
#[derive(Debug, Clone)]
pub struct JsonLayout {
    indent: bool,
    timezone: TimeZone,
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self {
            indent: false,
            timezone: TimeZone::system(),
        }
    }
}

impl JsonLayout {
    /// Emit pretty-printed instead of compact JSON.
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the timezone for timestamps.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }
}

// keys in lexical order
#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    #[serde(rename = "File")]
    file: &'a str,
    #[serde(rename = "Level")]
    level: &'static str,
    #[serde(rename = "Line")]
    line: u32,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "PackageName")]
    package_name: &'a str,
    #[serde(rename = "Prefix")]
    prefix: &'a str,
    #[serde(rename = "Time")]
    time: String,
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let line = RecordLine {
            file: record.file(),
            level: record.level().name(),
            line: record.line(),
            message: record.message(),
            package_name: record.module_path(),
            prefix: record.prefix(),
            time: format_timestamp(record.time(), &self.timezone, DEFAULT_DATE_PATTERN),
        };

        let encoded = if self.indent {
            serde_json::to_vec_pretty(&line)
        } else {
            serde_json::to_vec(&line)
        };
        encoded.map_err(|err| Error::new("failed to encode record as json").with_source(err))
    }

    fn is_text(&self) -> bool {
        false
    }
}
