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

//! Call sites and log records.

use std::borrow::Cow;

use jiff::Timestamp;

use crate::Level;

/// The source location a log call was made from.
///
/// Call sites are captured at the invocation point by the logging macros (see
/// [`callsite!`](crate::callsite)) so every entry point, formatted or not, reports the same
/// location. Tests can build one by hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSite<'a> {
    module_path: &'a str,
    file: &'a str,
    line: u32,
}

impl<'a> CallSite<'a> {
    /// Create a call site from its parts.
    pub const fn new(module_path: &'a str, file: &'a str, line: u32) -> Self {
        Self {
            module_path,
            file,
            line,
        }
    }

    /// The module (package) path of the caller, e.g. `my_app::net`.
    pub fn module_path(&self) -> &'a str {
        self.module_path
    }

    /// The source file of the caller.
    pub fn file(&self) -> &'a str {
        self.file
    }

    /// The line of the caller.
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// Capture the [`CallSite`] of the macro invocation.
#[macro_export]
macro_rules! callsite {
    () => {
        $crate::record::CallSite::new(::std::module_path!(), ::std::file!(), ::std::line!())
    };
}

/// A log record handed to layouts. Built per call and never stored.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    level: Level,
    time: Timestamp,
    prefix: &'a str,
    callsite: CallSite<'a>,
    message: Cow<'a, str>,
}

impl<'a> Record<'a> {
    /// Create a record observed now.
    pub fn new(
        level: Level,
        prefix: &'a str,
        callsite: CallSite<'a>,
        message: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            level,
            time: Timestamp::now(),
            prefix,
            callsite,
            message: message.into(),
        }
    }

    /// Override the observed time.
    pub fn with_time(mut self, time: Timestamp) -> Self {
        self.time = time;
        self
    }

    /// The severity of the record.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The process prefix, usually the executable name.
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }

    /// Where the log call was made.
    pub fn callsite(&self) -> &CallSite<'a> {
        &self.callsite
    }

    /// The caller's module path.
    pub fn module_path(&self) -> &'a str {
        self.callsite.module_path
    }

    /// The caller's source file.
    pub fn file(&self) -> &'a str {
        self.callsite.file
    }

    /// The caller's line.
    pub fn line(&self) -> u32 {
        self.callsite.line
    }

    /// The rendered message body.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> CallSite<'static> {
        callsite!()
    }

    #[test]
    fn test_callsite_macro_reports_invocation() {
        let site = site();
        assert_eq!(site.module_path(), "logrota::record::tests");
        assert_eq!(site.file(), file!());
        assert!(site.line() > 0);
    }

    #[test]
    fn test_record_accessors() {
        let site = CallSite::new("app::db", "src/db.rs", 42);
        let record = Record::new(Level::Warn, "app", site, "slow query");
        assert_eq!(record.level(), Level::Warn);
        assert_eq!(record.module_path(), "app::db");
        assert_eq!(record.file(), "src/db.rs");
        assert_eq!(record.line(), 42);
        assert_eq!(record.message(), "slow query");
        assert_eq!(record.prefix(), "app");
    }
}
