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

//! Bridge from the [`log`] crate facade.

use crate::record::CallSite;
use crate::registry;

struct LogCrateLogger(());

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        match registry::global() {
            Some(registry) => registry.enabled(metadata.level().into(), package(metadata)),
            None => true,
        }
    }

    fn log(&self, record: &log::Record) {
        registry::dispatch(record.level().into(), callsite(record), *record.args());
    }

    fn flush(&self) {
        if let Some(registry) = registry::global() {
            registry.flush();
        }
    }
}

/// The package a record is routed by: its target, which defaults to the module path.
fn package<'a>(metadata: &log::Metadata<'a>) -> &'a str {
    metadata.target()
}

fn callsite<'a>(record: &log::Record<'a>) -> CallSite<'a> {
    CallSite::new(
        package(record.metadata()),
        record.file().unwrap_or("<unknown>"),
        record.line().unwrap_or(0),
    )
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to set up a `LogCrateLogger` and all logs from the
/// log crate will be forwarded to the global registry. Records are routed by their target
/// (the module path unless the call overrides it), with the record's file and line as the call
/// site.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// logrota::bridge::setup_log_crate().unwrap();
/// log::info!("forwarded to logrota");
/// ```
pub fn setup_log_crate() -> Result<(), log::SetLoggerError> {
    static LOGGER: LogCrateLogger = LogCrateLogger(());
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
