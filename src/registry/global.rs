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

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use std::sync::OnceLock;

use crate::Error;
use crate::Level;
use crate::append;
use crate::config::Config;
use crate::record::CallSite;
use crate::record::Record;
use crate::registry::Registry;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

static DEFAULT_PREFIX: LazyLock<String> = LazyLock::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
});

/// The `%{Prefix}` used when none is configured: the running executable's file stem.
pub fn default_prefix() -> &'static str {
    &DEFAULT_PREFIX
}

/// Install `registry` as the process-wide registry the logging macros dispatch to.
///
/// # Errors
///
/// Return an error if a global registry is already installed; `registry` is then shut down.
pub fn set_global(registry: Registry) -> Result<(), Error> {
    GLOBAL
        .set(registry)
        .map_err(|_| Error::new("global registry already set"))
}

/// Build a registry from `config` and install it globally.
///
/// # Errors
///
/// Return an error if the registry cannot be built or a global registry is already installed.
pub fn init(config: Config) -> Result<(), Error> {
    set_global(Registry::from_config(config)?)
}

/// The process-wide registry, if one was installed.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}

/// Shut down the process-wide registry: stop its rotation threads and flush its writers.
pub fn shutdown() {
    if let Some(registry) = global() {
        registry.shutdown();
    }
}

/// Deliver a formatted message through the global registry, or through the default console
/// writer when none is installed.
pub fn dispatch(level: Level, callsite: CallSite<'_>, args: fmt::Arguments<'_>) {
    if let Some(registry) = global() {
        registry.dispatch(level, callsite, args);
        return;
    }

    let message: Cow<'_, str> = match args.as_str() {
        Some(message) => message.into(),
        None => args.to_string().into(),
    };
    let record = Record::new(level, default_prefix(), callsite, message);
    let _ = append::default_console().emit(&record);
}

/// Deliver the concatenation of `values` like [`dispatch`].
pub fn log_values(level: Level, callsite: CallSite<'_>, values: &[&dyn fmt::Display]) {
    dispatch(level, callsite, format_args!("{}", Concat(values)));
}

/// Deliver a fatal message, then terminate according to the global registry's fatal hook; with
/// no registry installed the process exits with status 1.
pub fn fatal(callsite: CallSite<'_>, args: fmt::Arguments<'_>) {
    match global() {
        Some(registry) => registry.fatal(callsite, args),
        None => {
            dispatch(Level::Fatal, callsite, args);
            let _ = append::default_console().flush();
            std::process::exit(1);
        }
    }
}

/// Deliver the concatenation of `values` like [`fatal`].
pub fn fatal_values(callsite: CallSite<'_>, values: &[&dyn fmt::Display]) {
    fatal(callsite, format_args!("{}", Concat(values)));
}

struct Concat<'a>(&'a [&'a dyn fmt::Display]);

impl fmt::Display for Concat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.0 {
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
