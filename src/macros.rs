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

//! Logging macros.
//!
//! Each severity has two entry points that report the same call site: `info!(a, b, ..)`
//! concatenates the [`Display`](std::fmt::Display) of its values, `infof!(fmt, args..)`
//! takes `format!`-style arguments. Records go to the global registry, or to the default
//! console writer before one is installed.
//!
//! `print!` and `printf!` log without a severity ([`Level::All`](crate::Level::All)); only
//! writers whose allow level is `ALL` take those records.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_values {
    ($level:expr, $($value:expr),+) => {
        $crate::registry::log_values(
            $level,
            $crate::callsite!(),
            &[$(&$value as &dyn ::std::fmt::Display),+],
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_format {
    ($level:expr, $($arg:tt)+) => {
        $crate::registry::dispatch($level, $crate::callsite!(), ::std::format_args!($($arg)+))
    };
}

/// Log the concatenated values at [`Level::All`](crate::Level::All).
///
/// # Examples
///
/// ```
/// logrota::print!("cache warmed in ", 42, "ms");
/// ```
#[macro_export]
macro_rules! print {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::All, $($value),+) };
}

/// Log the concatenated values at [`Level::Trace`](crate::Level::Trace).
#[macro_export]
macro_rules! trace {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::Trace, $($value),+) };
}

/// Log the concatenated values at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! debug {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::Debug, $($value),+) };
}

/// Log the concatenated values at [`Level::Info`](crate::Level::Info).
///
/// # Examples
///
/// ```
/// let user = "ada";
/// logrota::info!("login user=", user, " attempts=", 3);
/// ```
#[macro_export]
macro_rules! info {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::Info, $($value),+) };
}

/// Log the concatenated values at [`Level::Warn`](crate::Level::Warn).
#[macro_export]
macro_rules! warn {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::Warn, $($value),+) };
}

/// Log the concatenated values at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! error {
    ($($value:expr),+ $(,)?) => { $crate::__log_values!($crate::Level::Error, $($value),+) };
}

/// Log the concatenated values at [`Level::Fatal`](crate::Level::Fatal), then run the fatal
/// hook of the global registry (by default, exit with status 1).
#[macro_export]
macro_rules! fatal {
    ($($value:expr),+ $(,)?) => {
        $crate::registry::fatal_values(
            $crate::callsite!(),
            &[$(&$value as &dyn ::std::fmt::Display),+],
        )
    };
}

/// Log a formatted message at [`Level::All`](crate::Level::All).
#[macro_export]
macro_rules! printf {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::All, $($arg)+) };
}

/// Log a formatted message at [`Level::Trace`](crate::Level::Trace).
#[macro_export]
macro_rules! tracef {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::Trace, $($arg)+) };
}

/// Log a formatted message at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::Debug, $($arg)+) };
}

/// Log a formatted message at [`Level::Info`](crate::Level::Info).
///
/// # Examples
///
/// ```
/// let took = 12;
/// logrota::infof!("request served in {took}ms");
/// ```
#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::Info, $($arg)+) };
}

/// Log a formatted message at [`Level::Warn`](crate::Level::Warn).
#[macro_export]
macro_rules! warnf {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::Warn, $($arg)+) };
}

/// Log a formatted message at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => { $crate::__log_format!($crate::Level::Error, $($arg)+) };
}

/// Log a formatted message at [`Level::Fatal`](crate::Level::Fatal), then run the fatal hook
/// of the global registry (by default, exit with status 1).
#[macro_export]
macro_rules! fatalf {
    ($($arg:tt)+) => {
        $crate::registry::fatal($crate::callsite!(), ::std::format_args!($($arg)+))
    };
}
