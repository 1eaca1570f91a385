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

//! Sinks for errors that happen while logging.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use crate::Error;
use crate::Level;
use crate::append;
use crate::record::Record;

/// A trap receives internal errors (failed rotations, unwritable files, unsupported tokens)
/// that cannot be returned to the caller of a log function.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handle an error, reported at the given severity.
    fn trap(&self, level: Level, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Writes errors through the process-wide default console writer.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, level: Level, err: &Error) {
        let message = err.to_string();
        let prefix = crate::registry::default_prefix();
        let record = Record::new(level, prefix, crate::callsite!(), message.as_str());
        // nowhere left to report a failure of the diagnostic sink itself
        let _ = append::default_console().emit(&record);
    }
}

/// Keeps every trapped error in memory; useful for asserting on diagnostics in tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingTrap {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CollectingTrap {
    /// Create an empty trap.
    pub fn new() -> Self {
        Self::default()
    }

    /// The trapped errors so far, rendered with their context and sources.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether any trapped error's rendering contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, msg)| msg.contains(needle))
    }
}

impl Trap for CollectingTrap {
    fn trap(&self, level: Level, err: &Error) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push((level, err.to_string()));
    }
}
