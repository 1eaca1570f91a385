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

//! Writers: a filter policy, a layout and a sink.

use std::path::PathBuf;
use std::sync::LazyLock;

use crate::Error;
use crate::Level;
use crate::filter::FilterPolicy;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::Record;

mod console;
pub mod file;

pub use self::console::Console;
pub use self::console::ConsoleTarget;
pub use self::file::FileWriter;

/// Name of the process-wide console writer that reports the library's own diagnostics.
pub const DEFAULT_CONSOLE_NAME: &str = "DefaultConsoleNoFilter";

static DEFAULT_CONSOLE: LazyLock<Writer> = LazyLock::new(|| {
    Writer::new(
        DEFAULT_CONSOLE_NAME,
        FilterPolicy::new(Level::All),
        TextLayout::default(),
        Console::new(ConsoleTarget::Stdout),
    )
});

/// The process-wide default console writer: accepts every level, bypasses package routing
/// and writes default-formatted text to stdout.
pub fn default_console() -> &'static Writer {
    &DEFAULT_CONSOLE
}

/// The sink behind a writer.
#[derive(Debug)]
pub enum WriterKind {
    /// Standard output, standard error or a capture buffer.
    Console(Console),
    /// A rotating file.
    File(FileWriter),
}

impl From<Console> for WriterKind {
    fn from(console: Console) -> Self {
        WriterKind::Console(console)
    }
}

impl From<FileWriter> for WriterKind {
    fn from(file: FileWriter) -> Self {
        WriterKind::File(file)
    }
}

/// A named output destination.
#[derive(Debug)]
pub struct Writer {
    name: String,
    policy: FilterPolicy,
    layout: Box<dyn Layout>,
    kind: WriterKind,
}

impl Writer {
    /// Creates a writer.
    pub fn new(
        name: impl Into<String>,
        policy: FilterPolicy,
        layout: impl Into<Box<dyn Layout>>,
        kind: impl Into<WriterKind>,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            layout: layout.into(),
            kind: kind.into(),
        }
    }

    /// The name rules refer to this writer by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filtering policy.
    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// The sink.
    pub fn kind(&self) -> &WriterKind {
        &self.kind
    }

    /// The file sink, if this is a file writer.
    pub fn as_file(&self) -> Option<&FileWriter> {
        match &self.kind {
            WriterKind::File(file) => Some(file),
            WriterKind::Console(_) => None,
        }
    }

    /// Whether the severity window admits `level`.
    pub fn accept(&self, level: Level) -> bool {
        self.policy.accept(level)
    }

    /// Whether records from `module_path` are routed here.
    pub fn package_filter(&self, module_path: &str) -> bool {
        self.policy.package_filter(module_path, &self.name)
    }

    /// Format and write `record` if the policy admits it; otherwise do nothing.
    pub fn emit(&self, record: &Record) -> Result<(), Error> {
        if !self.accept(record.level()) || !self.package_filter(record.module_path()) {
            return Ok(());
        }

        let mut line = self
            .layout
            .format(record)
            .map_err(|err| err.with_context("writer", &self.name))?;
        match &self.kind {
            WriterKind::Console(console) => {
                console.write_line(record.level(), &line, self.layout.is_text())
            }
            WriterKind::File(file) => {
                line.push(b'\n');
                file.write(&line)
            }
        }
    }

    /// Rotate a file writer that reached its size threshold. No-op for consoles.
    pub fn maybe_rotate(&self) {
        if let WriterKind::File(file) = &self.kind {
            file.check_threshold();
        }
    }

    /// Rotate a file writer now. No-op for consoles.
    pub fn rotate(&self) -> Option<PathBuf> {
        match &self.kind {
            WriterKind::File(file) => file.rotate(),
            WriterKind::Console(_) => None,
        }
    }

    /// Flush buffered output; file writers also sync to disk.
    pub fn flush(&self) -> Result<(), Error> {
        match &self.kind {
            WriterKind::Console(console) => console.flush(),
            WriterKind::File(file) => file.flush(),
        }
    }
}
