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

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use colored::Color;
use colored::Colorize;

use crate::Error;
use crate::Level;

/// Where a console writer sends its lines.
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    /// The process standard output.
    #[default]
    Stdout,
    /// The process standard error.
    Stderr,
    /// An in-memory buffer, never colorized.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl ConsoleTarget {
    /// Parse a configured console target: `STDOUT` or `STDERR`, in any case.
    pub fn from_name(name: &str) -> Option<ConsoleTarget> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("stdout") {
            Some(ConsoleTarget::Stdout)
        } else if name.eq_ignore_ascii_case("stderr") {
            Some(ConsoleTarget::Stderr)
        } else {
            None
        }
    }

    /// A fresh in-memory target and the buffer it fills.
    pub fn buffer() -> (ConsoleTarget, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(vec![]));
        (ConsoleTarget::Buffer(buf.clone()), buf)
    }
}

/// A console sink that colors text lines by severity.
#[derive(Debug)]
pub struct Console {
    target: ConsoleTarget,
    no_color: bool,
}

impl Console {
    /// Creates a console sink for `target`.
    pub fn new(target: ConsoleTarget) -> Self {
        Self {
            target,
            no_color: false,
        }
    }

    /// Disable coloring for terminal targets.
    pub fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// The target this sink writes to.
    pub fn target(&self) -> &ConsoleTarget {
        &self.target
    }

    pub(crate) fn write_line(&self, level: Level, line: &[u8], text: bool) -> Result<(), Error> {
        let mut bytes = match (&self.target, level_color(level)) {
            (ConsoleTarget::Buffer(_), _) | (_, None) => line.to_vec(),
            _ if self.no_color || !text => line.to_vec(),
            (_, Some(color)) => String::from_utf8_lossy(line)
                .color(color)
                .to_string()
                .into_bytes(),
        };
        bytes.push(b'\n');

        match &self.target {
            ConsoleTarget::Stdout => io::stdout().lock().write_all(&bytes),
            ConsoleTarget::Stderr => io::stderr().lock().write_all(&bytes),
            ConsoleTarget::Buffer(buf) => {
                let mut buf = buf.lock().unwrap_or_else(|e| e.into_inner());
                buf.extend_from_slice(&bytes);
                Ok(())
            }
        }
        .map_err(Error::from_io_error)
    }

    pub(crate) fn flush(&self) -> Result<(), Error> {
        match &self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
            ConsoleTarget::Buffer(_) => Ok(()),
        }
        .map_err(Error::from_io_error)
    }
}

fn level_color(level: Level) -> Option<Color> {
    match level {
        Level::Trace => Some(Color::Blue),
        Level::Debug => Some(Color::Green),
        Level::Info => Some(Color::Cyan),
        Level::Warn => Some(Color::Magenta),
        Level::Error => Some(Color::Yellow),
        Level::Fatal => Some(Color::Red),
        Level::All | Level::Off => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        assert!(matches!(
            ConsoleTarget::from_name("stdout"),
            Some(ConsoleTarget::Stdout)
        ));
        assert!(matches!(
            ConsoleTarget::from_name(" STDERR "),
            Some(ConsoleTarget::Stderr)
        ));
        assert!(ConsoleTarget::from_name("FILE").is_none());
    }

    #[test]
    fn test_buffer_is_never_colored() {
        let (target, buf) = ConsoleTarget::buffer();
        let console = Console::new(target);
        console.write_line(Level::Error, b"boom", true).unwrap();
        console.write_line(Level::Info, b"{\"a\":1}", false).unwrap();
        assert_eq!(buf.lock().unwrap().as_slice(), b"boom\n{\"a\":1}\n");
    }
}
