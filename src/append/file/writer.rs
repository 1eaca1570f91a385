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

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::mem;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use jiff::tz::TimeZone;

use crate::Error;
use crate::Level;
use crate::append::file::Clock;
use crate::append::file::Compress;
use crate::append::file::archive::store;
use crate::time::DEFAULT_DATE_PATTERN;
use crate::time::format_timestamp;
use crate::trap::DefaultTrap;
use crate::trap::Trap;
use crate::variable::Properties;
use crate::variable::SYSTEM;
use crate::variable::split_arg;
use crate::variable::strip_line_breaks;

/// How many times an archive name is resolved before a rotation gives up on finding a free one.
pub const MAX_NAME_ATTEMPTS: usize = 64;

const MIB: u64 = 1024 * 1024;

/// A log file that rotates into numbered, optionally compressed archives.
///
/// Writes and rotations share one lock around the active handle, so every line lands either
/// in the file being archived or in its replacement. Copying or compressing the archive
/// happens after that lock is released.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    archive_pattern: String,
    compress: Compress,
    size_threshold: u64,
    keep_count: usize,
    naming: Naming,
    state: Mutex<RotationState>,
    rotating: Mutex<()>,
    trap: Arc<dyn Trap>,
}

#[derive(Debug)]
pub(crate) struct RotationState {
    file: File,
    current_size: u64,
    store_index: usize,
    store_first: usize,
    archives: BTreeMap<usize, PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Forced,
    Size,
}

impl FileWriter {
    /// Creates a new [`FileWriterBuilder`] for the live file name template `file_name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use logrota::append::file::FileWriter;
    ///
    /// let builder = FileWriter::builder("logs/app.log").archive_pattern("logs/app-%{i}.log");
    /// ```
    #[must_use]
    pub fn builder(file_name: impl Into<String>) -> FileWriterBuilder {
        FileWriterBuilder::new(file_name)
    }

    /// The resolved path of the live file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size, in bytes, at which the file is rotated.
    pub fn size_threshold(&self) -> u64 {
        self.size_threshold
    }

    /// Bytes in the live file, as tracked by this writer.
    pub fn current_size(&self) -> u64 {
        self.lock_state().current_size
    }

    /// The last generation index handed out.
    pub fn store_index(&self) -> usize {
        self.lock_state().store_index
    }

    /// The oldest generation not yet reclaimed by retention.
    pub fn store_first(&self) -> usize {
        self.lock_state().store_first
    }

    /// Archives this writer produced that retention has not removed, by generation.
    pub fn archives(&self) -> BTreeMap<usize, PathBuf> {
        self.lock_state().archives.clone()
    }

    /// Expand a name template against this writer's properties, clock and rotation counter.
    ///
    /// Every `%{i}` token consumes the next generation index.
    pub fn expand_template(&self, template: &str) -> String {
        let mut state = self.lock_state();
        self.naming
            .expand(template, &mut state.store_index, self.trap.as_ref())
    }

    /// Append one formatted line, rotating afterwards if the size threshold is reached.
    pub fn write(&self, bytes: &[u8]) -> Result<(), Error> {
        let over = {
            let mut state = self.lock_state();
            state
                .file
                .write_all(bytes)
                .map_err(|err| self.io_error("failed to write log file", err))?;
            state.current_size += bytes.len() as u64;
            state.current_size >= self.size_threshold
        };

        // a rotation already in progress covers this write too
        if over && let Ok(rotating) = self.rotating.try_lock() {
            self.report(self.rotate_locked(rotating, Trigger::Size));
        }
        Ok(())
    }

    /// Stat the live file and rotate it when it reached the size threshold.
    pub fn check_threshold(&self) -> Option<PathBuf> {
        let rotating = self.rotating.lock().unwrap_or_else(|e| e.into_inner());
        self.report(self.rotate_locked(rotating, Trigger::Size))
    }

    /// Rotate the live file now, regardless of its size.
    ///
    /// Returns the archive path, or `None` if the rotation was skipped (empty file, archive
    /// name equal to the live name) or failed. Failures are reported to the trap and leave
    /// the live file in use.
    pub fn rotate(&self) -> Option<PathBuf> {
        let rotating = self.rotating.lock().unwrap_or_else(|e| e.into_inner());
        self.report(self.rotate_locked(rotating, Trigger::Forced))
    }

    /// Flush and sync the live file.
    pub fn flush(&self) -> Result<(), Error> {
        let mut state = self.lock_state();
        state
            .file
            .flush()
            .and_then(|()| state.file.sync_all())
            .map_err(|err| self.io_error("failed to sync log file", err))
    }

    fn report(&self, result: Result<Option<PathBuf>, Error>) -> Option<PathBuf> {
        match result {
            Ok(archive) => archive,
            Err(err) => {
                self.trap.trap(Level::Error, &err);
                None
            }
        }
    }

    fn rotate_locked(
        &self,
        _rotating: MutexGuard<'_, ()>,
        trigger: Trigger,
    ) -> Result<Option<PathBuf>, Error> {
        let (staging, archive, generation) = {
            let mut state = self.lock_state();

            let size = state
                .file
                .metadata()
                .map_err(|err| self.io_error("failed to stat log file", err))?
                .len();
            state.current_size = size;
            if size == 0 || (trigger == Trigger::Size && size < self.size_threshold) {
                return Ok(None);
            }

            let archive = self.resolve_archive(&mut state)?;
            if archive == self.path {
                let err = Error::new("archive name is the live file name, rotation skipped")
                    .with_context("file", self.path.display());
                self.trap.trap(Level::Trace, &err);
                return Ok(None);
            }

            if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|err| {
                    self.io_error("failed to create archive directory", err)
                        .with_context("archive", archive.display())
                })?;
            }

            let generation = state.store_index;
            let staging = self.staging_path(&archive, generation);
            fs::rename(&self.path, &staging).map_err(|err| {
                self.io_error("failed to rename log file", err)
                    .with_context("staging", staging.display())
            })?;

            let file = match open_append(&self.path) {
                Ok(file) => file,
                Err(err) => {
                    // keep writing to the old handle under its old name
                    self.restore_staged(&staging);
                    return Err(err);
                }
            };

            let mut old = mem::replace(&mut state.file, file);
            state.current_size = 0;
            if let Err(err) = old.flush().and_then(|()| old.sync_all()) {
                self.trap
                    .trap(Level::Warn, &self.io_error("failed to sync rotated file", err));
            }
            drop(old);

            (staging, archive, generation)
        };

        store(&staging, &archive, self.compress)?;

        let mut state = self.lock_state();
        state.archives.insert(generation, archive.clone());
        self.enforce_retention(&mut state);
        Ok(Some(archive))
    }

    fn resolve_archive(&self, state: &mut RotationState) -> Result<PathBuf, Error> {
        let counted = self.naming.has_index(&self.archive_pattern);
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name =
                self.naming
                    .expand(&self.archive_pattern, &mut state.store_index, self.trap.as_ref());
            let path = self.compress.archive_path(&name);
            if path == self.path {
                return Ok(path);
            }
            if !path.exists() {
                if !counted {
                    state.store_index += 1;
                }
                return Ok(path);
            }
        }

        Err(Error::new("failed to find a free archive name")
            .with_context("pattern", &self.archive_pattern)
            .with_context("attempts", MAX_NAME_ATTEMPTS))
    }

    /// Move a staged file back to the live name after a failed swap.
    pub(crate) fn restore_staged(&self, staging: &Path) {
        if let Err(err) = fs::rename(staging, &self.path) {
            let err = self
                .io_error("failed to restore log file, records go to the staged file", err)
                .with_context("staging", staging.display());
            self.trap.trap(Level::Error, &err);
        }
    }

    fn staging_path(&self, archive: &Path, generation: usize) -> PathBuf {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staged = format!("{name}.{generation}.rotating");
        match self.path.parent() {
            Some(dir) => dir.join(staged),
            None => PathBuf::from(staged),
        }
    }

    /// Delete archives in `[store_first, store_index - keep_count]`, never generation 0.
    pub(crate) fn enforce_retention(&self, state: &mut RotationState) {
        if self.keep_count == 0 {
            return;
        }
        let Some(last) = state.store_index.checked_sub(self.keep_count) else {
            return;
        };

        for generation in state.store_first..=last {
            state.store_first = generation + 1;
            if generation == 0 {
                continue;
            }
            let Some(path) = state.archives.remove(&generation) else {
                continue;
            };
            if let Err(err) = fs::remove_file(&path) {
                let err = self
                    .io_error("failed to delete archived log", err)
                    .with_context("archive", path.display());
                self.trap.trap(Level::Warn, &err);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RotationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn io_error(&self, message: &str, err: std::io::Error) -> Error {
        Error::new(message)
            .with_context("file", self.path.display())
            .with_source(err)
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RotationState) -> R) -> R {
        f(&mut self.lock_state())
    }
}

#[cfg(test)]
impl RotationState {
    pub(crate) fn set_counters(&mut self, store_index: usize, store_first: usize) {
        self.store_index = store_index;
        self.store_first = store_first;
    }

    pub(crate) fn track_archive(&mut self, generation: usize, path: PathBuf) {
        self.archives.insert(generation, path);
    }
}

fn open_append(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            Error::new("failed to open log file")
                .with_context("file", path.display())
                .with_source(err)
        })
}

/// Resolves `${property}` and `%{date[:fmt]}` / `%{i}` tokens in file names.
#[derive(Debug, Clone)]
struct Naming {
    properties: Arc<Properties>,
    clock: Clock,
    timezone: TimeZone,
}

impl Naming {
    fn has_index(&self, template: &str) -> bool {
        SYSTEM
            .tokens(template)
            .any(|(_, inner)| split_arg(inner).0.eq_ignore_ascii_case("i"))
    }

    fn expand(&self, template: &str, store_index: &mut usize, trap: &dyn Trap) -> String {
        let template = self.properties.expand(template);
        let now = self.clock.now();
        let expanded = SYSTEM.expand(&template, |inner| {
            let (name, arg) = split_arg(inner);
            if name.eq_ignore_ascii_case("i") {
                *store_index += 1;
                format!("{:02}", *store_index)
            } else if name.eq_ignore_ascii_case("date") {
                let pattern = arg.filter(|a| !a.is_empty()).unwrap_or(DEFAULT_DATE_PATTERN);
                format_timestamp(now, &self.timezone, pattern)
            } else {
                let err = Error::new("unsupported variable in file name")
                    .with_context("variable", name)
                    .with_context("template", &template);
                trap.trap(Level::Warn, &err);
                String::new()
            }
        });
        strip_line_breaks(&expanded)
    }
}

/// A builder for configuring [`FileWriter`].
#[derive(Debug)]
pub struct FileWriterBuilder {
    file_name: String,
    archive_pattern: Option<String>,
    compress: Compress,
    size_threshold_mb: i64,
    keep_count: usize,
    properties: Arc<Properties>,
    clock: Clock,
    timezone: TimeZone,
    trap: Arc<dyn Trap>,
}

impl FileWriterBuilder {
    /// Creates a new [`FileWriterBuilder`].
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            archive_pattern: None,
            compress: Compress::None,
            size_threshold_mb: 0,
            keep_count: 0,
            properties: Arc::new(Properties::new()),
            clock: Clock::DefaultClock,
            timezone: TimeZone::system(),
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Sets the archive name template. Defaults to `<file name>.%{i}`.
    #[must_use]
    pub fn archive_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.archive_pattern = if pattern.is_empty() {
            None
        } else {
            Some(pattern)
        };
        self
    }

    /// Sets how archives are stored.
    #[must_use]
    pub fn compress(mut self, compress: Compress) -> Self {
        self.compress = compress;
        self
    }

    /// Sets the size threshold in MiB. Values below 1 are raised to 1.
    #[must_use]
    pub fn size_threshold_mb(mut self, mb: i64) -> Self {
        self.size_threshold_mb = mb;
        self
    }

    /// Sets how many archives to keep; 0 keeps every archive.
    #[must_use]
    pub fn keep_count(mut self, n: usize) -> Self {
        self.keep_count = n;
        self
    }

    /// Sets the properties substituted for `${name}`.
    #[must_use]
    pub fn properties(mut self, properties: Arc<Properties>) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the clock used for `%{date}`.
    #[must_use]
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Sets the time zone used for `%{date}`. Defaults to the system time zone.
    #[must_use]
    pub fn timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the trap that receives rotation and write errors.
    ///
    /// Default to [`DefaultTrap`].
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    #[must_use]
    pub(crate) fn shared_trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Resolve the live file name, create its directory and open it for appending.
    pub fn build(self) -> Result<FileWriter, Error> {
        let Self {
            file_name,
            archive_pattern,
            compress,
            size_threshold_mb,
            keep_count,
            properties,
            clock,
            timezone,
            trap,
        } = self;

        let naming = Naming {
            properties,
            clock,
            timezone,
        };

        let mut store_index = 0;
        let path = naming.expand(&file_name, &mut store_index, trap.as_ref());
        if path.is_empty() {
            return Err(Error::new("log file name is empty").with_context("template", file_name));
        }
        let path = PathBuf::from(path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("file", path.display())
                    .with_source(err)
            })?;
        }

        let file = open_append(&path)?;
        let current_size = file
            .metadata()
            .map_err(|err| {
                Error::new("failed to stat log file")
                    .with_context("file", path.display())
                    .with_source(err)
            })?
            .len();

        let size_threshold = u64::try_from(size_threshold_mb.max(1))
            .unwrap_or(1)
            .saturating_mul(MIB);

        Ok(FileWriter {
            archive_pattern: archive_pattern.unwrap_or_else(|| format!("{file_name}.%{{i}}")),
            path,
            compress,
            size_threshold,
            keep_count,
            naming,
            state: Mutex::new(RotationState {
                file,
                current_size,
                store_index,
                store_first: 0,
                archives: BTreeMap::new(),
            }),
            rotating: Mutex::new(()),
            trap,
        })
    }
}
