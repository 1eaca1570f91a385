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

//! The registry of writers and its global instance.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use jiff::tz::TimeZone;

use crate::Error;
use crate::Level;
use crate::append::Console;
use crate::append::ConsoleTarget;
use crate::append::Writer;
use crate::append::file::Clock;
use crate::append::file::Compress;
use crate::append::file::FileWriter;
use crate::config::Config;
use crate::config::LoggerDef;
use crate::filter::FilterPolicy;
use crate::filter::PackageRules;
use crate::layout::DEFAULT_TEMPLATE;
use crate::layout::JsonLayout;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::CallSite;
use crate::record::Record;
use crate::schedule::DEFAULT_SCHEDULE;
use crate::schedule::Job;
use crate::schedule::Schedule;
use crate::schedule::Scheduler;
use crate::trap::DefaultTrap;
use crate::trap::Trap;
use crate::variable::Properties;

mod global;
mod sweep;

pub use self::global::default_prefix;
pub use self::global::dispatch;
pub use self::global::fatal;
pub use self::global::fatal_values;
pub use self::global::global;
pub use self::global::init;
pub use self::global::log_values;
pub use self::global::set_global;
pub use self::global::shutdown;

use self::sweep::Sweep;

type FatalHook = Arc<dyn Fn() + Send + Sync>;

/// A set of named writers that every log call fans out to.
///
/// Owns the background threads that rotate its file writers: a periodic size sweep and a
/// scheduler for time-based rotation. Both stop, and every writer is flushed, on
/// [`Registry::shutdown`] or when the registry is dropped.
pub struct Registry {
    writers: Vec<Arc<Writer>>,
    rules: Arc<PackageRules>,
    prefix: String,
    trap: Arc<dyn Trap>,
    fatal: FatalHook,
    background: Mutex<Background>,
}

#[derive(Debug, Default)]
struct Background {
    sweep: Option<Sweep>,
    scheduler: Option<Scheduler>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("writers", &self.writers)
            .field("rules", &self.rules)
            .field("prefix", &self.prefix)
            .field("trap", &self.trap)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates a new [`RegistryBuilder`].
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build a registry from a configuration document with default collaborators.
    pub fn from_config(config: Config) -> Result<Registry, Error> {
        RegistryBuilder::new().config(config).build()
    }

    /// All writers, in definition order.
    pub fn writers(&self) -> &[Arc<Writer>] {
        &self.writers
    }

    /// The writer registered under `name`.
    pub fn writer(&self, name: &str) -> Option<&Arc<Writer>> {
        self.writers.iter().find(|w| w.name() == name)
    }

    /// The writers an explicit package rule routes `package` to.
    pub fn writers_for_package(&self, package: &str) -> Vec<&Arc<Writer>> {
        self.rules
            .explicit_writers(package)
            .into_iter()
            .filter_map(|name| self.writer(name))
            .collect()
    }

    /// The value of the `%{Prefix}` field.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether any writer would take a record at `level` from `module_path`.
    pub fn enabled(&self, level: Level, module_path: &str) -> bool {
        self.writers
            .iter()
            .any(|w| w.accept(level) && w.package_filter(module_path))
    }

    /// Deliver a formatted message to every writer.
    pub fn dispatch(&self, level: Level, callsite: CallSite<'_>, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(message) => self.log(level, callsite, message),
            None => self.log(level, callsite, args.to_string()),
        }
    }

    /// Deliver a message to every writer; each applies its own filter policy.
    pub fn log<'a>(
        &self,
        level: Level,
        callsite: CallSite<'a>,
        message: impl Into<Cow<'a, str>>,
    ) {
        let message: Cow<'a, str> = message.into();
        let record = Record::new(level, &self.prefix, callsite, message);
        for writer in &self.writers {
            if let Err(err) = writer.emit(&record) {
                self.trap.trap(Level::Error, &err);
            }
        }
    }

    /// Deliver a fatal message, flush every writer and run the fatal hook.
    ///
    /// The default hook exits the process with status 1.
    pub fn fatal(&self, callsite: CallSite<'_>, args: fmt::Arguments<'_>) {
        self.dispatch(Level::Fatal, callsite, args);
        self.flush();
        (self.fatal)();
    }

    /// Flush every writer; file writers sync to disk.
    pub fn flush(&self) {
        for writer in &self.writers {
            if let Err(err) = writer.flush() {
                self.trap.trap(Level::Error, &err);
            }
        }
    }

    /// Stop the size sweep and the scheduler, then flush every writer. Idempotent.
    pub fn shutdown(&self) {
        let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut sweep) = background.sweep.take() {
            sweep.stop();
        }
        if let Some(mut scheduler) = background.scheduler.take() {
            scheduler.stop();
        }
        drop(background);
        self.flush();
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A builder for configuring a [`Registry`].
///
/// # Examples
///
/// ```
/// use logrota::Config;
/// use logrota::Registry;
/// use logrota::append::ConsoleTarget;
/// use logrota::trap::CollectingTrap;
///
/// let config = Config::from_json_str(
///     r#"{ "loggers": [{ "name": "out", "target": "STDOUT" }],
///          "defaultFilter": { "loggers": ["out"] } }"#,
/// )
/// .unwrap();
/// let (target, output) = ConsoleTarget::buffer();
/// let registry = Registry::builder()
///     .config(config)
///     .console_target(target)
///     .trap(CollectingTrap::new())
///     .build()
///     .unwrap();
///
/// registry.log(logrota::Level::Info, logrota::callsite!(), "hello");
/// assert!(String::from_utf8_lossy(&output.lock().unwrap()).ends_with("hello\n"));
/// ```
#[must_use = "call `build` to create the registry"]
pub struct RegistryBuilder {
    config: Config,
    writers: Vec<Writer>,
    trap: Arc<dyn Trap>,
    fatal: FatalHook,
    console_target: Option<ConsoleTarget>,
    clock: Clock,
    timezone: TimeZone,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("config", &self.config)
            .field("writers", &self.writers)
            .field("trap", &self.trap)
            .field("console_target", &self.console_target)
            .finish_non_exhaustive()
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create a builder with an empty configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            writers: vec![],
            trap: Arc::new(DefaultTrap::default()),
            fatal: Arc::new(|| std::process::exit(1)),
            console_target: None,
            clock: Clock::DefaultClock,
            timezone: TimeZone::system(),
        }
    }

    /// Build writers from `config`.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Add a writer built by hand, after the configured ones.
    pub fn writer(mut self, writer: Writer) -> Self {
        self.writers.push(writer);
        self
    }

    /// Sets the trap for internal errors. Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    /// Run `hook` after a fatal message instead of exiting the process.
    pub fn on_fatal(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.fatal = Arc::new(hook);
        self
    }

    /// Send every configured console writer to `target`, whatever its configured target.
    pub fn console_target(mut self, target: ConsoleTarget) -> Self {
        self.console_target = Some(target);
        self
    }

    /// Sets the clock file writers resolve `%{date}` with.
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Sets the time zone of rendered timestamps. Defaults to the system time zone.
    pub fn timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Build every writer and start the rotation threads.
    ///
    /// A writer definition that cannot be built is reported to the trap and skipped.
    pub fn build(self) -> Result<Registry, Error> {
        let properties = Arc::new(self.config.properties());
        let rules = self.config.package_rules();
        let prefix = self
            .config
            .prefix
            .clone()
            .unwrap_or_else(|| default_prefix().to_string());

        let mut writers: Vec<Arc<Writer>> = vec![];
        let mut jobs = vec![];
        for def in &self.config.loggers {
            if writers.iter().any(|w| w.name() == def.name) {
                let err = Error::new("duplicate logger name, definition skipped")
                    .with_context("logger", &def.name);
                self.trap.trap(Level::Warn, &err);
                continue;
            }

            match self.build_writer(def, &rules, &properties) {
                Ok((writer, schedule)) => {
                    let writer = Arc::new(writer);
                    if let Some(schedule) = schedule {
                        let target = writer.clone();
                        jobs.push(Job::new(def.name.clone(), schedule, move || {
                            target.rotate();
                        }));
                    }
                    writers.push(writer);
                }
                Err(err) => {
                    let err = err.with_context("logger", &def.name);
                    self.trap.trap(Level::Error, &err);
                }
            }
        }
        writers.extend(self.writers.into_iter().map(Arc::new));

        let file_writers: Vec<Arc<Writer>> = writers
            .iter()
            .filter(|w| w.as_file().is_some())
            .cloned()
            .collect();

        let mut background = Background::default();
        if !file_writers.is_empty() {
            background.sweep = Some(Sweep::start(self.config.rolling_interval(), file_writers)?);
        }
        if !jobs.is_empty() {
            background.scheduler = Some(Scheduler::start(jobs, self.trap.clone())?);
        }

        Ok(Registry {
            writers,
            rules,
            prefix,
            trap: self.trap,
            fatal: self.fatal,
            background: Mutex::new(background),
        })
    }

    fn build_writer(
        &self,
        def: &LoggerDef,
        rules: &Arc<PackageRules>,
        properties: &Arc<Properties>,
    ) -> Result<(Writer, Option<Schedule>), Error> {
        let policy = FilterPolicy::new(Level::from_name(&def.level.allow))
            .with_rules(rules.clone())
            .with_deny(Level::from_name(&def.level.deny));
        let layout = self.build_layout(def, properties)?;

        if def.target.trim().eq_ignore_ascii_case("file") {
            let file = FileWriter::builder(&def.file_name)
                .archive_pattern(&def.file_pattern)
                .compress(Compress::from_name(&def.compress)?)
                .size_threshold_mb(def.rolling.size_based_mb)
                .keep_count(def.rolling.keep_count)
                .properties(properties.clone())
                .clock(self.clock.clone())
                .timezone(self.timezone.clone())
                .shared_trap(self.trap.clone())
                .build()?;

            let expr = match def.rolling.time_based.trim() {
                "" => DEFAULT_SCHEDULE,
                expr => expr,
            };
            let schedule = match expr.parse::<Schedule>() {
                Ok(schedule) => Some(schedule),
                Err(err) => {
                    let err = err
                        .with_context("logger", &def.name)
                        .with_context("effect", "time-based rotation disabled");
                    self.trap.trap(Level::Error, &err);
                    None
                }
            };

            return Ok((Writer::new(&def.name, policy, layout, file), schedule));
        }

        let Some(target) = ConsoleTarget::from_name(&def.target) else {
            return Err(
                Error::new("unsupported logger target").with_context("target", &def.target)
            );
        };
        let target = self.console_target.clone().unwrap_or(target);
        Ok((
            Writer::new(&def.name, policy, layout, Console::new(target)),
            None,
        ))
    }

    fn build_layout(
        &self,
        def: &LoggerDef,
        properties: &Properties,
    ) -> Result<Box<dyn Layout>, Error> {
        let kind = def.format.kind.trim();
        if kind.eq_ignore_ascii_case("json") {
            let layout = JsonLayout::default()
                .indent(def.format.indent)
                .timezone(self.timezone.clone());
            return Ok(layout.into());
        }
        if !kind.is_empty() && !kind.eq_ignore_ascii_case("text") {
            return Err(Error::new("unsupported format type").with_context("type", kind));
        }

        let template = match def.format.value.as_str() {
            "" => DEFAULT_TEMPLATE.to_string(),
            template => properties.expand(template),
        };
        let layout = TextLayout::new(template).timezone(self.timezone.clone());
        for field in layout.unsupported_fields() {
            let err = Error::new("unsupported field in format, rendered empty")
                .with_context("logger", &def.name)
                .with_context("field", field);
            self.trap.trap(Level::Warn, &err);
        }
        Ok(layout.into())
    }
}
