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

//! Recurring tasks for time-based rotation.

use std::fmt;
use std::str::FromStr;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::DateTime;
use chrono::Local;
use chrono::TimeDelta;
use chrono::TimeZone;
use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use jiff::SignedDuration;

use crate::Error;
use crate::Level;
use crate::trap::Trap;

/// Expression used when a file writer does not configure one.
pub const DEFAULT_SCHEDULE: &str = "@daily";

/// When a recurring task fires.
///
/// Accepts cron expressions with a leading seconds field (`sec min hour day month weekday
/// [year]`), the classic five-field form (seconds fixed to 0), the descriptors `@yearly`
/// (`@annually`), `@monthly`, `@weekly`, `@daily` (`@midnight`), `@hourly`, `@minutely`, and
/// `@every <duration>`, e.g. `@every 90s`.
///
/// Numeric weekdays count from Sunday = 1; names (`MON-FRI`) are clearer.
///
/// # Examples
///
/// ```
/// use logrota::schedule::Schedule;
///
/// let nightly: Schedule = "0 30 2 * * *".parse().unwrap();
/// let classic: Schedule = "30 2 * * *".parse().unwrap();
/// let periodic: Schedule = "@every 15m".parse().unwrap();
/// assert!("every night".parse::<Schedule>().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Schedule {
    expr: String,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Cron(Box<cron::Schedule>),
    Every(TimeDelta),
}

impl Schedule {
    /// The expression this schedule was parsed from.
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// The first firing strictly after `now`, in the time zone of `now`.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, Error> {
        let next = match &self.kind {
            Kind::Cron(schedule) => schedule.after(now).next(),
            Kind::Every(period) => now.clone().checked_add_signed(*period),
        };
        next.ok_or_else(|| {
            Error::new("schedule has no further firing").with_context("schedule", &self.expr)
        })
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expr = s.trim();
        let lower = expr.to_ascii_lowercase();

        if let Some(period) = lower.strip_prefix("@every") {
            let period = parse_period(period.trim())
                .map_err(|err| err.with_context("expr", expr))?;
            return Ok(Schedule {
                expr: expr.to_string(),
                kind: Kind::Every(period),
            });
        }

        let normalized = match lower.as_str() {
            "@annually" => "@yearly".to_string(),
            "@midnight" => "@daily".to_string(),
            "@minutely" => "0 * * * * *".to_string(),
            descriptor if descriptor.starts_with('@') => descriptor.to_string(),
            _ if expr.split_whitespace().count() == 5 => format!("0 {expr}"),
            _ => expr.to_string(),
        };
        let schedule = cron::Schedule::from_str(&normalized).map_err(|err| {
            Error::new("invalid schedule")
                .with_context("expr", expr)
                .with_source(err)
        })?;

        Ok(Schedule {
            expr: expr.to_string(),
            kind: Kind::Cron(Box::new(schedule)),
        })
    }
}

fn parse_period(period: &str) -> Result<TimeDelta, Error> {
    let period = SignedDuration::from_str(period)
        .map_err(|err| Error::new("invalid schedule period").with_source(err))?;
    if !period.is_positive() {
        return Err(Error::new("schedule period must be positive"));
    }
    let nanos = u32::try_from(period.subsec_nanos()).unwrap_or(0);
    TimeDelta::new(period.as_secs(), nanos)
        .ok_or_else(|| Error::new("schedule period out of range"))
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

/// A named task run whenever its schedule fires.
pub struct Job {
    name: String,
    schedule: Schedule,
    task: Box<dyn Fn() + Send>,
}

impl Job {
    /// Creates a job.
    pub fn new(
        name: impl Into<String>,
        schedule: Schedule,
        task: impl Fn() + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            schedule,
            task: Box::new(task),
        }
    }

    /// The job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The job schedule.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// A background thread running [`Job`]s until stopped.
#[derive(Debug)]
pub struct Scheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the scheduler thread.
    pub fn start(jobs: Vec<Job>, trap: std::sync::Arc<dyn Trap>) -> Result<Scheduler, Error> {
        let (shutdown, stop) = crossbeam_channel::bounded(1);
        let handle = std::thread::Builder::new()
            .name("logrota-scheduler".to_string())
            .spawn(move || run(jobs, stop, trap.as_ref()))
            .map_err(|err| Error::new("failed to spawn scheduler thread").with_source(err))?;

        Ok(Scheduler {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for a running job to finish. Idempotent.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(jobs: Vec<Job>, stop: Receiver<()>, trap: &dyn Trap) {
    let first = |job: &Job| match job.schedule.next_after(&Local::now()) {
        Ok(next) => Some(next),
        Err(err) => {
            trap.trap(Level::Error, &err.with_context("job", &job.name));
            None
        }
    };

    let mut pending: Vec<(Job, Option<DateTime<Local>>)> = jobs
        .into_iter()
        .map(|job| {
            let next = first(&job);
            (job, next)
        })
        .collect();

    loop {
        let earliest = pending.iter().filter_map(|(_, next)| *next).min();
        let received = match earliest {
            None => stop.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(at) => {
                let wait = at
                    .signed_duration_since(Local::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                stop.recv_timeout(wait)
            }
        };

        match received {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Local::now();
        for (job, next) in pending.iter_mut() {
            if next.is_some_and(|at| at <= now) {
                (job.task)();
                *next = first(job);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use chrono::Utc;

    use super::*;
    use crate::trap::CollectingTrap;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn next(expr: &str) -> DateTime<Utc> {
        let schedule: Schedule = expr.parse().unwrap();
        schedule.next_after(&at(2024, 8, 10, 17, 12, 52)).unwrap()
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(next("@minutely"), at(2024, 8, 10, 17, 13, 0));
        assert_eq!(next("@hourly"), at(2024, 8, 10, 18, 0, 0));
        assert_eq!(next("@daily"), at(2024, 8, 11, 0, 0, 0));
        assert_eq!(next("@Midnight"), at(2024, 8, 11, 0, 0, 0));
        assert_eq!(next("@monthly"), at(2024, 9, 1, 0, 0, 0));
        assert_eq!(next("@yearly"), at(2025, 1, 1, 0, 0, 0));
        assert_eq!(next("@annually"), at(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_field_expressions() {
        assert_eq!(next("0 0 * * *"), at(2024, 8, 11, 0, 0, 0));
        assert_eq!(next("0 0 0 * * *"), at(2024, 8, 11, 0, 0, 0));
        assert_eq!(next("0 */5 * * * *"), at(2024, 8, 10, 17, 15, 0));
        assert_eq!(next("30 9 * * *"), at(2024, 8, 11, 9, 30, 0));
        assert_eq!(next("15 * * * * *"), at(2024, 8, 10, 17, 13, 15));
    }

    #[test]
    fn test_every_period() {
        assert_eq!(next("@every 30s"), at(2024, 8, 10, 17, 13, 22));
        assert_eq!(next("@every 1h30m"), at(2024, 8, 10, 18, 42, 52));
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in ["every night", "0 0 *", "@fortnightly", "@every -5s", "@every soon", ""] {
            assert!(expr.parse::<Schedule>().is_err(), "{expr}");
        }
    }

    #[test]
    fn test_display_keeps_expression() {
        for expr in ["@daily", "0 0 * * *", "@every 90s"] {
            assert_eq!(expr.parse::<Schedule>().unwrap().to_string(), expr);
        }
    }

    #[test]
    fn test_scheduler_runs_and_stops() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let job = Job::new("tick", "@every 10ms".parse().unwrap(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut scheduler = Scheduler::start(vec![job], Arc::new(CollectingTrap::new())).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        scheduler.stop();

        let after_stop = fired.load(Ordering::SeqCst);
        assert!(after_stop >= 1);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), after_stop);
        scheduler.stop();
    }
}
