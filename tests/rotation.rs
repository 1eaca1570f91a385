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

use std::fs;
use std::fs::File;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use jiff::Timestamp;
use jiff::tz::TimeZone;
use logrota::Config;
use logrota::Level;
use logrota::Registry;
use logrota::append::file::Compress;
use logrota::append::file::FileWriter;
use logrota::append::file::ManualClock;
use logrota::trap::CollectingTrap;
use rand::Rng;
use rand::distr::Alphanumeric;
use tempfile::TempDir;

fn generate_random_string() -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(50..=100);
    std::iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .map(char::from)
        .take(len)
        .collect()
}

#[test]
fn test_concurrent_writes_survive_rotation() {
    let dir = TempDir::new().unwrap();
    let trap = CollectingTrap::new();
    let writer = Arc::new(
        FileWriter::builder(format!("{}/app.log", dir.path().display()))
            .archive_pattern(format!("{}/archive/app-%{{i}}.log", dir.path().display()))
            .trap(trap.clone())
            .build()
            .unwrap(),
    );

    let threads = 4;
    let lines_per_thread = 500;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let writer = writer.clone();
            thread::spawn(move || {
                for i in 0..lines_per_thread {
                    writer.write(format!("{t}-{i}\n").as_bytes()).unwrap();
                }
            })
        })
        .collect();

    let mut rotations = 0;
    while handles.iter().any(|h| !h.is_finished()) {
        if writer.rotate().is_some() {
            rotations += 1;
        }
        thread::sleep(Duration::from_millis(1));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    writer.flush().unwrap();

    let mut lines: Vec<String> = vec![];
    for archive in writer.archives().values() {
        lines.extend(fs::read_to_string(archive).unwrap().lines().map(String::from));
    }
    lines.extend(
        fs::read_to_string(writer.path())
            .unwrap()
            .lines()
            .map(String::from),
    );

    assert_eq!(writer.archives().len(), rotations);
    assert_eq!(lines.len(), threads * lines_per_thread);
    lines.sort();
    lines.dedup();
    assert_eq!(lines.len(), threads * lines_per_thread);
    assert!(trap.entries().is_empty(), "{:?}", trap.entries());
}

#[test]
fn test_gzip_archive_holds_rotated_bytes() {
    let dir = TempDir::new().unwrap();
    let writer = FileWriter::builder(format!("{}/app.log", dir.path().display()))
        .archive_pattern(format!("{}/app-%{{i}}.log", dir.path().display()))
        .compress(Compress::Gzip)
        .build()
        .unwrap();

    let before = generate_random_string();
    let after = generate_random_string();
    writer.write(before.as_bytes()).unwrap();
    let archive = writer.rotate().unwrap();
    writer.write(after.as_bytes()).unwrap();

    assert_eq!(archive, dir.path().join("app-01.log.gz"));
    let mut decoded = String::new();
    GzDecoder::new(File::open(&archive).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, before);
    assert_eq!(fs::read_to_string(writer.path()).unwrap(), after);
}

#[test]
fn test_dated_archives_with_retention() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(Timestamp::from_str("2024-08-10T23:00:00Z").unwrap());
    let writer = FileWriter::builder(format!("{}/app.log", dir.path().display()))
        .archive_pattern(format!(
            "{}/%{{date:yyyy-mm-dd}}/app-%{{i}}.log",
            dir.path().display()
        ))
        .keep_count(2)
        .clock(clock.clone())
        .timezone(TimeZone::UTC)
        .build()
        .unwrap();

    let mut archives = vec![];
    for day in ["2024-08-10", "2024-08-11", "2024-08-12"] {
        clock.set_now(Timestamp::from_str(&format!("{day}T23:00:00Z")).unwrap());
        writer.write(format!("{day}\n").as_bytes()).unwrap();
        archives.push(writer.rotate().unwrap());
    }

    assert_eq!(archives[0], dir.path().join("2024-08-10/app-01.log"));
    assert_eq!(archives[2], dir.path().join("2024-08-12/app-03.log"));
    assert!(!archives[0].exists());
    assert_eq!(fs::read_to_string(&archives[1]).unwrap(), "2024-08-11\n");
    assert_eq!(fs::read_to_string(&archives[2]).unwrap(), "2024-08-12\n");
    assert_eq!(writer.store_first(), 2);
}

#[test]
fn test_rotation_without_index_token_is_still_counted() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(Timestamp::from_str("2024-08-10T00:00:00Z").unwrap());
    let writer = FileWriter::builder(format!("{}/app.log", dir.path().display()))
        .archive_pattern(format!("{}/app-%{{date:HHMMSS}}.log", dir.path().display()))
        .keep_count(1)
        .clock(clock.clone())
        .timezone(TimeZone::UTC)
        .build()
        .unwrap();

    for second in ["00:00:01", "00:00:02", "00:00:03"] {
        clock.set_now(Timestamp::from_str(&format!("2024-08-10T{second}Z")).unwrap());
        writer.write(b"line\n").unwrap();
        writer.rotate().unwrap();
    }

    assert_eq!(writer.store_index(), 3);
    let mut remaining: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "app.log")
        .collect();
    remaining.sort();
    assert_eq!(remaining, ["app-000003.log"]);
}

#[test]
fn test_scheduled_rotation_from_config() {
    let dir = TempDir::new().unwrap();
    let trap = CollectingTrap::new();
    let config = Config::from_json_str(&format!(
        r#"{{
            "properties": [{{ "name": "dir", "value": "{}" }}],
            "loggers": [{{
                "name": "file",
                "target": "FILE",
                "fileName": "${{dir}}/app.log",
                "filePattern": "${{dir}}/app-%{{i}}.log",
                "format": {{ "value": "%{{Message}}" }},
                "rolling": {{ "timeBased": "@every 50ms" }}
            }}],
            "defaultFilter": {{ "loggers": ["file"] }}
        }}"#,
        dir.path().display()
    ))
    .unwrap();
    let registry = Registry::builder()
        .config(config)
        .trap(trap.clone())
        .build()
        .unwrap();

    registry.log(Level::Info, logrota::callsite!(), "before the schedule fired");
    let archive = dir.path().join("app-01.log");
    for _ in 0..100 {
        if archive.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    registry.shutdown();

    assert_eq!(
        fs::read_to_string(&archive).unwrap(),
        "before the schedule fired\n"
    );
    assert!(trap.entries().is_empty(), "{:?}", trap.entries());
}

#[test]
fn test_cron_field_expression_rotates() {
    let dir = TempDir::new().unwrap();
    let trap = CollectingTrap::new();
    let config = Config::from_json_str(&format!(
        r#"{{
            "loggers": [{{
                "name": "file",
                "target": "FILE",
                "fileName": "{dir}/app.log",
                "filePattern": "{dir}/app-%{{i}}.log",
                "format": {{ "value": "%{{Message}}" }},
                "rolling": {{ "timeBased": "* * * * * *" }}
            }}],
            "defaultFilter": {{ "loggers": ["file"] }}
        }}"#,
        dir = dir.path().display()
    ))
    .unwrap();
    let registry = Registry::builder()
        .config(config)
        .trap(trap.clone())
        .build()
        .unwrap();

    registry.log(Level::Info, logrota::callsite!(), "rotated on the second");
    let archive = dir.path().join("app-01.log");
    for _ in 0..150 {
        if archive.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    registry.shutdown();

    assert_eq!(
        fs::read_to_string(&archive).unwrap(),
        "rotated on the second\n"
    );
    assert!(trap.entries().is_empty(), "{:?}", trap.entries());
}

#[test]
fn test_invalid_schedule_keeps_writer() {
    let dir = TempDir::new().unwrap();
    let trap = CollectingTrap::new();
    let config = Config::from_json_str(&format!(
        r#"{{
            "loggers": [{{ "name": "file", "target": "FILE", "fileName": "{}/app.log",
                          "rolling": {{ "timeBased": "every night" }} }}]
        }}"#,
        dir.path().display()
    ))
    .unwrap();
    let registry = Registry::builder()
        .config(config)
        .trap(trap.clone())
        .build()
        .unwrap();

    assert!(registry.writer("file").is_some());
    assert!(trap.contains("invalid schedule"));
    assert_eq!(trap.entries()[0].0, Level::Error);
}
