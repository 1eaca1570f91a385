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
use std::sync::Arc;
use std::sync::Mutex;

use logrota::Config;
use logrota::Level;
use logrota::Registry;
use logrota::append::ConsoleTarget;
use logrota::trap::CollectingTrap;
use tempfile::TempDir;

fn read(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(buf.lock().unwrap().clone()).unwrap()
}

fn two_writer_config(dir: &TempDir) -> Config {
    Config::from_json_str(&format!(
        r#"{{
            "prefix": "e2e",
            "loggers": [
                {{
                    "name": "console",
                    "target": "STDOUT",
                    "format": {{ "value": "%{{Level}} %{{Message}}" }},
                    "level": {{ "allow": "WARN" }}
                }},
                {{
                    "name": "file",
                    "target": "FILE",
                    "fileName": "{dir}/app.log",
                    "filePattern": "{dir}/archive/app-%{{i}}.log",
                    "format": {{ "value": "%{{Prefix}} %{{Level}} %{{Package}} %{{Message}}" }},
                    "level": {{ "allow": "ALL" }},
                    "rolling": {{ "sizeBasedMB": 1 }}
                }}
            ],
            "defaultFilter": {{ "loggers": ["console", "file"] }}
        }}"#,
        dir = dir.path().display()
    ))
    .unwrap()
}

#[test]
fn test_console_and_file_windows() {
    let dir = TempDir::new().unwrap();
    let (target, console) = ConsoleTarget::buffer();
    let trap = CollectingTrap::new();
    let registry = Registry::builder()
        .config(two_writer_config(&dir))
        .console_target(target)
        .trap(trap.clone())
        .build()
        .unwrap();

    registry.log(Level::Info, logrota::callsite!(), "x");
    registry.log(Level::Error, logrota::callsite!(), "y");
    registry.shutdown();

    assert_eq!(read(&console), "ERROR y\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("app.log")).unwrap(),
        "e2e INFO end_to_end x\ne2e ERROR end_to_end y\n"
    );
    assert!(trap.entries().is_empty(), "{:?}", trap.entries());
}

#[test]
fn test_package_rules_route_and_block() {
    let dir = TempDir::new().unwrap();
    let (target, console) = ConsoleTarget::buffer();
    let config = Config::from_json_str(&format!(
        r#"{{
            "loggers": [
                {{ "name": "console", "target": "STDOUT",
                   "format": {{ "value": "%{{Package}}: %{{Message}}" }} }},
                {{ "name": "db", "target": "FILE", "fileName": "{}/db.log",
                   "format": {{ "value": "%{{Message}}" }} }}
            ],
            "defaultFilter": {{ "loggers": ["console"] }},
            "packageFilters": [
                {{ "name": "app::db", "loggers": ["db"] }},
                {{ "name": "chatty", "loggers": [] }}
            ]
        }}"#,
        dir.path().display()
    ))
    .unwrap();
    let registry = Registry::builder()
        .config(config)
        .console_target(target)
        .build()
        .unwrap();

    let db = logrota::record::CallSite::new("app::db::pool", "src/db/pool.rs", 10);
    let web = logrota::record::CallSite::new("app::web", "src/web.rs", 20);
    let chatty = logrota::record::CallSite::new("chatty::inner", "src/lib.rs", 30);
    registry.log(Level::Info, db, "checked out");
    registry.log(Level::Info, web, "served");
    registry.log(Level::Info, chatty, "blah");
    registry.shutdown();

    assert_eq!(
        read(&console),
        "app::db::pool: checked out\napp::web: served\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("db.log")).unwrap(),
        "checked out\n"
    );
}

#[test]
fn test_json_writer() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_json_str(&format!(
        r#"{{
            "prefix": "svc",
            "loggers": [{{ "name": "json", "target": "FILE", "fileName": "{}/app.json",
                          "format": {{ "type": "json" }} }}],
            "defaultFilter": {{ "loggers": ["json"] }}
        }}"#,
        dir.path().display()
    ))
    .unwrap();
    let registry = Registry::from_config(config).unwrap();
    registry.log(Level::Warn, logrota::callsite!(), "disk almost full");
    registry.shutdown();

    let written = fs::read_to_string(dir.path().join("app.json")).unwrap();
    let line: serde_json::Value = serde_json::from_str(written.trim_end()).unwrap();
    assert_eq!(line["Prefix"], "svc");
    assert_eq!(line["Level"], "WARN");
    assert_eq!(line["Message"], "disk almost full");
    assert_eq!(line["PackageName"], "end_to_end");
}

#[test]
fn test_global_macros_report_caller() {
    let (target, console) = ConsoleTarget::buffer();
    let config = Config::from_json_str(
        r#"{
            "loggers": [{ "name": "console", "target": "STDOUT",
                          "format": { "value": "%{Level:5}|%{File}:%{Line}|%{Message}" },
                          "level": { "allow": "DEBUG", "deny": "FATAL" } }],
            "defaultFilter": { "loggers": ["console"] }
        }"#,
    )
    .unwrap();
    let registry = Registry::builder()
        .config(config)
        .console_target(target)
        .build()
        .unwrap();
    logrota::set_global(registry).unwrap();

    let (line_values, line_format) = (line!() + 1, line!() + 2);
    logrota::info!("user=", "ada", " attempts=", 3);
    logrota::infof!("user={} attempts={}", "ada", 3);
    logrota::trace!("dropped by the allow level");
    logrota::warnf!("{:.1}% left", 2.5);

    let expected = format!(
        "INFO |{file}:{line_values}|user=ada attempts=3\n\
         INFO |{file}:{line_format}|user=ada attempts=3\n\
         WARN |{file}:{warn}|2.5% left\n",
        file = file!(),
        warn = line_format + 2,
    );
    assert_eq!(read(&console), expected);

    let again = Registry::builder().build().unwrap();
    assert!(logrota::set_global(again).is_err());
    logrota::shutdown();
}
