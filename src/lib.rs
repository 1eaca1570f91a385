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

//! Logrota is a leveled logging library that routes records by package to named writers,
//! which print to the console or append to files that rotate into numbered, optionally
//! gzipped archives.
//!
//! # Overview
//!
//! A [`Registry`] owns a set of [`Writer`](append::Writer)s built from a [`Config`]
//! document. Every log call is delivered to every writer; each writer decides on its own
//! whether to take the record, from its severity window (`allow <= level < deny`) and from
//! the package routing rules. File writers rotate when they grow past a size threshold
//! (checked after every write and by a periodic sweep) and on a time schedule.
//!
//! # Examples
//!
//! Without configuration, records go to a default console writer:
//!
//! ```
//! logrota::info!("service ", "starting");
//! logrota::warnf!("{} retries left", 3);
//! ```
//!
//! With a configuration document:
//!
//! ```
//! let dir = tempfile::tempdir().unwrap();
//! let config = logrota::Config::from_json_str(&format!(
//!     r#"{{
//!         "loggers": [
//!             {{ "name": "console", "target": "STDOUT", "level": {{ "allow": "WARN" }} }},
//!             {{ "name": "file", "target": "FILE", "fileName": "{}/app.log",
//!                "filePattern": "{}/app-%{{i}}.log", "rolling": {{ "keepCount": 5 }} }}
//!         ],
//!         "defaultFilter": {{ "loggers": ["console", "file"] }}
//!     }}"#,
//!     dir.path().display(),
//!     dir.path().display(),
//! ))
//! .unwrap();
//!
//! logrota::init(config).unwrap();
//! logrota::infof!("only in the file");
//! logrota::errorf!("in both");
//! logrota::shutdown();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
#[cfg(feature = "bridge-log")]
pub mod bridge;
pub mod config;
pub mod filter;
pub mod layout;
pub mod record;
pub mod registry;
pub mod schedule;
pub mod time;
pub mod trap;
pub mod variable;

mod error;
mod level;
mod macros;

pub use self::config::Config;
pub use self::error::Error;
pub use self::layout::Layout;
pub use self::level::Level;
pub use self::registry::Registry;
pub use self::registry::RegistryBuilder;
pub use self::registry::global;
pub use self::registry::init;
pub use self::registry::set_global;
pub use self::registry::shutdown;
pub use self::trap::Trap;
