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

//! The configuration document.
//!
//! ```json
//! {
//!   "rollingIntervalSeconds": 60,
//!   "properties": [{ "name": "dir", "value": "/var/log/app" }],
//!   "loggers": [
//!     { "name": "console", "target": "STDOUT", "level": { "allow": "WARN" } },
//!     {
//!       "name": "file",
//!       "target": "FILE",
//!       "fileName": "${dir}/app.log",
//!       "filePattern": "${dir}/archive/app-%{date:yyyymmdd}-%{i}.log",
//!       "compress": "gzip",
//!       "format": { "type": "json" },
//!       "rolling": { "timeBased": "@daily", "sizeBasedMB": 64, "keepCount": 10 }
//!     }
//!   ],
//!   "defaultFilter": { "loggers": ["console", "file"] },
//!   "packageFilters": [{ "name": "noisy_dep", "loggers": [] }]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::filter::PackageRule;
use crate::filter::PackageRules;
use crate::variable::Properties;

/// Sweep period used when `rollingIntervalSeconds` is 0.
pub const DEFAULT_ROLLING_INTERVAL: Duration = Duration::from_secs(60);

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Period of the size-based rotation sweep; 0 selects [`DEFAULT_ROLLING_INTERVAL`].
    pub rolling_interval_seconds: u64,
    /// Value of the `%{Prefix}` field; defaults to the executable name.
    pub prefix: Option<String>,
    /// Substitution variables referenced as `${name}`.
    pub properties: Vec<PropertyDef>,
    /// Writer definitions.
    pub loggers: Vec<LoggerDef>,
    /// Writers receiving records from any package.
    pub default_filter: FilterDef,
    /// Per-package routing.
    pub package_filters: Vec<PackageFilterDef>,
}

/// A `${name}` substitution variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PropertyDef {
    pub name: String,
    pub value: String,
}

/// One writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerDef {
    pub name: String,
    /// `STDOUT`, `STDERR` or `FILE`.
    pub target: String,
    pub file_name: String,
    pub file_pattern: String,
    /// `gzip` or empty.
    pub compress: String,
    pub format: FormatDef,
    pub level: LevelDef,
    pub rolling: RollingDef,
}

/// How records are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatDef {
    /// `text` or `json`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The text template; empty selects the default template.
    pub value: String,
    /// Pretty-print JSON.
    pub indent: bool,
}

impl Default for FormatDef {
    fn default() -> Self {
        Self {
            kind: "text".to_string(),
            value: String::new(),
            indent: false,
        }
    }
}

/// The severity window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LevelDef {
    pub allow: String,
    pub deny: String,
}

impl Default for LevelDef {
    fn default() -> Self {
        Self {
            allow: "ALL".to_string(),
            deny: "OFF".to_string(),
        }
    }
}

/// Rotation policy of a file writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingDef {
    /// A cron expression (see [`Schedule`](crate::schedule::Schedule)); empty selects `@daily`.
    pub time_based: String,
    /// Size threshold in MiB; values below 1 are raised to 1.
    #[serde(rename = "sizeBasedMB")]
    pub size_based_mb: i64,
    /// Archives to keep; 0 keeps all.
    pub keep_count: usize,
}

/// Writer names of the default rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterDef {
    pub loggers: Vec<String>,
}

/// Writer names for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageFilterDef {
    /// The package (module path) the rule applies to.
    pub name: String,
    /// Writers receiving the package's records; empty blocks the package.
    pub loggers: Vec<String>,
}

impl Config {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Config, Error> {
        serde_json::from_str(json)
            .map_err(|err| Error::new("failed to parse configuration").with_source(err))
    }

    /// Read and parse a JSON document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|err| {
            Error::new("failed to read configuration")
                .with_context("path", path.display())
                .with_source(err)
        })?;
        Self::from_json_str(&json).map_err(|err| err.with_context("path", path.display()))
    }

    /// The sweep period, with 0 mapped to the default.
    pub fn rolling_interval(&self) -> Duration {
        match self.rolling_interval_seconds {
            0 => DEFAULT_ROLLING_INTERVAL,
            secs => Duration::from_secs(secs),
        }
    }

    /// The defined properties; later definitions win.
    pub fn properties(&self) -> Properties {
        self.properties
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }

    /// The routing table built from the default and package filters.
    pub fn package_rules(&self) -> Arc<PackageRules> {
        let rules = self
            .package_filters
            .iter()
            .fold(PackageRules::new(), |rules, filter| {
                rules.package(PackageRule::new(&filter.name, &filter.loggers))
            })
            .default_writers(&self.default_filter.loggers);
        Arc::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json_str(r#"{ "loggers": [{ "name": "c" }] }"#).unwrap();
        assert_eq!(config.rolling_interval(), DEFAULT_ROLLING_INTERVAL);
        assert_eq!(config.prefix, None);

        let logger = &config.loggers[0];
        assert_eq!(logger.level.allow, "ALL");
        assert_eq!(logger.level.deny, "OFF");
        assert_eq!(logger.format.kind, "text");
        assert_eq!(logger.rolling, RollingDef::default());
    }

    #[test]
    fn test_full_document() {
        let json = r#"{
            "rollingIntervalSeconds": 5,
            "prefix": "svc",
            "properties": [{ "name": "dir", "value": " /var/log \n" }],
            "loggers": [{
                "name": "file",
                "target": "FILE",
                "fileName": "${dir}/app.log",
                "filePattern": "${dir}/app-%{i}.log",
                "compress": "gzip",
                "format": { "type": "json", "indent": true },
                "level": { "allow": "debug", "deny": "error" },
                "rolling": { "timeBased": "@hourly", "sizeBasedMB": 8, "keepCount": 4 }
            }],
            "defaultFilter": { "loggers": ["file"] },
            "packageFilters": [{ "name": "noisy", "loggers": [] }]
        }"#;
        let config = Config::from_json_str(json).unwrap();

        assert_eq!(config.rolling_interval(), Duration::from_secs(5));
        assert_eq!(config.prefix.as_deref(), Some("svc"));
        assert_eq!(config.properties().expand("${dir}/app.log"), "/var/log/app.log");

        let logger = &config.loggers[0];
        assert_eq!(logger.file_pattern, "${dir}/app-%{i}.log");
        assert!(logger.format.indent);
        assert_eq!(logger.rolling.size_based_mb, 8);
        assert_eq!(logger.rolling.keep_count, 4);

        let rules = config.package_rules();
        assert!(rules.routes("app", "file"));
        assert!(!rules.routes("noisy::inner", "file"));
    }

    #[test]
    fn test_malformed_document() {
        let err = Config::from_json_str("{ loggers: ").unwrap_err();
        assert!(err.to_string().contains("failed to parse configuration"));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
