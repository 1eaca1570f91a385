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

//! Severity windows and package routing rules.

use std::sync::Arc;

use crate::Level;

/// A rule routing records from one package (module path) to a set of writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRule {
    package: String,
    writers: Vec<String>,
}

impl PackageRule {
    /// Route records from `package` to the named writers.
    pub fn new<I, S>(package: impl Into<String>, writers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package: package.into(),
            writers: writers.into_iter().map(Into::into).collect(),
        }
    }

    /// The package this rule applies to.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The writers this rule routes to.
    pub fn writers(&self) -> &[String] {
        &self.writers
    }

    /// Whether `module_path` is this package or one of its submodules.
    pub fn matches(&self, module_path: &str) -> bool {
        match module_path.strip_prefix(self.package.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

/// The routing table shared by every writer of a registry.
///
/// Explicit package rules are consulted first; a matching rule with no writers blocks the
/// package entirely. Otherwise the default rule decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRules {
    packages: Vec<PackageRule>,
    default: Vec<String>,
}

impl PackageRules {
    /// Create an empty table, which routes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicit package rule.
    pub fn package(mut self, rule: PackageRule) -> Self {
        self.packages.push(rule);
        self
    }

    /// Set the writers that receive records from any package.
    pub fn default_writers<I, S>(mut self, writers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = writers.into_iter().map(Into::into).collect();
        self
    }

    /// Whether records from `module_path` should reach the writer named `writer`.
    pub fn routes(&self, module_path: &str, writer: &str) -> bool {
        for rule in self.packages.iter().filter(|r| r.matches(module_path)) {
            if rule.writers.is_empty() {
                return false;
            }
            if rule.writers.iter().any(|w| w == writer) {
                return true;
            }
        }

        self.default.iter().any(|w| w == writer)
    }

    /// Writer names that explicit rules route `module_path` to, in rule order.
    pub fn explicit_writers(&self, module_path: &str) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for rule in self.packages.iter().filter(|r| r.matches(module_path)) {
            for name in &rule.writers {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Every writer name mentioned by any rule.
    pub fn referenced_writers(&self) -> impl Iterator<Item = &str> {
        self.packages
            .iter()
            .flat_map(|r| r.writers.iter())
            .chain(self.default.iter())
            .map(String::as_str)
    }
}

/// The filtering policy of one writer: a severity window plus package routing.
///
/// A policy without routing rules is filter-exempt: package routing always passes.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    allow: Level,
    deny: Level,
    rules: Option<Arc<PackageRules>>,
}

impl FilterPolicy {
    /// A filter-exempt policy accepting `allow` and above.
    pub fn new(allow: Level) -> Self {
        Self {
            allow,
            deny: Level::Off,
            rules: None,
        }
    }

    /// Route through `rules` instead of being filter-exempt.
    pub fn with_rules(mut self, rules: Arc<PackageRules>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set the exclusive upper bound.
    ///
    /// A bound at or below the allow level would leave an empty window; the policy is then
    /// switched off entirely by raising the allow level to [`Level::Off`].
    pub fn with_deny(mut self, deny: Level) -> Self {
        self.set_deny(deny);
        self
    }

    /// See [`FilterPolicy::with_deny`].
    pub fn set_deny(&mut self, deny: Level) {
        if deny <= self.allow {
            self.allow = Level::Off;
        } else {
            self.deny = deny;
        }
    }

    /// The minimum accepted level.
    pub fn allow(&self) -> Level {
        self.allow
    }

    /// The exclusive upper bound.
    pub fn deny(&self) -> Level {
        self.deny
    }

    /// Whether this policy bypasses package routing.
    pub fn is_exempt(&self) -> bool {
        self.rules.is_none()
    }

    /// `allow <= level < deny`.
    pub fn accept(&self, level: Level) -> bool {
        self.allow <= level && level < self.deny
    }

    /// Whether records from `module_path` are routed to the writer named `writer`.
    pub fn package_filter(&self, module_path: &str, writer: &str) -> bool {
        match &self.rules {
            None => true,
            Some(rules) => rules.routes(module_path, writer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_info_window() {
        let policy = FilterPolicy::new(Level::Info).with_deny(Level::Off);
        let accepted: Vec<Level> = Level::ALL_LEVELS
            .into_iter()
            .filter(|l| policy.accept(*l))
            .collect();
        assert_eq!(
            accepted,
            [Level::Info, Level::Warn, Level::Error, Level::Fatal]
        );
    }

    #[test]
    fn test_deny_is_exclusive() {
        let policy = FilterPolicy::new(Level::Debug).with_deny(Level::Error);
        assert!(policy.accept(Level::Debug));
        assert!(policy.accept(Level::Warn));
        assert!(!policy.accept(Level::Error));
        assert!(!policy.accept(Level::Trace));
    }

    #[test]
    fn test_deny_at_or_below_allow_disables() {
        for deny in [Level::Info, Level::Debug, Level::All] {
            let mut policy = FilterPolicy::new(Level::Info);
            policy.set_deny(deny);
            assert_eq!(policy.allow(), Level::Off);
            assert!(Level::ALL_LEVELS.iter().all(|l| !policy.accept(*l)));

            policy.set_deny(deny);
            assert_eq!(policy.allow(), Level::Off);
            assert!(Level::ALL_LEVELS.iter().all(|l| !policy.accept(*l)));
        }
    }

    #[test]
    fn test_package_rule_matches_submodules() {
        let rule = PackageRule::new("app::net", ["file"]);
        assert!(rule.matches("app::net"));
        assert!(rule.matches("app::net::http"));
        assert!(!rule.matches("app::network"));
        assert!(!rule.matches("app"));
    }

    #[test]
    fn test_explicit_rule_then_default() {
        let rules = PackageRules::new()
            .package(PackageRule::new("app::db", ["db_file"]))
            .default_writers(["console"]);

        assert!(rules.routes("app::db", "db_file"));
        assert!(rules.routes("app::db", "console"));
        assert!(!rules.routes("app::web", "db_file"));
        assert!(rules.routes("app::web", "console"));
        assert_eq!(rules.explicit_writers("app::db::pool"), ["db_file"]);
    }

    #[test]
    fn test_empty_package_rule_blocks() {
        let rules = PackageRules::new()
            .package(PackageRule::new("noisy", Vec::<String>::new()))
            .default_writers(["console"]);
        assert!(!rules.routes("noisy::inner", "console"));
        assert!(rules.routes("quiet", "console"));
    }

    #[test]
    fn test_exempt_policy_bypasses_rules() {
        let policy = FilterPolicy::new(Level::All);
        assert!(policy.is_exempt());
        assert!(policy.package_filter("anything", "anyone"));

        let routed = FilterPolicy::new(Level::All).with_rules(Arc::new(PackageRules::new()));
        assert!(!routed.is_exempt());
        assert!(!routed.package_filter("anything", "anyone"));
    }
}
