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

//! Placeholder tokens in templates.
//!
//! Three grammars share one primitive: `${name}` user properties, `%{name[:arg]}` system
//! variables in file name templates, and `%{Field[:arg]}` fields in text layouts.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::Error;

pub(crate) static PROPERTY: LazyLock<VariablePattern> =
    LazyLock::new(|| VariablePattern::builtin('$', "[a-zA-Z_][0-9a-zA-Z_]*"));

pub(crate) static SYSTEM: LazyLock<VariablePattern> =
    LazyLock::new(|| VariablePattern::builtin('%', "[a-zA-Z_][0-9a-zA-Z_/:.%-]*"));

pub(crate) static FIELD: LazyLock<VariablePattern> =
    LazyLock::new(|| VariablePattern::builtin('%', r"[a-zA-Z_][0-9a-zA-Z\s._/:%-]*"));

/// A compiled `sigil{inner}` token matcher.
#[derive(Debug, Clone)]
pub struct VariablePattern {
    regex: Regex,
}

impl VariablePattern {
    /// Compile a matcher for tokens of the form `sigil{inner}`.
    ///
    /// `inner` is a regular expression describing the token body; it must not contain capture
    /// groups of its own.
    pub fn new(sigil: char, inner: &str) -> Result<Self, Error> {
        let sigil = regex::escape(sigil.encode_utf8(&mut [0; 4]));
        let regex = Regex::new(&format!(r"{sigil}\{{({inner})\}}")).map_err(|err| {
            Error::new("invalid variable pattern")
                .with_context("inner", inner)
                .with_source(err)
        })?;
        Ok(Self { regex })
    }

    fn builtin(sigil: char, inner: &str) -> Self {
        Self::new(sigil, inner).expect("builtin variable pattern must compile")
    }

    /// Find the first token in `text`, returning the full token and its inner value.
    pub fn extract<'t>(&self, text: &'t str) -> Option<(&'t str, &'t str)> {
        let caps = self.regex.captures(text)?;
        Some((caps.get(0)?.as_str(), caps.get(1)?.as_str()))
    }

    /// Iterate over every token in `text` as (byte range of the full token, inner value).
    pub(crate) fn tokens<'t>(
        &'t self,
        text: &'t str,
    ) -> impl Iterator<Item = (Range<usize>, &'t str)> + 't {
        self.regex.captures_iter(text).filter_map(|caps| {
            let token = caps.get(0)?;
            let inner = caps.get(1)?;
            Some((token.range(), inner.as_str()))
        })
    }

    /// Replace every token in `text` by what `resolve` returns for its inner value.
    ///
    /// The template is scanned once; substituted text is never rescanned. Identical tokens
    /// resolve once and share the value.
    pub fn expand(&self, text: &str, mut resolve: impl FnMut(&str) -> String) -> String {
        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.regex.captures_iter(text) {
            let (Some(token), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..token.start()]);
            let value = resolved
                .entry(token.as_str())
                .or_insert_with(|| resolve(inner.as_str()));
            out.push_str(value);
            last = token.end();
        }

        out.push_str(&text[last..]);
        out
    }
}

/// Find the first `sigil{inner}` token in `text`.
///
/// Returns the full matched token and the captured inner value, or two empty strings when
/// there is no match (or `inner` is not a valid expression).
///
/// # Examples
///
/// ```
/// use logrota::variable::extract_variable;
///
/// let (token, inner) = extract_variable('%', "[a-z]+(?::[^}]*)?", "app-%{date:yyyy}.log");
/// assert_eq!(token, "%{date:yyyy}");
/// assert_eq!(inner, "date:yyyy");
/// ```
pub fn extract_variable(sigil: char, inner: &str, text: &str) -> (String, String) {
    VariablePattern::new(sigil, inner)
        .ok()
        .and_then(|pattern| {
            pattern
                .extract(text)
                .map(|(token, inner)| (token.to_string(), inner.to_string()))
        })
        .unwrap_or_default()
}

/// Split a token body `name[:arg]` at its first colon.
pub(crate) fn split_arg(inner: &str) -> (&str, Option<&str>) {
    match inner.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (inner, None),
    }
}

/// Drop line breaks and surrounding spaces.
pub(crate) fn strip_line_breaks(s: &str) -> String {
    s.replace("\r\n", "").replace('\n', "").trim_matches(' ').to_string()
}

/// User-defined substitution variables referenced as `${name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a property value as it was defined.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitute every `${name}` in `text`.
    ///
    /// Property values lose line breaks and surrounding spaces; unknown properties expand to
    /// nothing. The result is stripped the same way.
    pub fn expand(&self, text: &str) -> String {
        let expanded = PROPERTY.expand(text, |name| {
            self.get(name).map(strip_line_breaks).unwrap_or_default()
        });
        strip_line_breaks(&expanded)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (k, v) in iter {
            properties.insert(k, v);
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_token() {
        let (token, inner) = extract_variable('$', "[a-z]+", "${home}/logs/${app}.log");
        assert_eq!(token, "${home}");
        assert_eq!(inner, "home");
    }

    #[test]
    fn test_extract_without_match_is_empty() {
        let (token, inner) = extract_variable('$', "[a-z]+", "plain.log");
        assert!(token.is_empty());
        assert!(inner.is_empty());

        let (token, inner) = extract_variable('$', "(", "${x}");
        assert!(token.is_empty() && inner.is_empty());
    }

    #[test]
    fn test_system_pattern_captures_argument() {
        let (token, inner) = SYSTEM.extract("a-%{date:yyyy-mm-dd}-%{i}.log").unwrap();
        assert_eq!(token, "%{date:yyyy-mm-dd}");
        assert_eq!(split_arg(inner), ("date", Some("yyyy-mm-dd")));
        assert_eq!(split_arg("i"), ("i", None));
    }

    #[test]
    fn test_field_pattern_allows_spaces() {
        let (_, inner) = FIELD.extract("%{Time:yyyy-mm-dd HH:MM:SS.ms} x").unwrap();
        assert_eq!(inner, "Time:yyyy-mm-dd HH:MM:SS.ms");
    }

    #[test]
    fn test_properties_expand() {
        let properties: Properties = [("dir", " /var/log \n"), ("app", "svc")].into_iter().collect();
        assert_eq!(properties.expand("${dir}/${app}.log"), "/var/log/svc.log");
        assert_eq!(properties.expand("${missing}x"), "x");
        assert_eq!(properties.expand("no tokens here"), "no tokens here");
    }

    #[test]
    fn test_expand_does_not_rescan_substitutions() {
        let properties: Properties = [("a", "${a}")].into_iter().collect();
        assert_eq!(properties.expand("${a}-${a}"), "${a}-${a}");
    }

    #[test]
    fn test_identical_tokens_resolve_once() {
        let mut calls = 0;
        let out = SYSTEM.expand("%{i}-%{i}-%{j}", |_| {
            calls += 1;
            calls.to_string()
        });
        assert_eq!(out, "1-1-2");
        assert_eq!(calls, 2);
    }
}
