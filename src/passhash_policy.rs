/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The declarative policy source: an ordered key/value map with an
//! INI-like text form. Keys follow the dotted/double-underscore
//! convention (`schemes`, `default`, `sha256_crypt__rounds`,
//! `admin__sha256_crypt__rounds`); the map itself stays agnostic, the
//! context interprets the keys. Text and map round-trip losslessly.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error};
use super::passhash_common::PasshashCommon;

pub const DEFAULT_SECTION: &'static str = "passhash";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyMap
{
    entries: Vec<(String, String)>,
}

impl PolicyMap
{
    pub
    fn new() -> Self
    {
        return PolicyMap{entries: Vec::new()};
    }

    /// Sets a key, replacing an existing one in place so the order of
    /// first appearance is stable.
    pub
    fn set<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self
    {
        let key = key.as_ref();

        for entry in self.entries.iter_mut()
        {
            if entry.0.as_str() == key
            {
                entry.1 = value.as_ref().to_string();

                return self;
            }
        }

        self.entries.push((key.to_string(), value.as_ref().to_string()));

        return self;
    }

    pub
    fn get(&self, key: &str) -> Option<&str>
    {
        for (k, v) in self.entries.iter()
        {
            if k.as_str() == key
            {
                return Some(v.as_str());
            }
        }

        return None;
    }

    pub
    fn entries(&self) -> &[(String, String)]
    {
        return &self.entries;
    }

    /// A copy of self with `other`'s entries layered on top.
    pub
    fn merged_with(&self, other: &PolicyMap) -> PolicyMap
    {
        let mut out = self.clone();

        for (k, v) in other.entries.iter()
        {
            out.set(k.as_str(), v.as_str());
        }

        return out;
    }

    /// Reads one `[section]` of an INI-like text. Blank lines and
    /// `#`/`;` comments are skipped; keys repeat last-write-wins.
    ///
    /// # Throws
    ///
    /// [PasshashErrorCode::Config] on an unparseable line or a missing
    /// section.
    pub
    fn from_ini(text: &str, section: &str) -> PasshashResult<PolicyMap>
    {
        let mut map = PolicyMap::new();
        let mut in_section = false;
        let mut seen = false;

        for (lineno, raw) in text.lines().enumerate()
        {
            let line = raw.trim();

            if line.len() == 0 || line.starts_with('#') == true || line.starts_with(';') == true
            {
                continue;
            }

            if line.starts_with('[') == true
            {
                let name = match line.strip_prefix('[').and_then(|l| l.strip_suffix(']'))
                {
                    Some(n) => n.trim(),
                    None => passhash_error!(PasshashErrorCode::Config,
                        "line {}: malformed section header: '{}'",
                        lineno + 1, PasshashCommon::sanitize_str(line)),
                };

                in_section = name == section;
                seen = seen || in_section;

                continue;
            }

            if in_section == false
            {
                continue;
            }

            match line.split_once('=')
            {
                Some((k, v)) if k.trim().len() > 0 =>
                {
                    map.set(k.trim(), v.trim());
                },
                _ => passhash_error!(PasshashErrorCode::Config,
                    "line {}: expected 'key = value', found: '{}'",
                    lineno + 1, PasshashCommon::sanitize_str(line)),
            }
        }

        if seen == false
        {
            passhash_error!(PasshashErrorCode::Config, "section [{}] was not found", section);
        }

        return Ok(map);
    }

    pub
    fn to_ini(&self, section: &str) -> String
    {
        let mut out = format!("[{}]\n", section);

        for (k, v) in self.entries.iter()
        {
            out.push_str(k.as_str());
            out.push_str(" = ");
            out.push_str(v.as_str());
            out.push('\n');
        }

        return out;
    }
}

/// A policy key split into its scoping parts. The context interprets
/// the fields; the splitter only normalizes `.` to `__` and counts
/// segments.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyKey
{
    /// `schemes`, `default`, `deprecated`, `harden_verify`, ...
    Context(String),

    /// `<scheme>__<param>`, scheme possibly the `all` wildcard.
    Scheme
    {
        scheme: String,
        param: String,
    },

    /// `<category>__<scheme>__<param>` or `<category>__default`.
    Category
    {
        category: String,
        scheme: Option<String>,
        param: String,
    },
}

/// Context level keys that never carry a scope prefix.
const CONTEXT_KEYS: &'static [&'static str] =
    &["schemes", "default", "deprecated", "harden_verify", "min_verify_time", "truncate_error"];

/// Splits a raw policy key. `known_scheme` decides whether the leading
/// segment is a scheme or a category.
pub
fn split_policy_key<F>(raw: &str, known_scheme: F) -> PasshashResult<PolicyKey>
    where F: Fn(&str) -> bool
{
    let norm = raw.replace('.', "__");

    if CONTEXT_KEYS.iter().any(|k| *k == norm.as_str()) == true
    {
        return Ok(PolicyKey::Context(norm));
    }

    let segments: Vec<&str> = norm.split("__").collect();

    if segments.iter().any(|s| s.len() == 0) == true
    {
        passhash_error!(PasshashErrorCode::Config,
            "policy key: '{}' has an empty segment", PasshashCommon::sanitize_str(raw));
    }

    match segments.len()
    {
        2 =>
        {
            if known_scheme(segments[0]) == true || segments[0] == "all"
            {
                return Ok(PolicyKey::Scheme
                {
                    scheme: segments[0].to_string(),
                    param: segments[1].to_string(),
                });
            }

            // `<category>__default` selects the category's scheme
            if segments[1] == "default"
            {
                return Ok(PolicyKey::Category
                {
                    category: segments[0].to_string(),
                    scheme: None,
                    param: "default".to_string(),
                });
            }

            passhash_error!(PasshashErrorCode::Config,
                "policy key: '{}' does not name a configured scheme",
                PasshashCommon::sanitize_str(raw));
        },
        3 =>
        {
            if known_scheme(segments[1]) == false && segments[1] != "all"
            {
                passhash_error!(PasshashErrorCode::Config,
                    "policy key: '{}' does not name a configured scheme",
                    PasshashCommon::sanitize_str(raw));
            }

            return Ok(PolicyKey::Category
            {
                category: segments[0].to_string(),
                scheme: Some(segments[1].to_string()),
                param: segments[2].to_string(),
            });
        },
        _ => passhash_error!(PasshashErrorCode::Config,
            "policy key: '{}' has {} segments, expected 1..3",
            PasshashCommon::sanitize_str(raw), segments.len()),
    }
}
