/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The policy engine. A [CryptContext] composes an ordered scheme list
//! with defaults, deprecations and scoped parameter overrides, then
//! dispatches `hash` / `verify` / `identify` / `needs_update` /
//! `verify_and_update` over the registry handlers. Contexts are
//! immutable once constructed; [CryptContext::update] layers changes
//! into a new value.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_hasher::*;
use super::passhash_policy::{PolicyMap, PolicyKey, split_policy_key, DEFAULT_SECTION};
use super::passhash_registry::Registry;
use super::passhash_calibrate::calibrate_rounds;

/// Deprecation policy: an explicit subset, or everything except the
/// effective default.
#[derive(Debug, Clone, PartialEq)]
enum Deprecated
{
    None,
    Auto,
    List(Vec<usize>),
}

/// One scoped parameter override, parsed and validated at
/// construction.
#[derive(Debug)]
struct OverrideRec
{
    category: Option<String>,

    /// Index into the scheme list; None is the `all` wildcard.
    scheme: Option<usize>,

    param: OverrideParam,
}

#[derive(Debug)]
enum OverrideParam
{
    Rounds(u32),
    MinRounds(u32),
    MaxRounds(u32),
    SaltSize(usize),
    Ident(String),
    VaryRounds(VaryRounds),
    TruncateError(bool),
    MemoryCost(u32),
    Parallelism(u32),
    BlockSize(u32),
}

/// The override layers folded for one (scheme, category) pair.
#[derive(Default, Clone)]
struct ResolvedPolicy
{
    settings: HashSettings,
    min_rounds: Option<u32>,
    max_rounds: Option<u32>,
}

#[derive(Debug)]
pub struct CryptContext
{
    policy: PolicyMap,
    schemes: Vec<Arc<dyn SchemeHandler>>,
    names: Vec<&'static str>,
    default_index: usize,
    category_defaults: Vec<(String, usize)>,
    deprecated: Deprecated,
    overrides: Vec<OverrideRec>,
    harden_verify: bool,
    min_verify_time: Option<Duration>,
    calib_cache: Mutex<HashMap<(String, Duration), u32>>,
}

fn parse_u32(param: &str, value: &str) -> PasshashResult<u32>
{
    return u32::from_str_radix(value.trim(), 10)
        .map_err(|e|
            passhash_error_map!(PasshashErrorCode::Config,
                "{} value: '{}' err, {}", param, PasshashCommon::sanitize_str(value), e)
        );
}

fn parse_bool(param: &str, value: &str) -> PasshashResult<bool>
{
    match value.trim()
    {
        "true" | "1" | "yes" => return Ok(true),
        "false" | "0" | "no" => return Ok(false),
        v => passhash_error!(PasshashErrorCode::Config,
            "{} value: '{}' is not a boolean", param, PasshashCommon::sanitize_str(v)),
    }
}

fn parse_vary(value: &str) -> PasshashResult<VaryRounds>
{
    let v = value.trim();

    if v.contains('.') == true
    {
        let f: f64 = v.parse()
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::Config,
                    "vary_rounds value: '{}' err, {}", PasshashCommon::sanitize_str(v), e)
            )?;

        if f < 0.0 || f > 1.0
        {
            passhash_error!(PasshashErrorCode::Config,
                "vary_rounds fraction: {} outside of 0..1", f);
        }

        return Ok(VaryRounds::Fraction(f));
    }

    return Ok(VaryRounds::Absolute(parse_u32("vary_rounds", v)?));
}

fn merge_settings(base: &HashSettings, over: &HashSettings) -> HashSettings
{
    let mut out = base.clone();

    if over.salt.is_some() == true { out.salt = over.salt.clone(); }
    if over.salt_size.is_some() == true { out.salt_size = over.salt_size; }
    if over.rounds.is_some() == true { out.rounds = over.rounds; }
    if over.ident.is_some() == true { out.ident = over.ident.clone(); }
    if over.vary_rounds.is_some() == true { out.vary_rounds = over.vary_rounds; }
    if over.truncate_error.is_some() == true { out.truncate_error = over.truncate_error; }
    if over.memory_cost.is_some() == true { out.memory_cost = over.memory_cost; }
    if over.parallelism.is_some() == true { out.parallelism = over.parallelism; }
    if over.block_size.is_some() == true { out.block_size = over.block_size; }

    return out;
}

impl CryptContext
{
    /// Builds an immutable context from a declarative policy map.
    ///
    /// # Throws
    ///
    /// [PasshashErrorCode::Config] on unknown schemes, out of range
    /// parameters, or malformed keys.
    pub
    fn new(policy: PolicyMap) -> PasshashResult<Self>
    {
        let scheme_list = match policy.get("schemes")
        {
            Some(s) => s,
            None => passhash_error!(PasshashErrorCode::Config, "policy carries no 'schemes' key"),
        };

        let mut schemes: Vec<Arc<dyn SchemeHandler>> = Vec::new();
        let mut names: Vec<&'static str> = Vec::new();

        for raw in scheme_list.split(',')
        {
            let name = raw.trim();

            if name.len() == 0
            {
                passhash_error!(PasshashErrorCode::Config, "empty scheme name in 'schemes'");
            }

            let handler = Registry::get(name)
                .map_err(|e|
                    passhash_error_map!(PasshashErrorCode::Config,
                        "scheme '{}' is unusable, {}", PasshashCommon::sanitize_str(name), e)
                )?;

            if names.contains(&handler.info().name) == true
            {
                passhash_error!(PasshashErrorCode::Config,
                    "scheme '{}' listed twice", handler.info().name);
            }

            names.push(handler.info().name);
            schemes.push(handler);
        }

        let index_of = |name: &str| -> PasshashResult<usize>
        {
            let norm = name.trim().to_ascii_lowercase().replace('-', "_");

            match names.iter().position(|n| *n == norm.as_str())
            {
                Some(i) => return Ok(i),
                None => passhash_error!(PasshashErrorCode::Config,
                    "scheme '{}' is not in the configured list", PasshashCommon::sanitize_str(name)),
            }
        };

        let default_index = match policy.get("default")
        {
            Some(d) => index_of(d)?,
            None => 0,
        };

        let deprecated = match policy.get("deprecated")
        {
            None => Deprecated::None,
            Some("auto") => Deprecated::Auto,
            Some(list) =>
            {
                let mut idx = Vec::new();

                for raw in list.split(',')
                {
                    let i = index_of(raw)?;

                    if i == default_index
                    {
                        passhash_error!(PasshashErrorCode::Config,
                            "the default scheme '{}' cannot be deprecated", names[i]);
                    }

                    idx.push(i);
                }

                Deprecated::List(idx)
            },
        };

        let mut harden_verify = false;
        let mut min_verify_time = None;
        let mut category_defaults: Vec<(String, usize)> = Vec::new();
        let mut overrides: Vec<OverrideRec> = Vec::new();

        for (key, value) in policy.entries()
        {
            match key.as_str()
            {
                "schemes" | "default" | "deprecated" => continue,
                _ => {},
            }

            let split = split_policy_key(key.as_str(), |s| names.iter().any(|n| *n == s))?;

            match split
            {
                PolicyKey::Context(name) =>
                {
                    match name.as_str()
                    {
                        "harden_verify" => harden_verify = parse_bool("harden_verify", value)?,
                        "min_verify_time" =>
                            min_verify_time = Some(PasshashCommon::parse_duration(value)?),
                        "truncate_error" => overrides.push(OverrideRec
                        {
                            category: None,
                            scheme: None,
                            param: OverrideParam::TruncateError(parse_bool("truncate_error", value)?),
                        }),
                        other => passhash_error!(PasshashErrorCode::Config,
                            "unsupported context key: '{}'", other),
                    }
                },
                PolicyKey::Scheme{scheme, param} =>
                {
                    let idx = if scheme.as_str() == "all" { None } else { Some(index_of(scheme.as_str())?) };

                    overrides.push(OverrideRec
                    {
                        category: None,
                        scheme: idx,
                        param: CryptContext::parse_param(param.as_str(), value)?,
                    });
                },
                PolicyKey::Category{category, scheme: None, ..} =>
                {
                    let idx = index_of(value)?;

                    category_defaults.retain(|(c, _)| c.as_str() != category.as_str());
                    category_defaults.push((category, idx));
                },
                PolicyKey::Category{category, scheme: Some(scheme), param} =>
                {
                    let idx = if scheme.as_str() == "all" { None } else { Some(index_of(scheme.as_str())?) };

                    overrides.push(OverrideRec
                    {
                        category: Some(category),
                        scheme: idx,
                        param: CryptContext::parse_param(param.as_str(), value)?,
                    });
                },
            }
        }

        let ctx = CryptContext
        {
            policy: policy,
            schemes: schemes,
            names: names,
            default_index: default_index,
            category_defaults: category_defaults,
            deprecated: deprecated,
            overrides: overrides,
            harden_verify: harden_verify,
            min_verify_time: min_verify_time,
            calib_cache: Mutex::new(HashMap::new()),
        };

        ctx.validate_overrides()?;

        return Ok(ctx);
    }

    fn parse_param(param: &str, value: &str) -> PasshashResult<OverrideParam>
    {
        match param
        {
            "rounds" => return Ok(OverrideParam::Rounds(parse_u32(param, value)?)),
            "min_rounds" => return Ok(OverrideParam::MinRounds(parse_u32(param, value)?)),
            "max_rounds" => return Ok(OverrideParam::MaxRounds(parse_u32(param, value)?)),
            "salt_size" => return Ok(OverrideParam::SaltSize(parse_u32(param, value)? as usize)),
            "ident" => return Ok(OverrideParam::Ident(value.trim().to_string())),
            "vary_rounds" => return Ok(OverrideParam::VaryRounds(parse_vary(value)?)),
            "truncate_error" => return Ok(OverrideParam::TruncateError(parse_bool(param, value)?)),
            "memory_cost" => return Ok(OverrideParam::MemoryCost(parse_u32(param, value)?)),
            "parallelism" => return Ok(OverrideParam::Parallelism(parse_u32(param, value)?)),
            "block_size" => return Ok(OverrideParam::BlockSize(parse_u32(param, value)?)),
            other => passhash_error!(PasshashErrorCode::Config,
                "unsupported policy parameter: '{}'", PasshashCommon::sanitize_str(other)),
        }
    }

    /// Rounds overrides pinned to a concrete scheme must sit inside
    /// that scheme's envelope.
    fn validate_overrides(&self) -> PasshashResult<()>
    {
        for rec in self.overrides.iter()
        {
            let idx = match rec.scheme
            {
                Some(i) => i,
                None => continue,
            };

            let info = self.schemes[idx].info();

            if let OverrideParam::Rounds(r) = rec.param
            {
                let ri = match info.rounds
                {
                    Some(ri) => ri,
                    None => passhash_error!(PasshashErrorCode::Config,
                        "scheme {} does not accept a rounds override", info.name),
                };

                if r < ri.min_rounds || r > ri.max_rounds
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "rounds override: {} outside of range {}..{} of scheme {}",
                        r, ri.min_rounds, ri.max_rounds, info.name);
                }
            }
        }

        return Ok(());
    }

    /// Builds a context from the `[passhash]` section of an INI text.
    pub
    fn from_ini(text: &str) -> PasshashResult<Self>
    {
        return CryptContext::new(PolicyMap::from_ini(text, DEFAULT_SECTION)?);
    }

    /// Serializes the construction policy, round-trippable through
    /// [CryptContext::from_ini].
    pub
    fn to_ini(&self) -> String
    {
        return self.policy.to_ini(DEFAULT_SECTION);
    }

    pub
    fn policy(&self) -> &PolicyMap
    {
        return &self.policy;
    }

    /// A new context with `changes` layered over this context's
    /// policy. Self stays untouched.
    pub
    fn update(&self, changes: &PolicyMap) -> PasshashResult<Self>
    {
        return CryptContext::new(self.policy.merged_with(changes));
    }

    /// A fresh context rebuilt from the same policy.
    pub
    fn copy(&self) -> PasshashResult<Self>
    {
        return CryptContext::new(self.policy.clone());
    }

    /// Configured scheme names, policy order.
    pub
    fn scheme_names(&self) -> &[&'static str]
    {
        return &self.names;
    }

    fn default_index_for(&self, category: Option<&str>) -> usize
    {
        if let Some(cat) = category
        {
            for (c, idx) in self.category_defaults.iter()
            {
                if c.as_str() == cat
                {
                    return *idx;
                }
            }
        }

        return self.default_index;
    }

    /// The scheme new hashes use for the given category.
    pub
    fn default_scheme(&self, category: Option<&str>) -> &'static str
    {
        return self.names[self.default_index_for(category)];
    }

    fn index_of(&self, name: &str) -> PasshashResult<usize>
    {
        let norm = name.trim().to_ascii_lowercase().replace('-', "_");

        match self.names.iter().position(|n| *n == norm.as_str())
        {
            Some(i) => return Ok(i),
            None => passhash_error!(PasshashErrorCode::UnknownHash,
                "scheme '{}' is not configured", PasshashCommon::sanitize_str(name)),
        }
    }

    /// Folds the override layers for one scheme: global wildcard,
    /// global scheme, category wildcard, category scheme; later layers
    /// win.
    fn resolved(&self, idx: usize, category: Option<&str>) -> ResolvedPolicy
    {
        let mut rp = ResolvedPolicy::default();

        let layers: [(Option<&str>, Option<usize>); 4] =
        [
            (None, None),
            (None, Some(idx)),
            (category, None),
            (category, Some(idx)),
        ];

        for (cat, scheme) in layers
        {
            for rec in self.overrides.iter()
            {
                let cat_match = match (&rec.category, cat)
                {
                    (None, None) => true,
                    (Some(rc), Some(c)) => rc.as_str() == c,
                    _ => false,
                };

                if cat_match == false || rec.scheme != scheme
                {
                    continue;
                }

                match rec.param
                {
                    OverrideParam::Rounds(v) => rp.settings.rounds = Some(v),
                    OverrideParam::MinRounds(v) => rp.min_rounds = Some(v),
                    OverrideParam::MaxRounds(v) => rp.max_rounds = Some(v),
                    OverrideParam::SaltSize(v) => rp.settings.salt_size = Some(v),
                    OverrideParam::Ident(ref v) => rp.settings.ident = Some(v.clone()),
                    OverrideParam::VaryRounds(v) => rp.settings.vary_rounds = Some(v),
                    OverrideParam::TruncateError(v) => rp.settings.truncate_error = Some(v),
                    OverrideParam::MemoryCost(v) => rp.settings.memory_cost = Some(v),
                    OverrideParam::Parallelism(v) => rp.settings.parallelism = Some(v),
                    OverrideParam::BlockSize(v) => rp.settings.block_size = Some(v),
                }
            }
        }

        return rp;
    }

    /// Hashes with the global default scheme and policy settings.
    pub
    fn hash(&self, secret: &[u8]) -> PasshashResult<String>
    {
        return self.hash_with(secret, None, None, &HashSettings::default(), &ContextKwds::default());
    }

    /// Full dispatch: explicit scheme beats the category default beats
    /// the global default; call-site settings beat category overrides
    /// beat scheme overrides beat scheme defaults.
    pub
    fn hash_with(
        &self,
        secret: &[u8],
        scheme: Option<&str>,
        category: Option<&str>,
        kwds: &HashSettings,
        ctx: &ContextKwds
    ) -> PasshashResult<String>
    {
        let idx = match scheme
        {
            Some(name) => self.index_of(name)
                .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "{}", e))?,
            None => self.default_index_for(category),
        };

        let rp = self.resolved(idx, category);
        let mut eff = merge_settings(&rp.settings, kwds);

        // jitter applies to the policy base, never to a call-site value
        if kwds.rounds.is_none() == true
        {
            if let (Some(base), Some(vary)) = (eff.rounds, eff.vary_rounds)
            {
                if let Some(ri) = self.schemes[idx].info().rounds
                {
                    eff.rounds = Some(jitter_rounds(&ri, base, vary)?);
                }
            }
        }

        // the policy floor and ceiling bind whatever survived merging
        if let Some(r) = eff.rounds
        {
            if let Some(floor) = rp.min_rounds
            {
                if r < floor
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "rounds: {} below the policy floor {}", r, floor);
                }
            }

            if let Some(ceil) = rp.max_rounds
            {
                if r > ceil
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "rounds: {} above the policy ceiling {}", r, ceil);
                }
            }
        }

        return self.schemes[idx].hash(secret, &eff, ctx);
    }

    /// First configured scheme that identifies the hash, policy order.
    pub
    fn identify(&self, hash: &str) -> Option<&'static str>
    {
        for (i, handler) in self.schemes.iter().enumerate()
        {
            if handler.identify(hash) == true
            {
                return Some(self.names[i]);
            }
        }

        return None;
    }

    fn identify_index(&self, hash: &str) -> Option<usize>
    {
        for (i, handler) in self.schemes.iter().enumerate()
        {
            if handler.identify(hash) == true
            {
                return Some(i);
            }
        }

        return None;
    }

    /// Verifies against the identified (or explicitly named) scheme.
    ///
    /// # Throws
    ///
    /// * [PasshashErrorCode::UnknownHash] - nothing identifies the
    ///   string (after the optional harden dummy work)
    ///
    /// * parse errors of the identified scheme
    pub
    fn verify(&self, secret: &[u8], hash: &str) -> PasshashResult<bool>
    {
        return self.verify_with(secret, hash, None, None, &ContextKwds::default());
    }

    pub
    fn verify_with(
        &self,
        secret: &[u8],
        hash: &str,
        scheme: Option<&str>,
        category: Option<&str>,
        ctx: &ContextKwds
    ) -> PasshashResult<bool>
    {
        let start = Instant::now();

        let idx = match scheme
        {
            Some(name) => Some(self.index_of(name)?),
            None => self.identify_index(hash),
        };

        let outcome = match idx
        {
            Some(i) => self.schemes[i].verify(secret, hash, ctx),
            None =>
            {
                if self.harden_verify == true
                {
                    // dummy hash with the default scheme, equalizing
                    // the wall clock against the matched path
                    let rp = self.resolved(self.default_index_for(category), category);
                    let _ = self.schemes[self.default_index_for(category)]
                        .hash(secret, &rp.settings, ctx);
                }

                Err(passhash_error_map!(PasshashErrorCode::UnknownHash,
                    "no configured scheme identifies the hash"))
            },
        };

        self.pad_verify_time(start);

        return outcome;
    }

    /// Pads every verify exit up to min_verify_time, so the caller
    /// cannot tell which path ran.
    fn pad_verify_time(&self, start: Instant)
    {
        if let Some(floor) = self.min_verify_time
        {
            let elapsed = start.elapsed();

            if elapsed < floor
            {
                std::thread::sleep(floor - elapsed);
            }
        }
    }

    /// True when the stored hash should be re-hashed under the current
    /// policy.
    pub
    fn needs_update(
        &self,
        hash: &str,
        category: Option<&str>,
        secret: Option<&[u8]>
    ) -> PasshashResult<bool>
    {
        let idx = match self.identify_index(hash)
        {
            Some(i) => i,
            None => passhash_error!(PasshashErrorCode::UnknownHash,
                "no configured scheme identifies the hash"),
        };

        // any scheme other than the category default is stale. this
        // single rule IS the whole `deprecated = auto` policy, so
        // [Deprecated::Auto] needs no dispatch of its own below
        if idx != self.default_index_for(category)
        {
            return Ok(true);
        }

        // an explicit list still binds here: a category default may
        // appear in it even though the global default cannot
        if let Deprecated::List(ref list) = self.deprecated
        {
            if list.contains(&idx) == true
            {
                return Ok(true);
            }
        }

        let handler = &self.schemes[idx];

        if handler.needs_update(hash, secret) == true
        {
            return Ok(true);
        }

        // a hash that identifies but refuses to parse has parameters
        // the scheme no longer accepts
        let parsed = match handler.parse(hash)
        {
            Ok(p) => p,
            Err(_) => return Ok(true),
        };

        let rp = self.resolved(idx, category);

        if let Some(r) = parsed.rounds
        {
            let floor = match rp.min_rounds
            {
                Some(f) => Some(f),
                None =>
                {
                    match (rp.settings.rounds, rp.settings.vary_rounds)
                    {
                        (Some(base), Some(vary)) => Some(base.saturating_sub(vary_allowance(base, vary))),
                        (Some(base), None) => Some(base),
                        _ => None,
                    }
                },
            };

            if let Some(f) = floor
            {
                if r < f
                {
                    return Ok(true);
                }
            }

            if let Some(c) = rp.max_rounds
            {
                if r > c
                {
                    return Ok(true);
                }
            }
        }

        if let (Some(ref salt), Some(want)) = (&parsed.salt, rp.settings.salt_size)
        {
            if salt.len() < want
            {
                return Ok(true);
            }
        }

        return Ok(false);
    }

    /// Atomic verify plus conditional rehash. The caller persists the
    /// returned hash iff it is Some, completing an incremental
    /// upgrade.
    pub
    fn verify_and_update(
        &self,
        secret: &[u8],
        hash: &str,
        category: Option<&str>,
        ctx: &ContextKwds
    ) -> PasshashResult<(bool, Option<String>)>
    {
        let ok = self.verify_with(secret, hash, None, category, ctx)?;

        if ok == false
        {
            return Ok((false, None));
        }

        if self.needs_update(hash, category, Some(secret))? == false
        {
            return Ok((true, None));
        }

        let new_hash = self.hash_with(secret, None, category, &HashSettings::default(), ctx)?;

        return Ok((true, Some(new_hash)));
    }

    /// Calibrated rounds for a configured scheme against a target
    /// duration, memoized per context.
    pub
    fn calibrated_rounds(&self, scheme: &str, target: Duration) -> PasshashResult<u32>
    {
        let idx = self.index_of(scheme)?;
        let key = (self.names[idx].to_string(), target);

        {
            let cache = self.calib_cache.lock()
                .unwrap_or_else(|p| p.into_inner());

            if let Some(r) = cache.get(&key)
            {
                return Ok(*r);
            }
        }

        let rounds = calibrate_rounds(&self.schemes[idx], target)?;

        let mut cache = self.calib_cache.lock()
            .unwrap_or_else(|p| p.into_inner());

        cache.insert(key, rounds);

        return Ok(rounds);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn upgrade_policy() -> PolicyMap
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt");
        p.set("default", "sha256_crypt");
        p.set("deprecated", "md5_crypt");
        p.set("sha256_crypt__rounds", "1000");

        return p;
    }

    #[test]
    fn construction_failures()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, no_such_scheme");
        assert_eq!(CryptContext::new(p).unwrap_err().err_code(), PasshashErrorCode::Config);

        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt");
        p.set("default", "md5_crypt");
        assert_eq!(CryptContext::new(p).is_err(), true);

        // deprecating the default is a configuration error
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt");
        p.set("deprecated", "sha256_crypt");
        assert_eq!(CryptContext::new(p).is_err(), true);

        // out of envelope rounds override
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt");
        p.set("sha256_crypt__rounds", "10");
        assert_eq!(CryptContext::new(p).is_err(), true);

        // unknown parameter
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt");
        p.set("sha256_crypt__color", "red");
        assert_eq!(CryptContext::new(p).is_err(), true);
    }

    #[test]
    fn context_invariants_after_hashing()
    {
        let ctx = CryptContext::new(upgrade_policy()).unwrap();

        let h = ctx.hash(b"squeamish ossifrage").unwrap();

        assert_eq!(ctx.identify(h.as_str()), Some("sha256_crypt"));
        assert_eq!(ctx.verify(b"squeamish ossifrage", h.as_str()).unwrap(), true);
        assert_eq!(ctx.verify(b"wrong", h.as_str()).unwrap(), false);
        assert_eq!(ctx.needs_update(h.as_str(), None, None).unwrap(), false);
    }

    #[test]
    fn deprecated_scheme_upgrade_flow()
    {
        let ctx = CryptContext::new(upgrade_policy()).unwrap();

        // a stored legacy hash of "abc"
        let md5 = Registry::get("md5_crypt").unwrap();
        let legacy = md5.hash(b"abc", &HashSettings::default(), &ContextKwds::default()).unwrap();

        assert_eq!(ctx.identify(legacy.as_str()), Some("md5_crypt"));
        assert_eq!(ctx.needs_update(legacy.as_str(), None, None).unwrap(), true);

        let (ok, new_hash) = ctx.verify_and_update(b"abc", legacy.as_str(), None,
            &ContextKwds::default()).unwrap();

        assert_eq!(ok, true);

        let new_hash = new_hash.unwrap();
        assert_eq!(ctx.identify(new_hash.as_str()), Some("sha256_crypt"));
        assert_eq!(ctx.needs_update(new_hash.as_str(), None, None).unwrap(), false);

        // wrong secret never yields a replacement hash
        let (ok, new_hash) = ctx.verify_and_update(b"nope", legacy.as_str(), None,
            &ContextKwds::default()).unwrap();

        assert_eq!(ok, false);
        assert_eq!(new_hash.is_none(), true);
    }

    #[test]
    fn category_overrides()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt");
        p.set("sha256_crypt__rounds", "29000");
        p.set("admin__sha256_crypt__rounds", "40000");

        let ctx = CryptContext::new(p).unwrap();

        let plain = ctx.hash_with(b"x", None, None,
            &HashSettings::default(), &ContextKwds::default()).unwrap();
        let admin = ctx.hash_with(b"x", None, Some("admin"),
            &HashSettings::default(), &ContextKwds::default()).unwrap();

        let handler = Registry::get("sha256_crypt").unwrap();
        assert_eq!(handler.parse(plain.as_str()).unwrap().rounds, Some(29000));
        assert_eq!(handler.parse(admin.as_str()).unwrap().rounds, Some(40000));

        // an admin-era hash drops below par for the admin category only
        assert_eq!(ctx.needs_update(plain.as_str(), Some("admin"), None).unwrap(), true);
        assert_eq!(ctx.needs_update(plain.as_str(), None, None).unwrap(), false);
        assert_eq!(ctx.needs_update(admin.as_str(), Some("admin"), None).unwrap(), false);
    }

    #[test]
    fn category_default_scheme()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt");
        p.set("default", "sha256_crypt");
        p.set("legacy__default", "md5_crypt");

        let ctx = CryptContext::new(p).unwrap();

        assert_eq!(ctx.default_scheme(None), "sha256_crypt");
        assert_eq!(ctx.default_scheme(Some("legacy")), "md5_crypt");

        let h = ctx.hash_with(b"x", None, Some("legacy"),
            &HashSettings::default(), &ContextKwds::default()).unwrap();
        assert_eq!(ctx.identify(h.as_str()), Some("md5_crypt"));

        // under the legacy category the md5 hash is current
        assert_eq!(ctx.needs_update(h.as_str(), Some("legacy"), None).unwrap(), false);
        assert_eq!(ctx.needs_update(h.as_str(), None, None).unwrap(), true);
    }

    #[test]
    fn deprecated_auto()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt, hex_sha1");
        p.set("default", "sha256_crypt");
        p.set("deprecated", "auto");
        p.set("sha256_crypt__rounds", "1000");

        let ctx = CryptContext::new(p).unwrap();

        let h = ctx.hash(b"pw").unwrap();
        assert_eq!(ctx.needs_update(h.as_str(), None, None).unwrap(), false);

        let md5 = Registry::get("md5_crypt").unwrap();
        let legacy = md5.hash(b"pw", &HashSettings::default(), &ContextKwds::default()).unwrap();
        assert_eq!(ctx.needs_update(legacy.as_str(), None, None).unwrap(), true);
    }

    #[test]
    fn deprecated_list_binds_a_category_default()
    {
        // a category may keep a deprecated scheme as its default; the
        // list still flags its hashes for upgrade
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt");
        p.set("default", "sha256_crypt");
        p.set("deprecated", "md5_crypt");
        p.set("legacy__default", "md5_crypt");
        p.set("sha256_crypt__rounds", "1000");

        let ctx = CryptContext::new(p).unwrap();

        let h = ctx.hash_with(b"pw", None, Some("legacy"),
            &HashSettings::default(), &ContextKwds::default()).unwrap();

        assert_eq!(ctx.identify(h.as_str()), Some("md5_crypt"));
        assert_eq!(ctx.needs_update(h.as_str(), Some("legacy"), None).unwrap(), true);
    }

    #[test]
    fn unknown_hash_behavior()
    {
        let ctx = CryptContext::new(upgrade_policy()).unwrap();

        assert_eq!(ctx.identify("not-a-hash"), None);

        let e = ctx.verify(b"x", "not-a-hash").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::UnknownHash);

        let e = ctx.needs_update("not-a-hash", None, None).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::UnknownHash);
    }

    #[test]
    fn min_verify_time_pads_every_path()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "hex_sha1");
        p.set("min_verify_time", "50ms");
        p.set("harden_verify", "true");

        let ctx = CryptContext::new(p).unwrap();

        let h = ctx.hash(b"pw").unwrap();

        let start = Instant::now();
        assert_eq!(ctx.verify(b"pw", h.as_str()).unwrap(), true);
        assert_eq!(start.elapsed() >= Duration::from_millis(50), true);

        let start = Instant::now();
        assert_eq!(ctx.verify(b"wrong", h.as_str()).unwrap(), false);
        assert_eq!(start.elapsed() >= Duration::from_millis(50), true);

        let start = Instant::now();
        assert_eq!(ctx.verify(b"pw", "$nonsense$").is_err(), true);
        assert_eq!(start.elapsed() >= Duration::from_millis(50), true);
    }

    #[test]
    fn update_returns_a_new_context()
    {
        let ctx = CryptContext::new(upgrade_policy()).unwrap();

        let mut changes = PolicyMap::new();
        changes.set("sha256_crypt__rounds", "2000");

        let ctx2 = ctx.update(&changes).unwrap();

        let h1 = ctx.hash(b"x").unwrap();
        let h2 = ctx2.hash(b"x").unwrap();

        let handler = Registry::get("sha256_crypt").unwrap();
        assert_eq!(handler.parse(h1.as_str()).unwrap().rounds, Some(1000));
        assert_eq!(handler.parse(h2.as_str()).unwrap().rounds, Some(2000));

        // the old context hash now falls below the new policy
        assert_eq!(ctx2.needs_update(h1.as_str(), None, None).unwrap(), true);
    }

    #[test]
    fn ini_round_trip_context()
    {
        let text = "\
[passhash]
schemes = sha256_crypt, md5_crypt
default = sha256_crypt
deprecated = md5_crypt
sha256_crypt__rounds = 1000
admin__sha256_crypt__rounds = 2000
";

        let ctx = CryptContext::from_ini(text).unwrap();
        let again = CryptContext::from_ini(ctx.to_ini().as_str()).unwrap();

        assert_eq!(again.policy(), ctx.policy());
        assert_eq!(again.scheme_names(), ctx.scheme_names());
    }

    #[test]
    fn explicit_scheme_and_vary_rounds()
    {
        let mut p = PolicyMap::new();
        p.set("schemes", "sha256_crypt, md5_crypt");
        p.set("sha256_crypt__rounds", "2000");
        p.set("sha256_crypt__vary_rounds", "500");

        let ctx = CryptContext::new(p).unwrap();

        let handler = Registry::get("sha256_crypt").unwrap();

        for _ in 0..16
        {
            let h = ctx.hash(b"x").unwrap();
            let r = handler.parse(h.as_str()).unwrap().rounds.unwrap();

            assert_eq!(r >= 1500 && r <= 2000, true);

            // jittered hashes stay current
            assert_eq!(ctx.needs_update(h.as_str(), None, None).unwrap(), false);
        }

        // explicit scheme dispatch
        let h = ctx.hash_with(b"x", Some("md5_crypt"), None,
            &HashSettings::default(), &ContextKwds::default()).unwrap();
        assert_eq!(ctx.identify(h.as_str()), Some("md5_crypt"));

        // call-site rounds beat the policy and skip jitter
        let mut kwds = HashSettings::default();
        kwds.rounds = Some(3000);
        let h = ctx.hash_with(b"x", None, None, &kwds, &ContextKwds::default()).unwrap();
        assert_eq!(handler.parse(h.as_str()).unwrap().rounds, Some(3000));
    }
}
