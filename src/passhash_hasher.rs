/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The uniform scheme contract. Every scheme publishes an immutable
//! [SchemeInfo] descriptor and implements [SchemeHandler]; the shared
//! behavior (settings resolution, salt generation, rounds jitter,
//! verify by recompute) lives here so a scheme only supplies its wire
//! format and checksum computation.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;

/// Hard ceiling on accepted secret length, preventing DoS through
/// multi-megabyte passwords. Applies before any scheme level truncation.
pub const MAX_SECRET_SIZE: usize = 4096;

/// How a scheme's stored work factor scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundsCost
{
    /// Stored value is the iteration count.
    Linear,

    /// Stored value is an exponent, work is 2^value.
    Log2,
}

/// Rounds envelope of a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundsInfo
{
    pub min_rounds: u32,
    pub max_rounds: u32,
    pub default_rounds: u32,
    pub cost: RoundsCost,
}

/// Salt envelope of a scheme. Sizes are characters for alphabet salts
/// and bytes for raw salts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaltInfo
{
    pub min_size: usize,
    pub max_size: usize,
    pub default_size: usize,

    /// Alphabet the salt characters are drawn from. Empty for raw
    /// binary salts.
    pub chars: &'static str,

    /// True when the salt is raw bytes stored in an encoded form.
    pub raw: bool,
}

/// An immutable hasher descriptor, created once at registration.
pub struct SchemeInfo
{
    /// Canonical identifier, e.g. `sha512_crypt`.
    pub name: &'static str,

    /// Alternate lookup spellings.
    pub aliases: &'static [&'static str],

    /// Prefix tokens identifying the wire format. First entry is the
    /// default for new hashes.
    pub idents: &'static [&'static str],

    /// Accepted keys of [HashSettings] for this scheme.
    pub setting_kwds: &'static [&'static str],

    /// Runtime only inputs not stored in the hash, e.g. `user`.
    pub context_kwds: &'static [&'static str],

    pub rounds: Option<RoundsInfo>,
    pub salt: Option<SaltInfo>,

    /// Checksum length in characters of the wire encoding; 0 when the
    /// scheme has no fixed width.
    pub checksum_size: usize,
    pub checksum_chars: &'static str,

    /// Secrets longer than this are truncated or rejected, per policy.
    pub truncate_size: Option<usize>,

    /// True when the scheme cannot represent NUL bytes in the secret.
    pub forbids_nul: bool,
}

impl SchemeInfo
{
    /// The ident for new hashes.
    pub
    fn default_ident(&self) -> &'static str
    {
        return self.idents[0];
    }

    pub
    fn knows_ident(&self, ident: &str) -> bool
    {
        return self.idents.iter().any(|i| *i == ident);
    }
}

/// Rounds jitter: a fraction of the base value or an absolute span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VaryRounds
{
    Fraction(f64),
    Absolute(u32),
}

/// Per call hash settings. Unset fields resolve through the scheme's
/// descriptor (and, inside a context, through policy overrides).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashSettings
{
    pub salt: Option<Vec<u8>>,
    pub salt_size: Option<usize>,
    pub rounds: Option<u32>,
    pub ident: Option<String>,
    pub vary_rounds: Option<VaryRounds>,
    pub truncate_error: Option<bool>,

    /// argon2 memory cost in KiB.
    pub memory_cost: Option<u32>,

    /// argon2 lanes / scrypt p.
    pub parallelism: Option<u32>,

    /// scrypt block size r.
    pub block_size: Option<u32>,
}

/// Runtime only inputs consumed by a few schemes.
#[derive(Debug, Clone, Default)]
pub struct ContextKwds
{
    pub user: Option<String>,
}

/// Normalized parse result, the common denominator the context engine
/// inspects for policy checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHash
{
    pub ident: String,
    pub rounds: Option<u32>,
    pub salt: Option<Vec<u8>>,

    /// Checksum in wire encoding; None for a config string.
    pub checksum: Option<String>,

    pub memory_cost: Option<u32>,
    pub parallelism: Option<u32>,
    pub block_size: Option<u32>,
}

impl std::fmt::Debug for dyn SchemeHandler
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("SchemeHandler").field("name", &self.info().name).finish()
    }
}

/// The capability contract every scheme implements.
pub trait SchemeHandler: Send + Sync
{
    fn info(&self) -> &'static SchemeInfo;

    /// Splits a hash (or config) string into its parameters.
    ///
    /// # Throws
    ///
    /// * [PasshashErrorCode::MalformedHash] - structurally invalid
    ///
    /// * [PasshashErrorCode::InvalidHash] - well formed, parameter out
    ///   of the accepted range
    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>;

    /// True iff the scheme can parse the string structurally. A well
    /// formed hash with out of range parameters still identifies.
    fn identify(&self, hash: &str) -> bool
    {
        match self.parse(hash)
        {
            Ok(_) => return true,
            Err(e) => return e.err_code() == PasshashErrorCode::InvalidHash,
        }
    }

    /// Produces a new hash for `secret`.
    fn hash(&self, secret: &[u8], settings: &HashSettings, ctx: &ContextKwds) -> PasshashResult<String>;

    /// Produces a salt+parameters string with an empty checksum.
    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>;

    /// Applies `secret` to a pre-built config string. Accepts a full
    /// hash as config; its checksum is ignored and recomputed.
    fn genhash(&self, secret: &[u8], config: &str, ctx: &ContextKwds) -> PasshashResult<String>;

    /// Parses the hash, recomputes the checksum with the parsed
    /// parameters and compares in constant time.
    fn verify(&self, secret: &[u8], hash: &str, ctx: &ContextKwds) -> PasshashResult<bool>
    {
        let parsed = self.parse(hash)?;

        let stored = match parsed.checksum
        {
            Some(c) => c,
            None => passhash_error!(PasshashErrorCode::MalformedHash,
                "config string has no checksum to verify against"),
        };

        let computed = self.genhash(secret, hash, ctx)?;
        let cparsed = self.parse(computed.as_str())?;

        let recomputed = cparsed.checksum
            .ok_or_else(||
                passhash_error_map!(PasshashErrorCode::External,
                    "recomputed hash has no checksum")
            )?;

        return Ok(PasshashCommon::consteq(stored.as_bytes(), recomputed.as_bytes()));
    }

    /// Scheme local staleness checks: deprecated ident variant, salt in
    /// need of repair, truncation risk for the given secret. Policy
    /// level checks live in the context.
    fn needs_update(&self, _hash: &str, _secret: Option<&[u8]>) -> bool
    {
        return false;
    }
}

/// Applies the secret size rules shared by every scheme.
///
/// # Returns
///
/// * the working prefix of the secret (truncated when the scheme does
///   so silently)
pub
fn prepare_secret<'sec>(
    info: &SchemeInfo,
    secret: &'sec [u8],
    settings: &HashSettings
) -> PasshashResult<&'sec [u8]>
{
    if secret.len() > MAX_SECRET_SIZE
    {
        passhash_error!(PasshashErrorCode::PasswordSize,
            "secret length {} exceeds the {} byte ceiling", secret.len(), MAX_SECRET_SIZE);
    }

    if info.forbids_nul == true && secret.contains(&0_u8) == true
    {
        passhash_error!(PasshashErrorCode::PasswordValue,
            "scheme {} forbids NUL bytes in the secret", info.name);
    }

    if let Some(ts) = info.truncate_size
    {
        if secret.len() > ts
        {
            if settings.truncate_error.unwrap_or(false) == true
            {
                passhash_error!(PasshashErrorCode::PasswordTruncate,
                    "secret length {} exceeds the {} byte limit of {}",
                    secret.len(), ts, info.name);
            }

            return Ok(&secret[..ts]);
        }
    }

    return Ok(secret);
}

/// Resolves the effective rounds value: explicit setting, else scheme
/// default with optional downward jitter. Explicit values outside the
/// scheme envelope raise; jitter is clamped and never goes below the
/// minimum.
pub
fn resolve_rounds(info: &SchemeInfo, settings: &HashSettings) -> PasshashResult<Option<u32>>
{
    let ri = match info.rounds
    {
        Some(r) => r,
        None =>
        {
            if settings.rounds.is_some() == true
            {
                passhash_error!(PasshashErrorCode::Config,
                    "scheme {} does not accept a rounds setting", info.name);
            }

            return Ok(None);
        },
    };

    if let Some(r) = settings.rounds
    {
        if r < ri.min_rounds || r > ri.max_rounds
        {
            passhash_error!(PasshashErrorCode::Config,
                "rounds: {} outside of range {}..{} of scheme {}",
                r, ri.min_rounds, ri.max_rounds, info.name);
        }

        return Ok(Some(r));
    }

    let base = ri.default_rounds;

    match settings.vary_rounds
    {
        None => return Ok(Some(base)),
        Some(v) => return Ok(Some(jitter_rounds(&ri, base, v)?)),
    }
}

/// Applies downward jitter to a base rounds value, clamped so the
/// result never falls below the scheme minimum.
pub
fn jitter_rounds(ri: &RoundsInfo, base: u32, vary: VaryRounds) -> PasshashResult<u32>
{
    let span = match vary
    {
        VaryRounds::Absolute(a) => a,
        VaryRounds::Fraction(f) =>
        {
            if f < 0.0 || f > 1.0
            {
                passhash_error!(PasshashErrorCode::Config,
                    "vary_rounds fraction: {} outside of 0..1", f);
            }

            (base as f64 * f).round() as u32
        },
    };

    let jitter = (PasshashCommon::random_u32()? as u64 % (span as u64 + 1)) as u32;

    return Ok(base.saturating_sub(jitter).max(ri.min_rounds));
}

/// The span a vary_rounds policy may subtract from its base, used by
/// staleness checks to avoid flagging jittered hashes.
pub
fn vary_allowance(base: u32, vary: VaryRounds) -> u32
{
    match vary
    {
        VaryRounds::Absolute(a) => return a,
        VaryRounds::Fraction(f) => return (base as f64 * f.clamp(0.0, 1.0)).round() as u32,
    }
}

/// Resolves the effective salt: an explicit salt is validated against
/// the scheme envelope, otherwise a random one of the resolved size is
/// generated.
pub
fn resolve_salt(info: &SchemeInfo, settings: &HashSettings) -> PasshashResult<Option<Vec<u8>>>
{
    let si = match info.salt
    {
        Some(s) => s,
        None =>
        {
            if settings.salt.is_some() == true || settings.salt_size.is_some() == true
            {
                passhash_error!(PasshashErrorCode::Config,
                    "scheme {} does not accept a salt setting", info.name);
            }

            return Ok(None);
        },
    };

    if let Some(ref salt) = settings.salt
    {
        if salt.len() < si.min_size || salt.len() > si.max_size
        {
            passhash_error!(PasshashErrorCode::Config,
                "salt size: {} outside of range {}..{} of scheme {}",
                salt.len(), si.min_size, si.max_size, info.name);
        }

        if si.raw == false
        {
            for b in salt
            {
                if si.chars.as_bytes().contains(b) == false
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "salt char: '{}' outside the alphabet of scheme {}",
                        PasshashCommon::sanitize_char(*b as char), info.name);
                }
            }
        }

        return Ok(Some(salt.clone()));
    }

    let size = match settings.salt_size
    {
        Some(s) =>
        {
            if s < si.min_size || s > si.max_size
            {
                passhash_error!(PasshashErrorCode::Config,
                    "salt_size: {} outside of range {}..{} of scheme {}",
                    s, si.min_size, si.max_size, info.name);
            }

            s
        },
        None => si.default_size,
    };

    if si.raw == true
    {
        return Ok(Some(PasshashCommon::random_bytes(size)?));
    }

    return Ok(Some(PasshashCommon::random_salt(size, si.chars)?));
}

/// Validates a checksum field against the scheme's width and alphabet.
pub
fn validate_checksum(info: &SchemeInfo, checksum: &str) -> PasshashResult<()>
{
    if info.checksum_size > 0 && checksum.len() != info.checksum_size
    {
        passhash_error!(PasshashErrorCode::MalformedHash,
            "checksum length: {} of scheme {}, expected {}",
            checksum.len(), info.name, info.checksum_size);
    }

    for b in checksum.bytes()
    {
        if info.checksum_chars.as_bytes().contains(&b) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "checksum char: '{}' outside the alphabet of scheme {}",
                PasshashCommon::sanitize_char(b as char), info.name);
        }
    }

    return Ok(());
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::passhash_encoding::H64_CHARS;

    const TEST_INFO: SchemeInfo = SchemeInfo
    {
        name: "test_scheme",
        aliases: &[],
        idents: &["t1", "t0"],
        setting_kwds: &["salt", "rounds"],
        context_kwds: &[],
        rounds: Some(RoundsInfo{min_rounds: 1000, max_rounds: 999999999, default_rounds: 5000, cost: RoundsCost::Linear}),
        salt: Some(SaltInfo{min_size: 0, max_size: 16, default_size: 16, chars: H64_CHARS, raw: false}),
        checksum_size: 43,
        checksum_chars: H64_CHARS,
        truncate_size: None,
        forbids_nul: false,
    };

    #[test]
    fn rounds_bounds_raise_config()
    {
        let mut s = HashSettings::default();

        s.rounds = Some(999);
        let e = resolve_rounds(&TEST_INFO, &s).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::Config);

        s.rounds = Some(1_000_000_000);
        assert_eq!(resolve_rounds(&TEST_INFO, &s).is_err(), true);

        s.rounds = Some(1000);
        assert_eq!(resolve_rounds(&TEST_INFO, &s).unwrap(), Some(1000));
    }

    #[test]
    fn vary_rounds_never_undershoots_min()
    {
        // default 5000, span 4500 would cross the 1000 floor without
        // the clamp
        let mut s = HashSettings::default();
        s.vary_rounds = Some(VaryRounds::Absolute(4500));

        for _ in 0..64
        {
            let r = resolve_rounds(&TEST_INFO, &s).unwrap().unwrap();
            assert_eq!(r >= 1000 && r <= 5000, true);
        }

        // fraction form stays within [base - base*f, base]
        s.vary_rounds = Some(VaryRounds::Fraction(0.1));

        for _ in 0..64
        {
            let r = resolve_rounds(&TEST_INFO, &s).unwrap().unwrap();
            assert_eq!(r >= 4500 && r <= 5000, true);
        }

        s.vary_rounds = Some(VaryRounds::Fraction(1.5));
        assert_eq!(resolve_rounds(&TEST_INFO, &s).is_err(), true);
    }

    #[test]
    fn explicit_rounds_skip_jitter()
    {
        let mut s = HashSettings::default();
        s.rounds = Some(7777);
        s.vary_rounds = Some(VaryRounds::Absolute(500));

        assert_eq!(resolve_rounds(&TEST_INFO, &s).unwrap(), Some(7777));
    }

    #[test]
    fn salt_validation()
    {
        let mut s = HashSettings::default();

        s.salt = Some(b"goodsalt".to_vec());
        assert_eq!(resolve_salt(&TEST_INFO, &s).unwrap().unwrap(), b"goodsalt".to_vec());

        // '!' is outside the h64 alphabet
        s.salt = Some(b"bad!salt".to_vec());
        assert_eq!(resolve_salt(&TEST_INFO, &s).unwrap_err().err_code(), PasshashErrorCode::Config);

        s.salt = Some(vec![b'a'; 17]);
        assert_eq!(resolve_salt(&TEST_INFO, &s).is_err(), true);

        s.salt = None;
        s.salt_size = Some(8);
        assert_eq!(resolve_salt(&TEST_INFO, &s).unwrap().unwrap().len(), 8);

        s.salt_size = None;
        assert_eq!(resolve_salt(&TEST_INFO, &s).unwrap().unwrap().len(), 16);
    }

    #[test]
    fn secret_ceiling()
    {
        let s = HashSettings::default();
        let big = vec![b'x'; MAX_SECRET_SIZE + 1];

        let e = prepare_secret(&TEST_INFO, &big, &s).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::PasswordSize);
    }
}
