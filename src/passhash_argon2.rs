/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! argon2 in its three flavors, dispatched by ident:
//! `$argon2<id|i|d>$v=<v>$m=<m>,t=<t>,p=<p>$<salt b64>$<checksum b64>`.
//! New hashes always use argon2id version 0x13; hashes without a `v=`
//! segment are read as the 0x10 layout.

use argon2::{Algorithm, Argon2, Params, Version};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::Encoding;
use super::passhash_mcf::{McfHash, parse_decimal, parse_params, require_param};
use super::passhash_hasher::*;

const B64_NOPAD_CHARS: &'static str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

pub const ARGON2_INFO: SchemeInfo = SchemeInfo
{
    name: "argon2",
    aliases: &["argon2id", "argon2i", "argon2d"],
    idents: &["argon2id", "argon2i", "argon2d"],
    setting_kwds: &["salt", "salt_size", "rounds", "memory_cost", "parallelism", "ident", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: 1048576, default_rounds: 3, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 8, max_size: 1024, default_size: 16, chars: "", raw: true}),
    checksum_size: 0,
    checksum_chars: B64_NOPAD_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

const DEFAULT_MEMORY_COST: u32 = 65536;
const DEFAULT_PARALLELISM: u32 = 4;
const CHECKSUM_BYTES: usize = 32;

struct Argon2Fields
{
    ident: String,
    version: u32,
    memory_cost: u32,
    rounds: u32,
    parallelism: u32,
    salt: Vec<u8>,
    checksum: Option<String>,
}

fn algorithm_of(ident: &str) -> PasshashResult<Algorithm>
{
    match ident
    {
        "argon2id" => return Ok(Algorithm::Argon2id),
        "argon2i" => return Ok(Algorithm::Argon2i),
        "argon2d" => return Ok(Algorithm::Argon2d),
        _ => passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to argon2", PasshashCommon::sanitize_str(ident)),
    }
}

fn version_of(v: u32, from_wire: bool) -> PasshashResult<Version>
{
    match v
    {
        0x10 => return Ok(Version::V0x10),
        0x13 => return Ok(Version::V0x13),
        _ =>
        {
            let code = if from_wire == true { PasshashErrorCode::InvalidHash } else { PasshashErrorCode::Config };

            passhash_error!(code, "argon2 version: {} is not supported", v);
        },
    }
}

fn argon2_compute(
    secret: &[u8],
    f: &Argon2Fields,
    checksum_bytes: usize,
    from_wire: bool
) -> PasshashResult<String>
{
    let code = if from_wire == true { PasshashErrorCode::InvalidHash } else { PasshashErrorCode::Config };

    let alg = algorithm_of(f.ident.as_str())?;
    let ver = version_of(f.version, from_wire)?;

    let params = Params::new(f.memory_cost, f.rounds, f.parallelism, Some(checksum_bytes))
        .map_err(|e|
            passhash_error_map!(code, "argon2 parameters m={} t={} p={} err, {}",
                f.memory_cost, f.rounds, f.parallelism, e)
        )?;

    let engine = Argon2::new(alg, ver, params);

    let mut out = vec![0_u8; checksum_bytes];

    engine.hash_password_into(secret, &f.salt, &mut out)
        .map_err(|e|
            passhash_error_map!(PasshashErrorCode::External, "argon2 core err, {}", e)
        )?;

    return Ok(Encoding::b64_encode_nopad(&out));
}

pub struct Argon2Scheme;

impl Argon2Scheme
{
    fn split(&self, hash: &str) -> PasshashResult<Argon2Fields>
    {
        let mcf = McfHash::parse(hash)?;

        algorithm_of(mcf.ident())?;

        let fields = mcf.fields();

        // the v= segment is optional in the oldest layout
        let (version, rest): (u32, &[&str]) =
            if fields.len() > 0 && fields[0].starts_with("v=") == true
            {
                let params = parse_params(fields[0])?;
                let v = parse_decimal(require_param(&params, "v")?, "version", false)?;

                (v, &fields[1..])
            }
            else
            {
                (0x10, fields)
            };

        if version != 0x10 && version != 0x13
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "argon2 version: {} is not supported", version);
        }

        let (params_f, salt_f, checksum_f) = match rest.len()
        {
            2 => (rest[0], rest[1], None),
            3 => (rest[0], rest[1], Some(rest[2])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after the version segment, expected 2..3", n),
        };

        let params = parse_params(params_f)?;

        let memory_cost = parse_decimal(require_param(&params, "m")?, "m", false)?;
        let rounds = parse_decimal(require_param(&params, "t")?, "t", false)?;
        let parallelism = parse_decimal(require_param(&params, "p")?, "p", false)?;

        if rounds == 0 || parallelism == 0 || memory_cost < 8 * parallelism
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "argon2 parameters m={} t={} p={} out of range", memory_cost, rounds, parallelism);
        }

        let salt = Encoding::b64_decode_nopad(salt_f)?;

        if salt.len() < 8
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "salt of {} bytes is below the 8 byte floor", salt.len());
        }

        let checksum = match checksum_f
        {
            None => None,
            Some(c) if c.len() == 0 => None,
            Some(c) =>
            {
                if Encoding::validate_chars(c, B64_NOPAD_CHARS) == false
                {
                    passhash_error!(PasshashErrorCode::MalformedHash,
                        "checksum char outside the base64 alphabet");
                }

                // must decode to a digest of at least 12 bytes
                let raw = Encoding::b64_decode_nopad(c)?;

                if raw.len() < 12
                {
                    passhash_error!(PasshashErrorCode::InvalidHash,
                        "checksum of {} bytes is below the 12 byte floor", raw.len());
                }

                Some(c.to_string())
            },
        };

        return Ok(Argon2Fields
        {
            ident: mcf.ident().to_string(),
            version: version,
            memory_cost: memory_cost,
            rounds: rounds,
            parallelism: parallelism,
            salt: salt,
            checksum: checksum,
        });
    }

    fn serialize(&self, f: &Argon2Fields, checksum: &str) -> String
    {
        return format!("${}$v={}$m={},t={},p={}${}${}",
            f.ident, f.version, f.memory_cost, f.rounds, f.parallelism,
            Encoding::b64_encode_nopad(&f.salt), checksum);
    }
}

impl SchemeHandler for Argon2Scheme
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &ARGON2_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let f = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: f.ident,
            rounds: Some(f.rounds),
            salt: Some(f.salt),
            checksum: f.checksum,
            memory_cost: Some(f.memory_cost),
            parallelism: Some(f.parallelism),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&ARGON2_INFO, secret, settings)?;

        let ident = match settings.ident
        {
            None => "argon2id".to_string(),
            Some(ref i) =>
            {
                if ARGON2_INFO.knows_ident(i.as_str()) == false
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "ident: '{}' is not hashable by argon2", PasshashCommon::sanitize_str(i));
                }

                i.clone()
            },
        };

        let salt = resolve_salt(&ARGON2_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(&ARGON2_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let f = Argon2Fields
        {
            ident: ident,
            version: 0x13,
            memory_cost: settings.memory_cost.unwrap_or(DEFAULT_MEMORY_COST),
            rounds: rounds,
            parallelism: settings.parallelism.unwrap_or(DEFAULT_PARALLELISM),
            salt: salt,
            checksum: None,
        };

        let checksum = argon2_compute(secret, &f, CHECKSUM_BYTES, false)?;

        return Ok(self.serialize(&f, checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(&ARGON2_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(&ARGON2_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        return Ok(format!("$argon2id$v=19$m={},t={},p={}${}$",
            settings.memory_cost.unwrap_or(DEFAULT_MEMORY_COST),
            rounds,
            settings.parallelism.unwrap_or(DEFAULT_PARALLELISM),
            Encoding::b64_encode_nopad(&salt)));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let f = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(&ARGON2_INFO, secret, &settings)?;

        let checksum_bytes = match f.checksum
        {
            Some(ref c) => Encoding::b64_decode_nopad(c.as_str())?.len(),
            None => CHECKSUM_BYTES,
        };

        let checksum = argon2_compute(secret, &f, checksum_bytes, true)?;

        return Ok(self.serialize(&f, checksum.as_str()));
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn ctx() -> ContextKwds
    {
        return ContextKwds::default();
    }

    #[test]
    fn published_argon2id_vectors()
    {
        // x/crypto argon2id vectors, 24 byte outputs
        let h = Argon2Scheme;

        let salt = Encoding::b64_encode_nopad(b"somesalt");

        let cases: &[(u32, u32, u32, &str)] = &[
            (1, 64, 1, "655ad15eac652dc59f7170a7332bf49b8469be1fdb9c28bb"),
            (2, 64, 1, "068d62b26455936aa6ebe60060b0a65870dbfa3ddf8d41f7"),
            (2, 64, 2, "350ac37222f436ccb5c0972f1ebd3bf6b958bf2071841362"),
            (3, 256, 2, "4668d30ac4187e6878eedeacf0fd83c5a0a30db2cc16ef0b"),
        ];

        for (t, m, p, hex_digest) in cases
        {
            let raw = hex::decode(hex_digest).unwrap();
            let hash = format!("$argon2id$v=19$m={},t={},p={}${}${}",
                m, t, p, salt, Encoding::b64_encode_nopad(&raw));

            assert_eq!(h.verify(b"password", hash.as_str(), &ctx()).unwrap(), true);
            assert_eq!(h.verify(b"passwore", hash.as_str(), &ctx()).unwrap(), false);
        }
    }

    #[test]
    fn fresh_hash_round_trip()
    {
        let h = Argon2Scheme;

        let mut s = HashSettings::default();
        s.rounds = Some(1);
        s.memory_cost = Some(64);
        s.parallelism = Some(1);

        let out = h.hash(b"secret", &s, &ctx()).unwrap();

        assert_eq!(out.starts_with("$argon2id$v=19$m=64,t=1,p=1$"), true);
        assert_eq!(h.verify(b"secret", out.as_str(), &ctx()).unwrap(), true);

        let parsed = h.parse(out.as_str()).unwrap();
        assert_eq!(parsed.rounds, Some(1));
        assert_eq!(parsed.memory_cost, Some(64));
        assert_eq!(parsed.salt.unwrap().len(), 16);
    }

    #[test]
    fn flavor_dispatch()
    {
        let h = Argon2Scheme;

        let mut s = HashSettings::default();
        s.rounds = Some(1);
        s.memory_cost = Some(64);
        s.parallelism = Some(1);
        s.ident = Some("argon2i".to_string());

        let out = h.hash(b"secret", &s, &ctx()).unwrap();

        assert_eq!(out.starts_with("$argon2i$v=19$"), true);
        assert_eq!(h.verify(b"secret", out.as_str(), &ctx()).unwrap(), true);

        s.ident = Some("argon2x".to_string());
        assert_eq!(h.hash(b"secret", &s, &ctx()).unwrap_err().err_code(), PasshashErrorCode::Config);
    }

    #[test]
    fn parse_classification()
    {
        let h = Argon2Scheme;

        // unsupported version identifies but refuses
        let bad = "$argon2id$v=18$m=64,t=1,p=1$c29tZXNhbHQ$c29tZXNhbHRzb21lc2FsdA";
        assert_eq!(h.identify(bad), true);
        assert_eq!(h.parse(bad).unwrap_err().err_code(), PasshashErrorCode::InvalidHash);

        // m below 8*p is a parameter violation
        let bad = "$argon2id$v=19$m=8,t=1,p=2$c29tZXNhbHQ$c29tZXNhbHRzb21lc2FsdA";
        assert_eq!(h.parse(bad).unwrap_err().err_code(), PasshashErrorCode::InvalidHash);

        // missing t= is structural
        let bad = "$argon2id$v=19$m=64,p=1$c29tZXNhbHQ$c29tZXNhbHRzb21lc2FsdA";
        assert_eq!(h.identify(bad), false);

        assert_eq!(h.identify("$argon2q$v=19$m=64,t=1,p=1$c29tZXNhbHQ$x"), false);
    }
}
