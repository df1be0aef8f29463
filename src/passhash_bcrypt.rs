/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The bcrypt family.
//!
//! `bcrypt`: `$2<variant>$<cc>$<22 salt><31 checksum>` with a zero
//! padded two digit log2 cost. Variants `2b` (default), `2a`, `2y` are
//! supported; `2` and `2x` are recognized but refused. Salts whose 4
//! unused trailing bits are set get repaired to the canonical `.Oeu`
//! form on parse, matching the historical repair behavior.
//!
//! `bcrypt_sha256`: the composed scheme lifting the 72 byte limit,
//! v2 wire format `$bcrypt-sha256$v=2,t=2b,r=<cost>$<salt>$<checksum>`.
//! The secret is HMAC-SHA256 keyed by the salt string, base64 encoded,
//! then run through bcrypt. v1 hashes (`$bcrypt-sha256$2a,5$...`, plain
//! SHA-256 pre-digest) verify but are flagged for upgrade.

use bcrypt::Version;

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::{Encoding, BCRYPT64_CHARS};
use super::passhash_mcf::{McfHash, parse_decimal, parse_params, require_param};
use super::passhash_hasher::*;
use super::passhash_hashing::{Pbkdf2Digest, digest_bytes, hmac_digest};

pub const BCRYPT_INFO: SchemeInfo = SchemeInfo
{
    name: "bcrypt",
    aliases: &[],
    idents: &["2b", "2a", "2y"],
    setting_kwds: &["salt", "rounds", "ident", "vary_rounds", "truncate_error"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 4, max_rounds: 31, default_rounds: 12, cost: RoundsCost::Log2}),
    salt: Some(SaltInfo{min_size: 22, max_size: 22, default_size: 22, chars: BCRYPT64_CHARS, raw: false}),
    checksum_size: 31,
    checksum_chars: BCRYPT64_CHARS,
    truncate_size: Some(72),
    forbids_nul: true,
};

pub const BCRYPT_SHA256_INFO: SchemeInfo = SchemeInfo
{
    name: "bcrypt_sha256",
    aliases: &["bcrypt-sha256"],
    idents: &["bcrypt-sha256"],
    setting_kwds: &["salt", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 4, max_rounds: 31, default_rounds: 12, cost: RoundsCost::Log2}),
    salt: Some(SaltInfo{min_size: 22, max_size: 22, default_size: 22, chars: BCRYPT64_CHARS, raw: false}),
    checksum_size: 31,
    checksum_chars: BCRYPT64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

/// Idents the parser recognizes; the last two never hash or verify.
const KNOWN_VARIANTS: &'static [&'static str] = &["2b", "2a", "2y", "2x", "2"];

struct BcryptFields
{
    ident: String,
    cost: u32,
    salt: String,
    salt_repaired: bool,
    checksum: Option<String>,
}

/// Computes the 31 char bcrypt checksum through the block cipher core.
/// `ident` only decides the output prefix, the digest is variant
/// independent for the supported set.
fn bcrypt_compute(secret: &[u8], salt: &str, cost: u32) -> PasshashResult<String>
{
    let raw_salt = Encoding::bcrypt64_decode(salt)?;

    if raw_salt.len() != 16
    {
        passhash_error!(PasshashErrorCode::MalformedHash,
            "bcrypt salt decoded to {} bytes, expected 16", raw_salt.len());
    }

    let mut salt16 = [0_u8; 16];
    salt16.copy_from_slice(&raw_salt);

    let parts = bcrypt::hash_with_salt(secret, cost, salt16)
        .map_err(|e|
            passhash_error_map!(PasshashErrorCode::External, "bcrypt core err, {}", e)
        )?;

    let formatted = parts.format_for_version(Version::TwoB);

    // "$2b$<cc>$<22 salt><31 checksum>" - keep the checksum only
    let checksum = formatted[formatted.len() - 31..].to_string();

    return Ok(checksum);
}

fn serialize_bcrypt(ident: &str, cost: u32, salt: &str, checksum: &str) -> String
{
    return format!("${}${:02}${}{}", ident, cost, salt, checksum);
}

pub struct Bcrypt;

impl Bcrypt
{
    fn split(&self, hash: &str) -> PasshashResult<BcryptFields>
    {
        let mcf = McfHash::parse(hash)?;

        if KNOWN_VARIANTS.iter().any(|v| *v == mcf.ident()) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to bcrypt", PasshashCommon::sanitize_str(mcf.ident()));
        }

        if BCRYPT_INFO.knows_ident(mcf.ident()) == false
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "bcrypt variant '{}' is recognized but not supported", mcf.ident());
        }

        let mcf_fields = mcf.fields();

        if mcf_fields.len() != 2
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 2", mcf_fields.len());
        }

        // the cost segment is always zero padded to two digits
        if mcf_fields[0].len() != 2
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "cost field: '{}' is not 2 digits", PasshashCommon::sanitize_str(mcf_fields[0]));
        }

        let cost = parse_decimal(mcf_fields[0], "cost", true)?;

        if cost < 4 || cost > 31
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "cost: {} outside of range 4..31", cost);
        }

        let body = mcf_fields[1];

        let (salt, checksum) = match body.len()
        {
            22 => (body, None),
            53 => (&body[..22], Some(&body[22..])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "salt+checksum length: {}, expected 22 or 53", n),
        };

        if Encoding::validate_chars(salt, BCRYPT64_CHARS) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "bcrypt salt char outside alphabet");
        }

        let (salt, repaired) = Encoding::bcrypt64_repair_salt(salt)?;

        let checksum = match checksum
        {
            None => None,
            Some(c) =>
            {
                validate_checksum(&BCRYPT_INFO, c)?;

                Some(c.to_string())
            },
        };

        return Ok(BcryptFields
        {
            ident: mcf.ident().to_string(),
            cost: cost,
            salt: salt,
            salt_repaired: repaired,
            checksum: checksum,
        });
    }
}

impl SchemeHandler for Bcrypt
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &BCRYPT_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let f = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: f.ident,
            rounds: Some(f.cost),
            salt: Some(f.salt.into_bytes()),
            checksum: f.checksum,
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&BCRYPT_INFO, secret, settings)?;

        let ident = match settings.ident
        {
            None => "2b".to_string(),
            Some(ref i) =>
            {
                if BCRYPT_INFO.knows_ident(i.as_str()) == false
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "ident: '{}' is not hashable by bcrypt", PasshashCommon::sanitize_str(i));
                }

                i.clone()
            },
        };

        let cost = resolve_rounds(&BCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let salt = match settings.salt
        {
            Some(ref s) =>
            {
                let chars = String::from_utf8(s.clone())
                    .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "salt not utf8, {}", e))?;

                if chars.len() != 22 || Encoding::validate_chars(chars.as_str(), BCRYPT64_CHARS) == false
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "bcrypt salt must be 22 chars of its base64 alphabet");
                }

                let (repaired, _) = Encoding::bcrypt64_repair_salt(chars.as_str())?;

                repaired
            },
            None => Encoding::bcrypt64_encode(&PasshashCommon::random_bytes(16)?),
        };

        let checksum = bcrypt_compute(secret, salt.as_str(), cost)?;

        return Ok(serialize_bcrypt(ident.as_str(), cost, salt.as_str(), checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let cost = resolve_rounds(&BCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let salt = match settings.salt
        {
            Some(ref s) =>
            {
                let chars = String::from_utf8(s.clone())
                    .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "salt not utf8, {}", e))?;

                let (repaired, _) = Encoding::bcrypt64_repair_salt(chars.as_str())?;

                repaired
            },
            None => Encoding::bcrypt64_encode(&PasshashCommon::random_bytes(16)?),
        };

        return Ok(format!("$2b${:02}${}", cost, salt));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let f = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(&BCRYPT_INFO, secret, &settings)?;

        let checksum = bcrypt_compute(secret, f.salt.as_str(), f.cost)?;

        return Ok(serialize_bcrypt(f.ident.as_str(), f.cost, f.salt.as_str(), checksum.as_str()));
    }

    fn needs_update(&self, hash: &str, secret: Option<&[u8]>) -> bool
    {
        let f = match self.split(hash)
        {
            Ok(f) => f,
            Err(_) => return false,
        };

        // upgrade everything to the 2b variant
        if f.ident.as_str() != "2b"
        {
            return true;
        }

        if f.salt_repaired == true
        {
            return true;
        }

        if let Some(s) = secret
        {
            if s.len() > 72
            {
                return true;
            }
        }

        return false;
    }
}

/// Re-serializes a bcrypt hash with its salt padding repaired. Strings
/// that are not bcrypt hashes come back unchanged.
pub
fn normhash(hash: &str) -> String
{
    let b = Bcrypt;

    match b.split(hash)
    {
        Ok(f) =>
        {
            match f.checksum
            {
                Some(c) => return serialize_bcrypt(f.ident.as_str(), f.cost, f.salt.as_str(), c.as_str()),
                None => return format!("${}${:02}${}", f.ident, f.cost, f.salt),
            }
        },
        Err(_) => return hash.to_string(),
    }
}

/// bcrypt-sha256 wire versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BcryptSha256Version
{
    V1,
    V2,
}

struct BcryptSha256Fields
{
    version: BcryptSha256Version,
    variant: String,
    cost: u32,
    salt: String,
    checksum: Option<String>,
}

pub struct BcryptSha256;

impl BcryptSha256
{
    fn split(&self, hash: &str) -> PasshashResult<BcryptSha256Fields>
    {
        let mcf = McfHash::parse(hash)?;

        if mcf.ident() != "bcrypt-sha256"
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to bcrypt_sha256", PasshashCommon::sanitize_str(mcf.ident()));
        }

        let fields = mcf.fields();

        if fields.len() != 2 && fields.len() != 3
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 2..3", fields.len());
        }

        let (version, variant, cost) =
            if fields[0].starts_with("v=") == true
            {
                let params = parse_params(fields[0])?;

                let v = parse_decimal(require_param(&params, "v")?, "version", false)?;
                let t = require_param(&params, "t")?;
                let r = parse_decimal(require_param(&params, "r")?, "rounds", false)?;

                if v != 2
                {
                    passhash_error!(PasshashErrorCode::InvalidHash,
                        "bcrypt_sha256 version: {} is not supported", v);
                }

                if t != "2b"
                {
                    passhash_error!(PasshashErrorCode::InvalidHash,
                        "bcrypt variant '{}' is not supported by the v2 format",
                        PasshashCommon::sanitize_str(t));
                }

                (BcryptSha256Version::V2, t.to_string(), r)
            }
            else
            {
                let (t, r) = match fields[0].split_once(',')
                {
                    Some(p) => p,
                    None => passhash_error!(PasshashErrorCode::MalformedHash,
                        "expected '<variant>,<cost>' in: '{}'",
                        PasshashCommon::sanitize_str(fields[0])),
                };

                if t != "2a" && t != "2b"
                {
                    passhash_error!(PasshashErrorCode::InvalidHash,
                        "bcrypt variant '{}' is not supported by the v1 format",
                        PasshashCommon::sanitize_str(t));
                }

                (BcryptSha256Version::V1, t.to_string(), parse_decimal(r, "cost", false)?)
            };

        if cost < 4 || cost > 31
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "cost: {} outside of range 4..31", cost);
        }

        let salt = fields[1];

        if salt.len() != 22 || Encoding::validate_chars(salt, BCRYPT64_CHARS) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "bcrypt_sha256 salt must be 22 chars of the bcrypt alphabet");
        }

        let checksum = match fields.get(2)
        {
            None => None,
            Some(c) if c.len() == 0 => passhash_error!(PasshashErrorCode::MalformedHash,
                "empty checksum field"),
            Some(c) =>
            {
                validate_checksum(&BCRYPT_SHA256_INFO, c)?;

                Some(c.to_string())
            },
        };

        let (salt, _) = Encoding::bcrypt64_repair_salt(salt)?;

        return Ok(BcryptSha256Fields
        {
            version: version,
            variant: variant,
            cost: cost,
            salt: salt,
            checksum: checksum,
        });
    }

    /// The pre-digest that lifts bcrypt's 72 byte limit.
    fn prehash(&self, version: BcryptSha256Version, salt: &str, secret: &[u8]) -> PasshashResult<Vec<u8>>
    {
        let digest = match version
        {
            // v2 keys an HMAC with the salt string
            BcryptSha256Version::V2 => hmac_digest(Pbkdf2Digest::Sha256, salt.as_bytes(), secret)?,
            BcryptSha256Version::V1 => digest_bytes(Pbkdf2Digest::Sha256, secret),
        };

        return Ok(Encoding::b64_encode(&digest).into_bytes());
    }

    fn serialize(&self, f: &BcryptSha256Fields, checksum: &str) -> String
    {
        match f.version
        {
            BcryptSha256Version::V2 =>
                return format!("$bcrypt-sha256$v=2,t={},r={}${}${}", f.variant, f.cost, f.salt, checksum),
            BcryptSha256Version::V1 =>
                return format!("$bcrypt-sha256${},{}${}${}", f.variant, f.cost, f.salt, checksum),
        }
    }
}

impl SchemeHandler for BcryptSha256
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &BCRYPT_SHA256_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let f = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: f.variant,
            rounds: Some(f.cost),
            salt: Some(f.salt.into_bytes()),
            checksum: f.checksum,
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&BCRYPT_SHA256_INFO, secret, settings)?;

        let cost = resolve_rounds(&BCRYPT_SHA256_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let salt = match settings.salt
        {
            Some(ref s) =>
            {
                let chars = String::from_utf8(s.clone())
                    .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "salt not utf8, {}", e))?;

                if chars.len() != 22 || Encoding::validate_chars(chars.as_str(), BCRYPT64_CHARS) == false
                {
                    passhash_error!(PasshashErrorCode::Config,
                        "bcrypt_sha256 salt must be 22 chars of the bcrypt alphabet");
                }

                let (repaired, _) = Encoding::bcrypt64_repair_salt(chars.as_str())?;

                repaired
            },
            None => Encoding::bcrypt64_encode(&PasshashCommon::random_bytes(16)?),
        };

        let f = BcryptSha256Fields
        {
            version: BcryptSha256Version::V2,
            variant: "2b".to_string(),
            cost: cost,
            salt: salt,
            checksum: None,
        };

        let key = self.prehash(f.version, f.salt.as_str(), secret)?;
        let checksum = bcrypt_compute(&key, f.salt.as_str(), f.cost)?;

        return Ok(self.serialize(&f, checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let cost = resolve_rounds(&BCRYPT_SHA256_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let salt = Encoding::bcrypt64_encode(&PasshashCommon::random_bytes(16)?);

        return Ok(format!("$bcrypt-sha256$v=2,t=2b,r={}${}", cost, salt));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let f = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(&BCRYPT_SHA256_INFO, secret, &settings)?;

        let key = self.prehash(f.version, f.salt.as_str(), secret)?;
        let checksum = bcrypt_compute(&key, f.salt.as_str(), f.cost)?;

        return Ok(self.serialize(&f, checksum.as_str()));
    }

    fn needs_update(&self, hash: &str, _secret: Option<&[u8]>) -> bool
    {
        match self.split(hash)
        {
            Ok(f) => return f.version == BcryptSha256Version::V1,
            Err(_) => return false,
        }
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
    fn openwall_vectors()
    {
        let h = Bcrypt;

        // published crypt v1.2 vectors at cost 5
        assert_eq!(h.verify(b"U*U",
            "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW", &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"U*U*",
            "$2a$05$CCCCCCCCCCCCCCCCCCCCC.VGOzA784oUp/Z0DY336zx7pLYAy0lwK", &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"U*U*U",
            "$2a$05$XXXXXXXXXXXXXXXXXXXXXOAcXxm9kjPGEMsLznoKqmqw7tc8WCx4a", &ctx()).unwrap(), true);

        // wrong secret
        assert_eq!(h.verify(b"U*U*",
            "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW", &ctx()).unwrap(), false);
    }

    #[test]
    fn truncation_at_72_bytes()
    {
        let h = Bcrypt;

        let long = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ\
                    0123456789chars after 72 are ignored";

        let hash = "$2a$05$abcdefghijklmnopqrstuu5s2v8.iXieOjg/.AySBTTZIIVFJeBui";
        assert_eq!(h.verify(long.as_bytes(), hash, &ctx()).unwrap(), true);

        // the 72 byte prefix collides, as documented
        assert_eq!(h.verify(&long.as_bytes()[..72], hash, &ctx()).unwrap(), true);

        // truncate_error turns the silent cut into a refusal
        let mut s = HashSettings::default();
        s.truncate_error = Some(true);
        s.rounds = Some(5);

        let e = h.hash(long.as_bytes(), &s, &ctx()).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::PasswordTruncate);
    }

    #[test]
    fn salt_padding_repair()
    {
        let h = Bcrypt;

        // bad padding ('c' in the final salt slot) verifies like the
        // repaired form
        let bad  = "$2a$04$yjDgE74RJkeqC0/1NheSScrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS";
        let good = "$2a$04$yjDgE74RJkeqC0/1NheSSOrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS";

        assert_eq!(h.verify(b"test", bad, &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"test", good, &ctx()).unwrap(), true);

        assert_eq!(normhash(bad), good.to_string());
        assert_eq!(normhash(good), good.to_string());
        assert_eq!(normhash("$md5$abc").as_str(), "$md5$abc");
    }

    #[test]
    fn needs_update_rules()
    {
        let h = Bcrypt;

        // 2a flags for the 2b upgrade
        assert_eq!(h.needs_update("$2a$04$yjDgE74RJkeqC0/1NheSSOrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS", None), true);

        // 2b with set padding bits flags for repair
        assert_eq!(h.needs_update("$2b$04$yjDgE74RJkeqC0/1NheSScrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS", None), true);

        // canonical 2b is current
        assert_eq!(h.needs_update("$2b$04$yjDgE74RJkeqC0/1NheSSOrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS", None), false);

        // truncation risk with the secret in hand
        let long = vec![b'a'; 80];
        assert_eq!(h.needs_update("$2b$04$yjDgE74RJkeqC0/1NheSSOrvKeu9IbKDpcQf/Ox3qsrRS/Kw42qIS",
            Some(&long)), true);
    }

    #[test]
    fn parse_classification()
    {
        let h = Bcrypt;

        // invalid minor versions do not identify
        assert_eq!(h.identify("$2f$12$EXRkfkdmXnagzds2SSitu.MW9.gAVqa9eLS1//RYtYCmB1eLHg.9q"), false);
        assert_eq!(h.identify("$2`$12$EXRkfkdmXnagzds2SSitu.MW9.gAVqa9eLS1//RYtYCmB1eLHg.9q"), false);

        // bad char inside the salt does not identify
        assert_eq!(h.identify("$2a$12$EXRkfkdmXn!gzds2SSitu.MW9.gAVqa9eLS1//RYtYCmB1eLHg.9q"), false);

        // unpadded cost does not identify
        assert_eq!(h.identify("$2a$6$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s."), false);

        // recognized but unsupported variants identify and refuse
        assert_eq!(h.identify("$2x$12$EXRkfkdmXnagzds2SSitu.MW9.gAVqa9eLS1//RYtYCmB1eLHg.9q"), true);
        let e = h.parse("$2x$12$EXRkfkdmXnagzds2SSitu.MW9.gAVqa9eLS1//RYtYCmB1eLHg.9q").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::InvalidHash);

        // NUL in the secret is refused
        let e = h.hash(b"a\0b", &HashSettings::default(), &ctx()).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::PasswordValue);
    }

    #[test]
    fn fresh_hash_round_trip()
    {
        let h = Bcrypt;

        let mut s = HashSettings::default();
        s.rounds = Some(4);

        let out = h.hash(b"bob", &s, &ctx()).unwrap();

        assert_eq!(out.starts_with("$2b$04$"), true);
        assert_eq!(out.len(), 60);
        assert_eq!(h.verify(b"bob", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.needs_update(out.as_str(), None), false);

        // the salt generator never emits set padding bits
        let parsed = h.parse(out.as_str()).unwrap();
        let salt = parsed.salt.unwrap();
        assert_eq!(b".Oeu".contains(&salt[21]), true);
    }

    #[test]
    fn bcrypt_sha256_v2_vectors()
    {
        let h = BcryptSha256;

        // the pre-digest hands bcrypt a 44 byte key even for an empty
        // secret, so the empty vector verifies like any other
        assert_eq!(h.verify(b"",
            "$bcrypt-sha256$v=2,t=2b,r=5$E/e/2AOhqM5W/KJTFQzLce$WFPIZKtDDTriqWwlmRFfHiOTeheAZWe",
            &ctx()).unwrap(), true);
        assert_eq!(h.verify(b" ",
            "$bcrypt-sha256$v=2,t=2b,r=5$E/e/2AOhqM5W/KJTFQzLce$WFPIZKtDDTriqWwlmRFfHiOTeheAZWe",
            &ctx()).unwrap(), false);

        assert_eq!(h.verify(b"password",
            "$bcrypt-sha256$v=2,t=2b,r=5$5Hg1DKFqPE8C2aflZ5vVoe$wOK1VFFtS8IGTrGa7.h5fs0u84qyPbS",
            &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"password!",
            "$bcrypt-sha256$v=2,t=2b,r=5$5Hg1DKFqPE8C2aflZ5vVoe$wOK1VFFtS8IGTrGa7.h5fs0u84qyPbS",
            &ctx()).unwrap(), false);

        // genhash against a config string reproduces the vector
        let out = h.genhash(b"password", "$bcrypt-sha256$v=2,t=2b,r=5$5Hg1DKFqPE8C2aflZ5vVoe", &ctx()).unwrap();
        assert_eq!(out.as_str(),
            "$bcrypt-sha256$v=2,t=2b,r=5$5Hg1DKFqPE8C2aflZ5vVoe$wOK1VFFtS8IGTrGa7.h5fs0u84qyPbS");
    }

    #[test]
    fn bcrypt_sha256_lifts_truncation()
    {
        let h = BcryptSha256;

        // secrets differing after byte 72 hash differently
        let base = "abc123".repeat(12);

        let mut a = base.clone();
        a.push_str("qwr");
        let mut b = base.clone();
        b.push_str("xyz");

        assert_eq!(h.verify(a.as_bytes(),
            "$bcrypt-sha256$v=2,t=2b,r=5$X1g1nh3g0v4h6970O68cxe$CBF9csfEdW68xv3DwE6xSULXMtqEFP.",
            &ctx()).unwrap(), true);
        assert_eq!(h.verify(b.as_bytes(),
            "$bcrypt-sha256$v=2,t=2b,r=5$X1g1nh3g0v4h6970O68cxe$CBF9csfEdW68xv3DwE6xSULXMtqEFP.",
            &ctx()).unwrap(), false);
        assert_eq!(h.verify(b.as_bytes(),
            "$bcrypt-sha256$v=2,t=2b,r=5$X1g1nh3g0v4h6970O68cxe$zC/1UDUG2ofEXB6Onr2vvyFzfhEOS3S",
            &ctx()).unwrap(), true);
    }

    #[test]
    fn bcrypt_sha256_v1_upgrades()
    {
        let h = BcryptSha256;

        let v1 = "$bcrypt-sha256$2a,5$5Hg1DKFqPE8C2aflZ5vVoe$12BjNE0p7axMg55.Y/mHsYiVuFBDQyu";

        assert_eq!(h.verify(b"password", v1, &ctx()).unwrap(), true);
        assert_eq!(h.needs_update(v1, None), true);

        // the v1 empty-secret vector verifies through the plain
        // SHA-256 pre-digest
        assert_eq!(h.verify(b"",
            "$bcrypt-sha256$2a,5$E/e/2AOhqM5W/KJTFQzLce$F6dYSxOdAEoJZO2eoHUZWZljW/e0TXO",
            &ctx()).unwrap(), true);

        let v2 = "$bcrypt-sha256$v=2,t=2b,r=5$5Hg1DKFqPE8C2aflZ5vVoe$wOK1VFFtS8IGTrGa7.h5fs0u84qyPbS";
        assert_eq!(h.needs_update(v2, None), false);

        // v2 grammar rejects zero padded rounds and foreign variants
        assert_eq!(h.identify(
            "$bcrypt-sha256$v=2,t=2b,r=05$5Hg1DKFqPE8C2aflZ5vVoe$12BjNE0p7axMg55.Y/mHsYiVuFBDQyu"), false);
        let e = h.parse(
            "$bcrypt-sha256$v=2,t=2a,r=5$5Hg1DKFqPE8C2aflZ5vVoe$12BjNE0p7axMg55.Y/mHsYiVuFBDQyu").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::InvalidHash);
    }
}
