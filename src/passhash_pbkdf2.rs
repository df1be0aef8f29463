/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The PBKDF2 builder and the schemes stamped out of it.
//!
//! Native formats: `$pbkdf2$<rounds>$<salt>$<checksum>` (SHA-1) and
//! `$pbkdf2-sha256$` / `$pbkdf2-sha512$`, salt and checksum in adapted
//! base64. Django formats:
//! `pbkdf2_<digest>$<rounds>$<salt chars>$<checksum b64>` with a padded
//! standard base64 checksum and a bare character salt.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::{Encoding, AB64_CHARS, B64_CHARS};
use super::passhash_mcf::{McfHash, parse_decimal};
use super::passhash_hasher::*;
use super::passhash_hashing::{Pbkdf2Digest, pbkdf2_derive};

const SALT_CHARS_DJANGO: &'static str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const PBKDF2_SHA1_INFO: SchemeInfo = SchemeInfo
{
    name: "pbkdf2_sha1",
    aliases: &["pbkdf2-sha1"],
    idents: &["pbkdf2"],
    setting_kwds: &["salt", "salt_size", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: u32::MAX, default_rounds: 131000, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 0, max_size: 1024, default_size: 16, chars: "", raw: true}),
    checksum_size: 27,
    checksum_chars: AB64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const PBKDF2_SHA256_INFO: SchemeInfo = SchemeInfo
{
    name: "pbkdf2_sha256",
    aliases: &["pbkdf2-sha256"],
    idents: &["pbkdf2-sha256"],
    setting_kwds: &["salt", "salt_size", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: u32::MAX, default_rounds: 29000, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 0, max_size: 1024, default_size: 16, chars: "", raw: true}),
    checksum_size: 43,
    checksum_chars: AB64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const PBKDF2_SHA512_INFO: SchemeInfo = SchemeInfo
{
    name: "pbkdf2_sha512",
    aliases: &["pbkdf2-sha512"],
    idents: &["pbkdf2-sha512"],
    setting_kwds: &["salt", "salt_size", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: u32::MAX, default_rounds: 25000, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 0, max_size: 1024, default_size: 16, chars: "", raw: true}),
    checksum_size: 86,
    checksum_chars: AB64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const DJANGO_PBKDF2_SHA1_INFO: SchemeInfo = SchemeInfo
{
    name: "django_pbkdf2_sha1",
    aliases: &[],
    idents: &["pbkdf2_sha1"],
    setting_kwds: &["salt", "salt_size", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: u32::MAX, default_rounds: 131000, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 1, max_size: 64, default_size: 12, chars: SALT_CHARS_DJANGO, raw: false}),
    checksum_size: 28,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const DJANGO_PBKDF2_SHA256_INFO: SchemeInfo = SchemeInfo
{
    name: "django_pbkdf2_sha256",
    aliases: &[],
    idents: &["pbkdf2_sha256"],
    setting_kwds: &["salt", "salt_size", "rounds", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: u32::MAX, default_rounds: 29000, cost: RoundsCost::Linear}),
    salt: Some(SaltInfo{min_size: 1, max_size: 64, default_size: 12, chars: SALT_CHARS_DJANGO, raw: false}),
    checksum_size: 44,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

struct Pbkdf2Fields
{
    rounds: u32,
    salt: Vec<u8>,
    checksum: Option<String>,
}

/// A configurable PBKDF2-HMAC scheme in the native adapted-base64
/// format. The digest decides the checksum width.
pub struct Pbkdf2Scheme
{
    info: &'static SchemeInfo,
    digest: Pbkdf2Digest,
}

impl Pbkdf2Scheme
{
    pub
    fn sha1() -> Self
    {
        return Pbkdf2Scheme{info: &PBKDF2_SHA1_INFO, digest: Pbkdf2Digest::Sha1};
    }

    pub
    fn sha256() -> Self
    {
        return Pbkdf2Scheme{info: &PBKDF2_SHA256_INFO, digest: Pbkdf2Digest::Sha256};
    }

    pub
    fn sha512() -> Self
    {
        return Pbkdf2Scheme{info: &PBKDF2_SHA512_INFO, digest: Pbkdf2Digest::Sha512};
    }

    fn split(&self, hash: &str) -> PasshashResult<Pbkdf2Fields>
    {
        let mcf = McfHash::parse(hash)?;

        if self.info.knows_ident(mcf.ident()) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to {}",
                PasshashCommon::sanitize_str(mcf.ident()), self.info.name);
        }

        let fields = mcf.fields();

        let (rounds_f, salt_f, checksum_f) = match fields.len()
        {
            2 => (fields[0], fields[1], None),
            3 => (fields[0], fields[1], Some(fields[2])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 2..3", n),
        };

        let rounds = parse_decimal(rounds_f, "rounds", false)?;

        if rounds == 0
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "rounds: 0 is below the minimum of 1");
        }

        let salt = Encoding::ab64_decode(salt_f)?;

        let checksum = match checksum_f
        {
            None => None,
            Some(c) if c.len() == 0 => None,
            Some(c) =>
            {
                validate_checksum(self.info, c)?;

                Some(c.to_string())
            },
        };

        return Ok(Pbkdf2Fields{rounds: rounds, salt: salt, checksum: checksum});
    }

    fn serialize(&self, rounds: u32, salt: &[u8], checksum: &str) -> String
    {
        return format!("${}${}${}${}",
            self.info.default_ident(), rounds, Encoding::ab64_encode(salt), checksum);
    }

    fn checksum_of(&self, secret: &[u8], salt: &[u8], rounds: u32) -> PasshashResult<String>
    {
        let dk = pbkdf2_derive(self.digest, secret, salt, rounds)?;

        return Ok(Encoding::ab64_encode(&dk));
    }
}

impl SchemeHandler for Pbkdf2Scheme
{
    fn info(&self) -> &'static SchemeInfo
    {
        return self.info;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let f = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: self.info.default_ident().to_string(),
            rounds: Some(f.rounds),
            salt: Some(f.salt),
            checksum: f.checksum,
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(self.info, secret, settings)?;

        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let checksum = self.checksum_of(secret, &salt, rounds)?;

        return Ok(self.serialize(rounds, &salt, checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        return Ok(self.serialize(rounds, &salt, ""));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let f = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(self.info, secret, &settings)?;

        let checksum = self.checksum_of(secret, &f.salt, f.rounds)?;

        return Ok(self.serialize(f.rounds, &f.salt, checksum.as_str()));
    }
}

/// The Django application format over the same builder. Not an MCF
/// string: no leading `$`, bare character salt, padded base64 checksum.
pub struct DjangoPbkdf2Scheme
{
    info: &'static SchemeInfo,
    digest: Pbkdf2Digest,
}

impl DjangoPbkdf2Scheme
{
    pub
    fn sha1() -> Self
    {
        return DjangoPbkdf2Scheme{info: &DJANGO_PBKDF2_SHA1_INFO, digest: Pbkdf2Digest::Sha1};
    }

    pub
    fn sha256() -> Self
    {
        return DjangoPbkdf2Scheme{info: &DJANGO_PBKDF2_SHA256_INFO, digest: Pbkdf2Digest::Sha256};
    }

    fn split<'h>(&self, hash: &'h str) -> PasshashResult<(u32, &'h str, Option<&'h str>)>
    {
        if hash.starts_with('$') == true
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "django format carries no '$' prefix");
        }

        let mut it = hash.split('$');

        let ident = it.next().unwrap_or("");

        if self.info.knows_ident(ident) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to {}",
                PasshashCommon::sanitize_str(ident), self.info.name);
        }

        let parts: Vec<&str> = it.collect();

        let (rounds_f, salt, checksum) = match parts.len()
        {
            2 => (parts[0], parts[1], None),
            3 => (parts[0], parts[1], Some(parts[2])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 2..3", n),
        };

        let rounds = parse_decimal(rounds_f, "rounds", false)?;

        if rounds == 0
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "rounds: 0 is below the minimum of 1");
        }

        if salt.len() == 0
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "empty salt field");
        }

        if Encoding::validate_chars(salt, SALT_CHARS_DJANGO) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "salt char outside the django alphabet");
        }

        let checksum = match checksum
        {
            None => None,
            Some(c) if c.len() == 0 => None,
            Some(c) =>
            {
                validate_checksum(self.info, c)?;

                Some(c)
            },
        };

        return Ok((rounds, salt, checksum));
    }

    fn serialize(&self, rounds: u32, salt: &str, checksum: &str) -> String
    {
        return format!("{}${}${}${}", self.info.default_ident(), rounds, salt, checksum);
    }

    fn checksum_of(&self, secret: &[u8], salt: &[u8], rounds: u32) -> PasshashResult<String>
    {
        let dk = pbkdf2_derive(self.digest, secret, salt, rounds)?;

        return Ok(Encoding::b64_encode(&dk));
    }
}

impl SchemeHandler for DjangoPbkdf2Scheme
{
    fn info(&self) -> &'static SchemeInfo
    {
        return self.info;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let (rounds, salt, checksum) = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: self.info.default_ident().to_string(),
            rounds: Some(rounds),
            salt: Some(salt.as_bytes().to_vec()),
            checksum: checksum.map(|c| c.to_string()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(self.info, secret, settings)?;

        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let checksum = self.checksum_of(secret, &salt, rounds)?;

        let salt_str = String::from_utf8(salt)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::External, "salt not utf8, {}", e))?;

        return Ok(self.serialize(rounds, salt_str.as_str(), checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let rounds = resolve_rounds(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let salt_str = String::from_utf8(salt)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::External, "salt not utf8, {}", e))?;

        return Ok(self.serialize(rounds, salt_str.as_str(), ""));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let (rounds, salt, _) = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(self.info, secret, &settings)?;

        let checksum = self.checksum_of(secret, salt.as_bytes(), rounds)?;

        return Ok(self.serialize(rounds, salt, checksum.as_str()));
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
    fn rfc6070_through_the_wire_format()
    {
        let h = Pbkdf2Scheme::sha256();

        // P="password", S="salt", c=1 from the RFC 6070 style vectors,
        // pushed through the adapted base64 encoding
        let expected_raw = hex::decode(
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b").unwrap();
        let config = format!("$pbkdf2-sha256$1${}", Encoding::ab64_encode(b"salt"));

        let out = h.genhash(b"password", config.as_str(), &ctx()).unwrap();
        let parsed = h.parse(out.as_str()).unwrap();

        assert_eq!(parsed.checksum.unwrap(), Encoding::ab64_encode(&expected_raw));
        assert_eq!(parsed.rounds, Some(1));
        assert_eq!(parsed.salt, Some(b"salt".to_vec()));

        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"passwork", out.as_str(), &ctx()).unwrap(), false);
    }

    #[test]
    fn sha1_variant_ident()
    {
        let h = Pbkdf2Scheme::sha1();

        let mut s = HashSettings::default();
        s.rounds = Some(1000);
        s.salt = Some(b"0123456789ab".to_vec());

        let out = h.hash(b"secret", &s, &ctx()).unwrap();

        assert_eq!(out.starts_with("$pbkdf2$1000$"), true);
        assert_eq!(h.verify(b"secret", out.as_str(), &ctx()).unwrap(), true);

        // the sha256 handler refuses the sha1 ident
        assert_eq!(Pbkdf2Scheme::sha256().identify(out.as_str()), false);
    }

    #[test]
    fn parse_classification()
    {
        let h = Pbkdf2Scheme::sha256();

        assert_eq!(h.identify("$pbkdf2-sha256$29000$abc$def!"), false);

        // zero rounds is well formed but out of range
        let e = h.parse("$pbkdf2-sha256$0$c2FsdA$x").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::InvalidHash);

        // leading zero rounds is structural
        let e = h.parse("$pbkdf2-sha256$029000$c2FsdA$x").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::MalformedHash);
    }

    #[test]
    fn django_vectors()
    {
        let h = DjangoPbkdf2Scheme::sha256();

        let hash = "pbkdf2_sha256$10000$kjVJaVz6qsnJ$5yPHw3rwJGECpUf70daLGhOrQ5+AMxIJdz1c3bqK1Rs=";
        assert_eq!(h.verify(b"not a password", hash, &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"not a password!", hash, &ctx()).unwrap(), false);

        let h = DjangoPbkdf2Scheme::sha1();

        let hash = "pbkdf2_sha1$10000$wz5B6WkasRoF$atJmJ1o+XfJxKq1+Nu1f1i57Z5I=";
        assert_eq!(h.verify(b"not a password", hash, &ctx()).unwrap(), true);

        // an MCF prefixed string is foreign to the django format
        assert_eq!(h.identify("$pbkdf2$1000$c2FsdA$x"), false);
    }

    #[test]
    fn django_round_trip()
    {
        let h = DjangoPbkdf2Scheme::sha256();

        let mut s = HashSettings::default();
        s.rounds = Some(10000);

        let out = h.hash(b"abc", &s, &ctx()).unwrap();
        let parsed = h.parse(out.as_str()).unwrap();

        assert_eq!(parsed.rounds, Some(10000));
        assert_eq!(parsed.salt.unwrap().len(), 12);
        assert_eq!(parsed.checksum.unwrap().len(), 44);
        assert_eq!(h.verify(b"abc", out.as_str(), &ctx()).unwrap(), true);
    }
}
