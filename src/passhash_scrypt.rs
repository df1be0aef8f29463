/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! scrypt, `$scrypt$ln=<N>,r=<r>,p=<p>$<salt>$<checksum>` with salt and
//! checksum in adapted base64. `ln` is the log2 work factor.

use scrypt::Params;

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::{Encoding, AB64_CHARS};
use super::passhash_mcf::{McfHash, parse_decimal, parse_params, require_param};
use super::passhash_hasher::*;

pub const SCRYPT_INFO: SchemeInfo = SchemeInfo
{
    name: "scrypt",
    aliases: &[],
    idents: &["scrypt"],
    setting_kwds: &["salt", "salt_size", "rounds", "block_size", "parallelism", "vary_rounds"],
    context_kwds: &[],
    rounds: Some(RoundsInfo{min_rounds: 1, max_rounds: 31, default_rounds: 16, cost: RoundsCost::Log2}),
    salt: Some(SaltInfo{min_size: 0, max_size: 1024, default_size: 16, chars: "", raw: true}),
    checksum_size: 43,
    checksum_chars: AB64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

const CHECKSUM_BYTES: usize = 32;

struct ScryptFields
{
    log_n: u32,
    block_size: u32,
    parallelism: u32,
    salt: Vec<u8>,
    checksum: Option<String>,
}

fn scrypt_compute(
    secret: &[u8],
    salt: &[u8],
    log_n: u32,
    r: u32,
    p: u32,
    from_wire: bool
) -> PasshashResult<String>
{
    let code = if from_wire == true { PasshashErrorCode::InvalidHash } else { PasshashErrorCode::Config };

    let params = Params::new(log_n as u8, r, p, CHECKSUM_BYTES)
        .map_err(|e|
            passhash_error_map!(code, "scrypt parameters ln={} r={} p={} err, {}", log_n, r, p, e)
        )?;

    let mut out = vec![0_u8; CHECKSUM_BYTES];

    scrypt::scrypt(secret, salt, &params, &mut out)
        .map_err(|e|
            passhash_error_map!(PasshashErrorCode::External, "scrypt core err, {}", e)
        )?;

    return Ok(Encoding::ab64_encode(&out));
}

pub struct Scrypt;

impl Scrypt
{
    fn split(&self, hash: &str) -> PasshashResult<ScryptFields>
    {
        let mcf = McfHash::parse(hash)?;

        if mcf.ident() != "scrypt"
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to scrypt", PasshashCommon::sanitize_str(mcf.ident()));
        }

        let fields = mcf.fields();

        let (params_f, salt_f, checksum_f) = match fields.len()
        {
            2 => (fields[0], fields[1], None),
            3 => (fields[0], fields[1], Some(fields[2])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 2..3", n),
        };

        let params = parse_params(params_f)?;

        let log_n = parse_decimal(require_param(&params, "ln")?, "ln", false)?;
        let block_size = parse_decimal(require_param(&params, "r")?, "r", false)?;
        let parallelism = parse_decimal(require_param(&params, "p")?, "p", false)?;

        if log_n < 1 || log_n > 31
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "ln: {} outside of range 1..31", log_n);
        }

        if block_size == 0 || parallelism == 0
        {
            passhash_error!(PasshashErrorCode::InvalidHash, "r and p must be positive");
        }

        let salt = Encoding::ab64_decode(salt_f)?;

        let checksum = match checksum_f
        {
            None => None,
            Some(c) if c.len() == 0 => None,
            Some(c) =>
            {
                validate_checksum(&SCRYPT_INFO, c)?;

                Some(c.to_string())
            },
        };

        return Ok(ScryptFields
        {
            log_n: log_n,
            block_size: block_size,
            parallelism: parallelism,
            salt: salt,
            checksum: checksum,
        });
    }

    fn serialize(&self, f: &ScryptFields, checksum: &str) -> String
    {
        return format!("$scrypt$ln={},r={},p={}${}${}",
            f.log_n, f.block_size, f.parallelism, Encoding::ab64_encode(&f.salt), checksum);
    }
}

impl SchemeHandler for Scrypt
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &SCRYPT_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let f = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: "scrypt".to_string(),
            rounds: Some(f.log_n),
            salt: Some(f.salt),
            checksum: f.checksum,
            block_size: Some(f.block_size),
            parallelism: Some(f.parallelism),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&SCRYPT_INFO, secret, settings)?;

        let salt = resolve_salt(&SCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let log_n = resolve_rounds(&SCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        let f = ScryptFields
        {
            log_n: log_n,
            block_size: settings.block_size.unwrap_or(8),
            parallelism: settings.parallelism.unwrap_or(1),
            salt: salt,
            checksum: None,
        };

        let checksum = scrypt_compute(secret, &f.salt, f.log_n, f.block_size, f.parallelism, false)?;

        return Ok(self.serialize(&f, checksum.as_str()));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(&SCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;
        let log_n = resolve_rounds(&SCRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "rounds resolution failed"))?;

        return Ok(format!("$scrypt$ln={},r={},p={}${}$",
            log_n, settings.block_size.unwrap_or(8), settings.parallelism.unwrap_or(1),
            Encoding::ab64_encode(&salt)));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let f = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(&SCRYPT_INFO, secret, &settings)?;

        let checksum = scrypt_compute(secret, &f.salt, f.log_n, f.block_size, f.parallelism, true)?;

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
    fn round_trip()
    {
        let h = Scrypt;

        let mut s = HashSettings::default();
        s.rounds = Some(4);
        s.salt = Some(b"0123456789abcdef".to_vec());

        let out = h.hash(b"secret", &s, &ctx()).unwrap();

        assert_eq!(out.starts_with("$scrypt$ln=4,r=8,p=1$"), true);
        assert_eq!(h.verify(b"secret", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"Secret", out.as_str(), &ctx()).unwrap(), false);

        let parsed = h.parse(out.as_str()).unwrap();
        assert_eq!(parsed.rounds, Some(4));
        assert_eq!(parsed.block_size, Some(8));
        assert_eq!(parsed.parallelism, Some(1));
        assert_eq!(parsed.salt, Some(b"0123456789abcdef".to_vec()));
    }

    #[test]
    fn known_answer()
    {
        // scrypt paper appendix: N=16 (ln=4), r=1, p=1, P="", S=""
        // truncated to our 32 byte checksum
        let h = Scrypt;

        let out = h.genhash(b"", "$scrypt$ln=4,r=1,p=1$$", &ctx());

        // empty salt field collides with the empty checksum rule, so
        // the paper vector enters through the compute path instead
        assert_eq!(out.is_err(), true);

        let checksum = scrypt_compute(b"", b"", 4, 1, 1, false).unwrap();
        let raw = Encoding::ab64_decode(checksum.as_str()).unwrap();

        assert_eq!(hex::encode(&raw).as_str(),
            "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442");
    }

    #[test]
    fn parse_classification()
    {
        let h = Scrypt;

        // out of range ln identifies but refuses
        let e = h.parse("$scrypt$ln=32,r=8,p=1$c2FsdA$x").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::InvalidHash);
        assert_eq!(h.identify("$scrypt$ln=32,r=8,p=1$c2FsdA$x"), true);

        // missing parameter is structural
        let e = h.parse("$scrypt$ln=16,r=8$c2FsdA$x").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::MalformedHash);

        assert_eq!(h.identify("$pbkdf2$1$c2FsdA$x"), false);
    }
}
