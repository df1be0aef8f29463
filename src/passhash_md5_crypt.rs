/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! md5_crypt (`$1$`). Wire format `$1$<salt>$<checksum>`, salt up to 8
//! chars, 22 char checksum, a fixed 1000 recombination rounds. Kept for
//! verifying legacy stores, never a sane default.

use md5::{Md5, Digest};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_encoding::{Encoding, H64_CHARS, MD5_TRANSPOSE};
use super::passhash_mcf::McfHash;
use super::passhash_hasher::*;

pub const MD5_CRYPT_INFO: SchemeInfo = SchemeInfo
{
    name: "md5_crypt",
    aliases: &["md5-crypt"],
    idents: &["1"],
    setting_kwds: &["salt", "salt_size"],
    context_kwds: &[],
    rounds: None,
    salt: Some(SaltInfo{min_size: 0, max_size: 8, default_size: 8, chars: H64_CHARS, raw: false}),
    checksum_size: 22,
    checksum_chars: H64_CHARS,
    truncate_size: None,
    forbids_nul: true,
};

/// The FreeBSD md5 crypt transform.
fn md5_crypt_checksum(secret: &[u8], salt: &[u8]) -> Vec<u8>
{
    // digest B = MD5(secret || salt || secret)
    let mut ctx = Md5::new();
    ctx.update(secret);
    ctx.update(salt);
    ctx.update(secret);
    let digest_b = ctx.finalize();

    // digest A = MD5(secret || "$1$" || salt || mix)
    let mut ctx = Md5::new();
    ctx.update(secret);
    ctx.update(b"$1$");
    ctx.update(salt);

    let mut cnt = secret.len();
    while cnt > 16
    {
        ctx.update(&digest_b);
        cnt -= 16;
    }
    ctx.update(&digest_b[..cnt]);

    let mut cnt = secret.len();
    while cnt > 0
    {
        if (cnt & 1) != 0
        {
            ctx.update(&[0_u8]);
        }
        else
        {
            ctx.update(&secret[..1]);
        }

        cnt >>= 1;
    }

    let mut c: Vec<u8> = ctx.finalize().to_vec();

    // fixed 1000 rounds of recombination
    for i in 0..1000
    {
        let mut ctx = Md5::new();

        if (i & 1) != 0
        {
            ctx.update(secret);
        }
        else
        {
            ctx.update(&c);
        }

        if i % 3 != 0
        {
            ctx.update(salt);
        }

        if i % 7 != 0
        {
            ctx.update(secret);
        }

        if (i & 1) != 0
        {
            ctx.update(&c);
        }
        else
        {
            ctx.update(secret);
        }

        c = ctx.finalize().to_vec();
    }

    return c;
}

pub struct Md5Crypt;

impl Md5Crypt
{
    fn split<'h>(&self, hash: &'h str) -> PasshashResult<(&'h str, Option<&'h str>)>
    {
        let mcf = McfHash::parse(hash)?;

        if MD5_CRYPT_INFO.knows_ident(mcf.ident()) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ident '{}' does not belong to md5_crypt", mcf.ident());
        }

        let fields = mcf.fields();

        let (salt, checksum) = match fields.len()
        {
            1 => (fields[0], None),
            2 => (fields[0], Some(fields[1])),
            n => passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident, expected 1..2", n),
        };

        if salt.len() > 8
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "salt length: {} exceeds 8 chars", salt.len());
        }

        let checksum = match checksum
        {
            None => None,
            Some(c) if c.len() == 0 => None,
            Some(c) =>
            {
                validate_checksum(&MD5_CRYPT_INFO, c)?;

                Some(c)
            },
        };

        return Ok((salt, checksum));
    }
}

impl SchemeHandler for Md5Crypt
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &MD5_CRYPT_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let (salt, checksum) = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: "1".to_string(),
            salt: Some(salt.as_bytes().to_vec()),
            checksum: checksum.map(|c| c.to_string()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&MD5_CRYPT_INFO, secret, settings)?;

        let salt = resolve_salt(&MD5_CRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;

        let digest = md5_crypt_checksum(secret, &salt);
        let checksum = Encoding::h64_encode_transposed(&digest, MD5_TRANSPOSE);

        let salt_str = String::from_utf8(salt)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::External, "salt not utf8, {}", e))?;

        return Ok(format!("$1${}${}", salt_str, checksum));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(&MD5_CRYPT_INFO, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;

        let salt_str = String::from_utf8(salt)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::External, "salt not utf8, {}", e))?;

        return Ok(format!("$1${}$", salt_str));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let (salt, _) = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(&MD5_CRYPT_INFO, secret, &settings)?;

        let digest = md5_crypt_checksum(secret, salt.as_bytes());
        let checksum = Encoding::h64_encode_transposed(&digest, MD5_TRANSPOSE);

        return Ok(format!("$1${}${}", salt, checksum));
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
    fn reference_vector()
    {
        let h = Md5Crypt;

        let out = h.genhash(b"password", "$1$5pZSV9va", &ctx()).unwrap();
        assert_eq!(out.as_str(), "$1$5pZSV9va$azfrPr6af3Fc7dLblQXVa0");

        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"Password", out.as_str(), &ctx()).unwrap(), false);
    }

    #[test]
    fn fresh_hash_round_trip()
    {
        let h = Md5Crypt;
        let s = HashSettings::default();

        let out = h.hash(b"abc", &s, &ctx()).unwrap();
        assert_eq!(h.identify(out.as_str()), true);
        assert_eq!(h.verify(b"abc", out.as_str(), &ctx()).unwrap(), true);

        let parsed = h.parse(out.as_str()).unwrap();
        assert_eq!(parsed.salt.unwrap().len(), 8);
        assert_eq!(parsed.checksum.unwrap().len(), 22);
    }

    #[test]
    fn parse_classification()
    {
        let h = Md5Crypt;

        // 9 char salt is a parameter violation, not damage
        let e = h.parse("$1$123456789$azfrPr6af3Fc7dLblQXVa0").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::InvalidHash);
        assert_eq!(h.identify("$1$123456789$azfrPr6af3Fc7dLblQXVa0"), true);

        // wrong checksum width is damage
        assert_eq!(h.identify("$1$5pZSV9va$tooshort"), false);

        // foreign ident
        assert_eq!(h.identify("$6$salt$sum"), false);
    }
}
