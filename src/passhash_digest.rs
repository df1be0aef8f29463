/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Unsalted legacy schemes: bare hex digests, the MySQL 4.1 double
//! SHA-1, the Postgres user-salted MD5 and the plaintext identity
//! scheme. All of them exist to verify inherited stores and to serve
//! as deprecated members of a context, never as defaults.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::{Encoding, HEX_LOWER_CHARS, HEX_UPPER_CHARS};
use super::passhash_hasher::*;
use super::passhash_hashing::{Pbkdf2Digest, digest_bytes, md5_digest};

/// Digest selector shared by the legacy schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DigestAlg
{
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlg
{
    pub(crate)
    fn compute(&self, data: &[u8]) -> Vec<u8>
    {
        match *self
        {
            Self::Md5 => return md5_digest(data),
            Self::Sha1 => return digest_bytes(Pbkdf2Digest::Sha1, data),
            Self::Sha256 => return digest_bytes(Pbkdf2Digest::Sha256, data),
            Self::Sha512 => return digest_bytes(Pbkdf2Digest::Sha512, data),
        }
    }

    pub(crate)
    fn output_size(&self) -> usize
    {
        match *self
        {
            Self::Md5 => return 16,
            Self::Sha1 => return 20,
            Self::Sha256 => return 32,
            Self::Sha512 => return 64,
        }
    }
}

pub const HEX_MD5_INFO: SchemeInfo = SchemeInfo
{
    name: "hex_md5",
    aliases: &[],
    idents: &[""],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 32,
    checksum_chars: HEX_LOWER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const HEX_SHA1_INFO: SchemeInfo = SchemeInfo
{
    name: "hex_sha1",
    aliases: &[],
    idents: &[""],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 40,
    checksum_chars: HEX_LOWER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const HEX_SHA256_INFO: SchemeInfo = SchemeInfo
{
    name: "hex_sha256",
    aliases: &[],
    idents: &[""],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 64,
    checksum_chars: HEX_LOWER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const HEX_SHA512_INFO: SchemeInfo = SchemeInfo
{
    name: "hex_sha512",
    aliases: &[],
    idents: &[""],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 128,
    checksum_chars: HEX_LOWER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const MYSQL41_INFO: SchemeInfo = SchemeInfo
{
    name: "mysql41",
    aliases: &["mysql-41"],
    idents: &["*"],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 40,
    checksum_chars: HEX_UPPER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const POSTGRES_MD5_INFO: SchemeInfo = SchemeInfo
{
    name: "postgres_md5",
    aliases: &["postgres-md5"],
    idents: &["md5"],
    setting_kwds: &[],
    context_kwds: &["user"],
    rounds: None,
    salt: None,
    checksum_size: 32,
    checksum_chars: HEX_LOWER_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const PLAINTEXT_INFO: SchemeInfo = SchemeInfo
{
    name: "plaintext",
    aliases: &[],
    idents: &[""],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 0,
    checksum_chars: "",
    truncate_size: None,
    forbids_nul: false,
};

/// Bare hex digest of the secret, lowercase canonical form. Uppercase
/// input is accepted and normalized on parse.
pub struct HexDigest
{
    info: &'static SchemeInfo,
    alg: DigestAlg,
}

impl HexDigest
{
    pub
    fn md5() -> Self
    {
        return HexDigest{info: &HEX_MD5_INFO, alg: DigestAlg::Md5};
    }

    pub
    fn sha1() -> Self
    {
        return HexDigest{info: &HEX_SHA1_INFO, alg: DigestAlg::Sha1};
    }

    pub
    fn sha256() -> Self
    {
        return HexDigest{info: &HEX_SHA256_INFO, alg: DigestAlg::Sha256};
    }

    pub
    fn sha512() -> Self
    {
        return HexDigest{info: &HEX_SHA512_INFO, alg: DigestAlg::Sha512};
    }
}

impl SchemeHandler for HexDigest
{
    fn info(&self) -> &'static SchemeInfo
    {
        return self.info;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        if hash.len() != self.info.checksum_size
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "length: {} of {}, expected {}", hash.len(), self.info.name, self.info.checksum_size);
        }

        if hash.bytes().all(|b| b.is_ascii_hexdigit()) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "non hex char in a {} hash", self.info.name);
        }

        return Ok(ParsedHash
        {
            checksum: Some(hash.to_ascii_lowercase()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(self.info, secret, settings)?;

        return Ok(Encoding::hex_encode_lower(&self.alg.compute(secret)));
    }

    fn genconfig(&self, _settings: &HashSettings) -> PasshashResult<String>
    {
        return Ok(String::new());
    }

    fn genhash(&self, secret: &[u8], config: &str, ctx: &ContextKwds) -> PasshashResult<String>
    {
        if config.len() > 0
        {
            self.parse(config)?;
        }

        return self.hash(secret, &HashSettings::default(), ctx);
    }
}

/// MySQL 4.1: `*` + 40 uppercase hex chars of SHA1(SHA1(secret)).
pub struct Mysql41;

impl SchemeHandler for Mysql41
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &MYSQL41_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let body = match hash.strip_prefix('*')
        {
            Some(b) => b,
            None => passhash_error!(PasshashErrorCode::MalformedHash, "missing '*' prefix"),
        };

        if body.len() != 40 || body.bytes().all(|b| b.is_ascii_hexdigit()) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "expected 40 hex chars after '*'");
        }

        return Ok(ParsedHash
        {
            ident: "*".to_string(),
            checksum: Some(body.to_ascii_uppercase()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&MYSQL41_INFO, secret, settings)?;

        let inner = digest_bytes(Pbkdf2Digest::Sha1, secret);
        let outer = digest_bytes(Pbkdf2Digest::Sha1, &inner);

        return Ok(format!("*{}", Encoding::hex_encode_upper(&outer)));
    }

    fn genconfig(&self, _settings: &HashSettings) -> PasshashResult<String>
    {
        return Ok("*".to_string());
    }

    fn genhash(&self, secret: &[u8], config: &str, ctx: &ContextKwds) -> PasshashResult<String>
    {
        if config.len() > 1
        {
            self.parse(config)?;
        }
        else if config != "*" && config.len() != 0
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "unusable mysql41 config");
        }

        return self.hash(secret, &HashSettings::default(), ctx);
    }
}

/// Postgres pre-SCRAM storage: `md5` + hex MD5(secret || user). The
/// username enters through the context keywords.
pub struct PostgresMd5;

impl PostgresMd5
{
    fn require_user(ctx: &ContextKwds) -> PasshashResult<&str>
    {
        match ctx.user
        {
            Some(ref u) => return Ok(u.as_str()),
            None => passhash_error!(PasshashErrorCode::Config,
                "postgres_md5 requires the 'user' context keyword"),
        }
    }
}

impl SchemeHandler for PostgresMd5
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &POSTGRES_MD5_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let body = match hash.strip_prefix("md5")
        {
            Some(b) => b,
            None => passhash_error!(PasshashErrorCode::MalformedHash, "missing 'md5' prefix"),
        };

        if body.len() != 32 || Encoding::validate_chars(body, HEX_LOWER_CHARS) == false
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "expected 32 lowercase hex chars after 'md5'");
        }

        return Ok(ParsedHash
        {
            ident: "md5".to_string(),
            checksum: Some(body.to_string()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&POSTGRES_MD5_INFO, secret, settings)?;
        let user = PostgresMd5::require_user(ctx)?;

        let mut data = secret.to_vec();
        data.extend_from_slice(user.as_bytes());

        return Ok(format!("md5{}", Encoding::hex_encode_lower(&md5_digest(&data))));
    }

    fn genconfig(&self, _settings: &HashSettings) -> PasshashResult<String>
    {
        return Ok("md5".to_string());
    }

    fn genhash(&self, secret: &[u8], config: &str, ctx: &ContextKwds) -> PasshashResult<String>
    {
        if config.len() > 3
        {
            self.parse(config)?;
        }
        else if config != "md5" && config.len() != 0
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "unusable postgres_md5 config");
        }

        return self.hash(secret, &HashSettings::default(), ctx);
    }
}

/// The identity scheme. Identifies every string, so a context must
/// place it last.
pub struct Plaintext;

impl SchemeHandler for Plaintext
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &PLAINTEXT_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        return Ok(ParsedHash
        {
            checksum: Some(hash.to_string()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&PLAINTEXT_INFO, secret, settings)?;

        let s = std::str::from_utf8(secret)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::PasswordValue,
                    "plaintext cannot store a non utf8 secret, {}", e)
            )?;

        return Ok(s.to_string());
    }

    fn genconfig(&self, _settings: &HashSettings) -> PasshashResult<String>
    {
        return Ok(String::new());
    }

    fn genhash(&self, secret: &[u8], _config: &str, ctx: &ContextKwds) -> PasshashResult<String>
    {
        return self.hash(secret, &HashSettings::default(), ctx);
    }

    fn verify(&self, secret: &[u8], hash: &str, _ctx: &ContextKwds) -> PasshashResult<bool>
    {
        return Ok(PasshashCommon::consteq(secret, hash.as_bytes()));
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
    fn hex_digests()
    {
        let h = HexDigest::md5();

        let out = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);

        // uppercase verifies through normalization
        assert_eq!(h.verify(b"password", "5F4DCC3B5AA765D61D8327DEB882CF99", &ctx()).unwrap(), true);

        assert_eq!(h.identify("5f4dcc3b5aa765d61d8327deb882cf9"), false);
        assert_eq!(h.identify("zf4dcc3b5aa765d61d8327deb882cf99"), false);

        let h = HexDigest::sha1();
        let out = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8");
    }

    #[test]
    fn mysql41_vector()
    {
        let h = Mysql41;

        // published MySQL 4.1 PASSWORD() output
        let out = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "*2470C0C06DEE42FD1618BB99005ADCA2EC9D1E19");

        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.identify("2470C0C06DEE42FD1618BB99005ADCA2EC9D1E19"), false);
    }

    #[test]
    fn postgres_md5_uses_the_user()
    {
        let h = PostgresMd5;

        let mut c = ContextKwds::default();
        c.user = Some("postgres".to_string());

        let out = h.hash(b"password", &HashSettings::default(), &c).unwrap();
        assert_eq!(out.as_str(), "md53175bce1d3201d16594cebf9d7eb3f9d");

        assert_eq!(h.verify(b"password", out.as_str(), &c).unwrap(), true);

        // a different user changes the hash
        c.user = Some("admin".to_string());
        assert_eq!(h.verify(b"password", out.as_str(), &c).unwrap(), false);

        // the context keyword is mandatory
        let e = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::Config);
    }

    #[test]
    fn plaintext_identity()
    {
        let h = Plaintext;

        let out = h.hash(b"anything at all", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "anything at all");
        assert_eq!(h.verify(b"anything at all", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"anything else", out.as_str(), &ctx()).unwrap(), false);
        assert_eq!(h.identify("literally anything"), true);
    }
}
