/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! RFC 2307 style `{SCHEME}payload` wrappers: `{MD5}` / `{SHA}` over a
//! bare digest, `{SMD5}` / `{SSHA}` over base64(digest(secret||salt) ||
//! salt), and the loose plaintext passthrough. Scheme tags compare case
//! insensitively and serialize uppercase.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::{Encoding, B64_CHARS};
use super::passhash_hasher::*;
use super::passhash_digest::DigestAlg;

pub const LDAP_MD5_INFO: SchemeInfo = SchemeInfo
{
    name: "ldap_md5",
    aliases: &[],
    idents: &["{MD5}"],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 24,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const LDAP_SHA1_INFO: SchemeInfo = SchemeInfo
{
    name: "ldap_sha1",
    aliases: &["ldap_sha"],
    idents: &["{SHA}"],
    setting_kwds: &[],
    context_kwds: &[],
    rounds: None,
    salt: None,
    checksum_size: 28,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const LDAP_SALTED_MD5_INFO: SchemeInfo = SchemeInfo
{
    name: "ldap_salted_md5",
    aliases: &[],
    idents: &["{SMD5}"],
    setting_kwds: &["salt", "salt_size"],
    context_kwds: &[],
    rounds: None,
    salt: Some(SaltInfo{min_size: 4, max_size: 16, default_size: 4, chars: "", raw: true}),
    checksum_size: 0,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const LDAP_SALTED_SHA1_INFO: SchemeInfo = SchemeInfo
{
    name: "ldap_salted_sha1",
    aliases: &["ldap_salted_sha"],
    idents: &["{SSHA}"],
    setting_kwds: &["salt", "salt_size"],
    context_kwds: &[],
    rounds: None,
    salt: Some(SaltInfo{min_size: 4, max_size: 16, default_size: 4, chars: "", raw: true}),
    checksum_size: 0,
    checksum_chars: B64_CHARS,
    truncate_size: None,
    forbids_nul: false,
};

pub const LDAP_PLAINTEXT_INFO: SchemeInfo = SchemeInfo
{
    name: "ldap_plaintext",
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

/// Strips a `{TAG}` prefix, case insensitively.
fn strip_tag<'h>(hash: &'h str, tag: &str) -> Option<&'h str>
{
    if hash.len() < tag.len() || hash.is_char_boundary(tag.len()) == false
    {
        return None;
    }

    let (head, tail) = hash.split_at(tag.len());

    if head.eq_ignore_ascii_case(tag) == true
    {
        return Some(tail);
    }

    return None;
}

/// `{MD5}` / `{SHA}`: base64 of the bare digest.
pub struct LdapDigest
{
    info: &'static SchemeInfo,
    alg: DigestAlg,
}

impl LdapDigest
{
    pub
    fn md5() -> Self
    {
        return LdapDigest{info: &LDAP_MD5_INFO, alg: DigestAlg::Md5};
    }

    pub
    fn sha1() -> Self
    {
        return LdapDigest{info: &LDAP_SHA1_INFO, alg: DigestAlg::Sha1};
    }
}

impl SchemeHandler for LdapDigest
{
    fn info(&self) -> &'static SchemeInfo
    {
        return self.info;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let tag = self.info.default_ident();

        let payload = match strip_tag(hash, tag)
        {
            Some(p) => p,
            None => passhash_error!(PasshashErrorCode::MalformedHash,
                "missing '{}' prefix", tag),
        };

        let raw = Encoding::b64_decode(payload)?;

        if raw.len() != self.alg.output_size()
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "payload decodes to {} bytes, expected {}", raw.len(), self.alg.output_size());
        }

        return Ok(ParsedHash
        {
            ident: tag.to_string(),
            checksum: Some(Encoding::b64_encode(&raw)),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(self.info, secret, settings)?;

        return Ok(format!("{}{}", self.info.default_ident(),
            Encoding::b64_encode(&self.alg.compute(secret))));
    }

    fn genconfig(&self, _settings: &HashSettings) -> PasshashResult<String>
    {
        return Ok(self.info.default_ident().to_string());
    }

    fn genhash(&self, secret: &[u8], config: &str, ctx: &ContextKwds) -> PasshashResult<String>
    {
        if strip_tag(config, self.info.default_ident()).is_none() == true
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "unusable {} config", self.info.name);
        }

        return self.hash(secret, &HashSettings::default(), ctx);
    }
}

/// `{SMD5}` / `{SSHA}`: base64(digest(secret || salt) || salt).
pub struct LdapSaltedDigest
{
    info: &'static SchemeInfo,
    alg: DigestAlg,
}

impl LdapSaltedDigest
{
    pub
    fn md5() -> Self
    {
        return LdapSaltedDigest{info: &LDAP_SALTED_MD5_INFO, alg: DigestAlg::Md5};
    }

    pub
    fn sha1() -> Self
    {
        return LdapSaltedDigest{info: &LDAP_SALTED_SHA1_INFO, alg: DigestAlg::Sha1};
    }

    fn split(&self, hash: &str) -> PasshashResult<(Vec<u8>, Vec<u8>)>
    {
        let tag = self.info.default_ident();

        let payload = match strip_tag(hash, tag)
        {
            Some(p) => p,
            None => passhash_error!(PasshashErrorCode::MalformedHash,
                "missing '{}' prefix", tag),
        };

        let raw = Encoding::b64_decode(payload)?;
        let dsize = self.alg.output_size();

        if raw.len() <= dsize
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "payload decodes to {} bytes, expected more than {}", raw.len(), dsize);
        }

        let digest = raw[..dsize].to_vec();
        let salt = raw[dsize..].to_vec();

        if salt.len() > 16
        {
            passhash_error!(PasshashErrorCode::InvalidHash,
                "salt of {} bytes exceeds the 16 byte bound", salt.len());
        }

        return Ok((digest, salt));
    }

    fn assemble(&self, digest: &[u8], salt: &[u8]) -> String
    {
        let mut raw = digest.to_vec();
        raw.extend_from_slice(salt);

        return format!("{}{}", self.info.default_ident(), Encoding::b64_encode(&raw));
    }
}

impl SchemeHandler for LdapSaltedDigest
{
    fn info(&self) -> &'static SchemeInfo
    {
        return self.info;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        let (digest, salt) = self.split(hash)?;

        return Ok(ParsedHash
        {
            ident: self.info.default_ident().to_string(),
            salt: Some(salt),
            checksum: Some(Encoding::b64_encode(&digest)),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(self.info, secret, settings)?;

        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;

        let mut data = secret.to_vec();
        data.extend_from_slice(&salt);

        return Ok(self.assemble(&self.alg.compute(&data), &salt));
    }

    fn genconfig(&self, settings: &HashSettings) -> PasshashResult<String>
    {
        let salt = resolve_salt(self.info, settings)?
            .ok_or_else(|| passhash_error_map!(PasshashErrorCode::External, "salt resolution failed"))?;

        // zeroed digest marks a config; genhash only reads the salt
        let zeros = vec![0_u8; self.alg.output_size()];

        return Ok(self.assemble(&zeros, &salt));
    }

    fn genhash(&self, secret: &[u8], config: &str, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let (_, salt) = self.split(config)?;

        let settings = HashSettings::default();
        let secret = prepare_secret(self.info, secret, &settings)?;

        let mut data = secret.to_vec();
        data.extend_from_slice(&salt);

        return Ok(self.assemble(&self.alg.compute(&data), &salt));
    }

    /// The stored checksum sits inside the payload, so the comparison
    /// runs over the decoded digest rather than the default checksum
    /// field path.
    fn verify(&self, secret: &[u8], hash: &str, ctx: &ContextKwds) -> PasshashResult<bool>
    {
        let (digest, _) = self.split(hash)?;

        let computed = self.genhash(secret, hash, ctx)?;
        let (recomputed, _) = self.split(computed.as_str())?;

        return Ok(PasshashCommon::consteq(&digest, &recomputed));
    }
}

/// Anything not wrapped in a `{TAG}` verbatim. RFC 2307 stores these
/// alongside tagged values, so the identify rule is simply "no brace".
pub struct LdapPlaintext;

impl SchemeHandler for LdapPlaintext
{
    fn info(&self) -> &'static SchemeInfo
    {
        return &LDAP_PLAINTEXT_INFO;
    }

    fn parse(&self, hash: &str) -> PasshashResult<ParsedHash>
    {
        if hash.len() == 0 || hash.starts_with('{') == true
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "ldap_plaintext covers non empty strings without a scheme tag");
        }

        return Ok(ParsedHash
        {
            checksum: Some(hash.to_string()),
            ..ParsedHash::default()
        });
    }

    fn hash(&self, secret: &[u8], settings: &HashSettings, _ctx: &ContextKwds) -> PasshashResult<String>
    {
        let secret = prepare_secret(&LDAP_PLAINTEXT_INFO, secret, settings)?;

        let s = std::str::from_utf8(secret)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::PasswordValue,
                    "ldap_plaintext cannot store a non utf8 secret, {}", e)
            )?;

        if s.len() == 0 || s.starts_with('{') == true
        {
            passhash_error!(PasshashErrorCode::PasswordValue,
                "ldap_plaintext cannot store an empty secret or one opening with a brace");
        }

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
        self.parse(hash)?;

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
    fn ldap_sha1_vector()
    {
        let h = LdapDigest::sha1();

        // {SHA} of "password": base64 of the raw sha1 digest
        let out = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=");

        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"Password", out.as_str(), &ctx()).unwrap(), false);

        // tags compare case insensitively
        assert_eq!(h.verify(b"password", "{sha}W6ph5Mm5Pz8GgiULbPgzG37mj9g=", &ctx()).unwrap(), true);
    }

    #[test]
    fn ldap_md5_vector()
    {
        let h = LdapDigest::md5();

        let out = h.hash(b"password", &HashSettings::default(), &ctx()).unwrap();
        assert_eq!(out.as_str(), "{MD5}X03MO1qnZdYdgyfeuILPmQ==");
        assert_eq!(h.verify(b"password", out.as_str(), &ctx()).unwrap(), true);
    }

    #[test]
    fn salted_sha1_round_trip()
    {
        let h = LdapSaltedDigest::sha1();

        let mut s = HashSettings::default();
        s.salt = Some(b"salt".to_vec());

        let out = h.hash(b"secret", &s, &ctx()).unwrap();
        assert_eq!(out.starts_with("{SSHA}"), true);
        assert_eq!(h.verify(b"secret", out.as_str(), &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"Secret", out.as_str(), &ctx()).unwrap(), false);

        let parsed = h.parse(out.as_str()).unwrap();
        assert_eq!(parsed.salt, Some(b"salt".to_vec()));

        // genconfig round trips the salt through the zeroed payload
        let cfg = h.genconfig(&s).unwrap();
        assert_eq!(h.genhash(b"secret", cfg.as_str(), &ctx()).unwrap(), out);
    }

    #[test]
    fn plaintext_rules()
    {
        let h = LdapPlaintext;

        assert_eq!(h.identify("an ordinary password"), true);
        assert_eq!(h.identify("{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g="), false);
        assert_eq!(h.identify(""), false);

        assert_eq!(h.verify(b"pw", "pw", &ctx()).unwrap(), true);
        assert_eq!(h.verify(b"pw", "pw2", &ctx()).unwrap(), false);

        let e = h.hash(b"{brace}", &HashSettings::default(), &ctx()).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::PasswordValue);
    }
}
