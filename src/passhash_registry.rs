/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The name -> handler resolver. Builtin schemes live in a constant
//! table; handlers are constructed lazily on first lookup and cached
//! for the process lifetime. A publish-once overlay accepts plugin
//! registrations. Lookup is case insensitive and folds `-` to `_`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error};
use super::passhash_hasher::SchemeHandler;
use super::passhash_bcrypt::{Bcrypt, BcryptSha256};
use super::passhash_md5_crypt::Md5Crypt;
use super::passhash_sha2_crypt::Sha2Crypt;
use super::passhash_pbkdf2::{Pbkdf2Scheme, DjangoPbkdf2Scheme};
use super::passhash_scrypt::Scrypt;
use super::passhash_argon2::Argon2Scheme;
use super::passhash_digest::{HexDigest, Mysql41, PostgresMd5, Plaintext};
use super::passhash_ldap::{LdapDigest, LdapSaltedDigest, LdapPlaintext};

/// A record of the builtin table. The factory may fail, surfacing a
/// missing backend only when the scheme is first exercised.
pub struct SchemeEntry
{
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub factory: fn() -> PasshashResult<Arc<dyn SchemeHandler>>,
}

/// A table of all builtin schemes.
pub const BUILTIN_SCHEMES: &'static [SchemeEntry] =
&[
    SchemeEntry{name: "bcrypt",               aliases: &[],                  factory: || Ok(Arc::new(Bcrypt))},
    SchemeEntry{name: "bcrypt_sha256",        aliases: &["bcrypt-sha256"],   factory: || Ok(Arc::new(BcryptSha256))},
    SchemeEntry{name: "md5_crypt",            aliases: &["md5-crypt"],       factory: || Ok(Arc::new(Md5Crypt))},
    SchemeEntry{name: "sha256_crypt",         aliases: &["sha-256-crypt"],   factory: || Ok(Arc::new(Sha2Crypt::sha256()))},
    SchemeEntry{name: "sha512_crypt",         aliases: &["sha-512-crypt"],   factory: || Ok(Arc::new(Sha2Crypt::sha512()))},
    SchemeEntry{name: "pbkdf2_sha1",          aliases: &["pbkdf2-sha1"],     factory: || Ok(Arc::new(Pbkdf2Scheme::sha1()))},
    SchemeEntry{name: "pbkdf2_sha256",        aliases: &["pbkdf2-sha256"],   factory: || Ok(Arc::new(Pbkdf2Scheme::sha256()))},
    SchemeEntry{name: "pbkdf2_sha512",        aliases: &["pbkdf2-sha512"],   factory: || Ok(Arc::new(Pbkdf2Scheme::sha512()))},
    SchemeEntry{name: "django_pbkdf2_sha1",   aliases: &[],                  factory: || Ok(Arc::new(DjangoPbkdf2Scheme::sha1()))},
    SchemeEntry{name: "django_pbkdf2_sha256", aliases: &[],                  factory: || Ok(Arc::new(DjangoPbkdf2Scheme::sha256()))},
    SchemeEntry{name: "scrypt",               aliases: &[],                  factory: || Ok(Arc::new(Scrypt))},
    SchemeEntry{name: "argon2",               aliases: &["argon2id", "argon2i", "argon2d"], factory: || Ok(Arc::new(Argon2Scheme))},
    SchemeEntry{name: "ldap_md5",             aliases: &[],                  factory: || Ok(Arc::new(LdapDigest::md5()))},
    SchemeEntry{name: "ldap_sha1",            aliases: &["ldap_sha"],        factory: || Ok(Arc::new(LdapDigest::sha1()))},
    SchemeEntry{name: "ldap_salted_md5",      aliases: &[],                  factory: || Ok(Arc::new(LdapSaltedDigest::md5()))},
    SchemeEntry{name: "ldap_salted_sha1",     aliases: &["ldap_salted_sha"], factory: || Ok(Arc::new(LdapSaltedDigest::sha1()))},
    SchemeEntry{name: "ldap_plaintext",       aliases: &[],                  factory: || Ok(Arc::new(LdapPlaintext))},
    SchemeEntry{name: "hex_md5",              aliases: &[],                  factory: || Ok(Arc::new(HexDigest::md5()))},
    SchemeEntry{name: "hex_sha1",             aliases: &[],                  factory: || Ok(Arc::new(HexDigest::sha1()))},
    SchemeEntry{name: "hex_sha256",           aliases: &[],                  factory: || Ok(Arc::new(HexDigest::sha256()))},
    SchemeEntry{name: "hex_sha512",           aliases: &[],                  factory: || Ok(Arc::new(HexDigest::sha512()))},
    SchemeEntry{name: "mysql41",              aliases: &["mysql-41"],        factory: || Ok(Arc::new(Mysql41))},
    SchemeEntry{name: "postgres_md5",         aliases: &["postgres-md5"],    factory: || Ok(Arc::new(PostgresMd5))},
    SchemeEntry{name: "plaintext",            aliases: &[],                  factory: || Ok(Arc::new(Plaintext))},
];

fn normalize(name: &str) -> String
{
    return name.to_ascii_lowercase().replace('-', "_");
}

fn cache() -> &'static RwLock<HashMap<String, Arc<dyn SchemeHandler>>>
{
    static CACHE: OnceLock<RwLock<HashMap<String, Arc<dyn SchemeHandler>>>> = OnceLock::new();

    return CACHE.get_or_init(|| RwLock::new(HashMap::new()));
}

pub struct Registry{}

impl Registry
{
    /// Resolves a scheme by name or alias.
    ///
    /// # Throws
    ///
    /// * [PasshashErrorCode::UnknownHash] - no scheme of that name
    ///
    /// * [PasshashErrorCode::MissingBackend] - the scheme exists but
    ///   its factory cannot produce a working handler
    pub
    fn get(name: &str) -> PasshashResult<Arc<dyn SchemeHandler>>
    {
        let key = normalize(name);

        {
            let read = cache().read()
                .unwrap_or_else(|p| p.into_inner());

            if let Some(h) = read.get(key.as_str())
            {
                return Ok(h.clone());
            }
        }

        for entry in BUILTIN_SCHEMES
        {
            let matches =
                entry.name == key.as_str() ||
                entry.aliases.iter().any(|a| normalize(a) == key);

            if matches == true
            {
                let handler = (entry.factory)()?;

                let mut write = cache().write()
                    .unwrap_or_else(|p| p.into_inner());

                // a racing insert of the same entry is benign
                let stored = write.entry(entry.name.to_string())
                    .or_insert_with(|| handler.clone());

                return Ok(stored.clone());
            }
        }

        passhash_error!(PasshashErrorCode::UnknownHash, "unknown scheme: {}", name);
    }

    /// Publishes a plugin handler under its descriptor name. Builtin
    /// names cannot be shadowed, and a name publishes only once.
    pub
    fn register(handler: Arc<dyn SchemeHandler>) -> PasshashResult<()>
    {
        let key = normalize(handler.info().name);

        if BUILTIN_SCHEMES.iter().any(|e| e.name == key.as_str()) == true
        {
            passhash_error!(PasshashErrorCode::Config,
                "scheme name '{}' is reserved by a builtin", key);
        }

        let mut write = cache().write()
            .unwrap_or_else(|p| p.into_inner());

        if write.contains_key(key.as_str()) == true
        {
            passhash_error!(PasshashErrorCode::Config,
                "scheme name '{}' is already registered", key);
        }

        write.insert(key, handler);

        return Ok(());
    }

    /// Names of every builtin scheme, in table order.
    pub
    fn builtin_names() -> Vec<&'static str>
    {
        return BUILTIN_SCHEMES.iter().map(|e| e.name).collect();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::passhash_hasher::{SchemeInfo, ParsedHash, HashSettings, ContextKwds};
    use crate::passhash_error::PasshashErrorCode;

    #[test]
    fn lookup_and_aliases()
    {
        let h = Registry::get("sha256_crypt").unwrap();
        assert_eq!(h.info().name, "sha256_crypt");

        // alias, case folding and dash folding
        assert_eq!(Registry::get("SHA-256-CRYPT").unwrap().info().name, "sha256_crypt");
        assert_eq!(Registry::get("Argon2ID").unwrap().info().name, "argon2");

        let e = Registry::get("sha1024_crypt").unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::UnknownHash);
    }

    #[test]
    fn cache_returns_the_same_handler()
    {
        let a = Registry::get("bcrypt").unwrap();
        let b = Registry::get("bcrypt").unwrap();

        assert_eq!(Arc::ptr_eq(&a, &b), true);
    }

    #[test]
    fn plugin_registration()
    {
        static TOY_INFO: SchemeInfo = SchemeInfo
        {
            name: "toy_scheme",
            aliases: &[],
            idents: &["toy"],
            setting_kwds: &[],
            context_kwds: &[],
            rounds: None,
            salt: None,
            checksum_size: 0,
            checksum_chars: "",
            truncate_size: None,
            forbids_nul: false,
        };

        struct Toy;

        impl crate::passhash_hasher::SchemeHandler for Toy
        {
            fn info(&self) -> &'static SchemeInfo
            {
                return &TOY_INFO;
            }

            fn parse(&self, hash: &str) -> crate::PasshashResult<ParsedHash>
            {
                let _ = hash;

                return Ok(ParsedHash::default());
            }

            fn hash(&self, _s: &[u8], _k: &HashSettings, _c: &ContextKwds) -> crate::PasshashResult<String>
            {
                return Ok("toy".to_string());
            }

            fn genconfig(&self, _k: &HashSettings) -> crate::PasshashResult<String>
            {
                return Ok(String::new());
            }

            fn genhash(&self, _s: &[u8], _c: &str, _x: &ContextKwds) -> crate::PasshashResult<String>
            {
                return Ok("toy".to_string());
            }
        }

        Registry::register(Arc::new(Toy)).unwrap();
        assert_eq!(Registry::get("toy_scheme").unwrap().info().name, "toy_scheme");

        // double publication and builtin shadowing are refused
        assert_eq!(Registry::register(Arc::new(Toy)).is_err(), true);

        struct Shadow;

        impl crate::passhash_hasher::SchemeHandler for Shadow
        {
            fn info(&self) -> &'static SchemeInfo
            {
                return &crate::passhash_bcrypt::BCRYPT_INFO;
            }

            fn parse(&self, _h: &str) -> crate::PasshashResult<ParsedHash>
            {
                return Ok(ParsedHash::default());
            }

            fn hash(&self, _s: &[u8], _k: &HashSettings, _c: &ContextKwds) -> crate::PasshashResult<String>
            {
                return Ok(String::new());
            }

            fn genconfig(&self, _k: &HashSettings) -> crate::PasshashResult<String>
            {
                return Ok(String::new());
            }

            fn genhash(&self, _s: &[u8], _c: &str, _x: &ContextKwds) -> crate::PasshashResult<String>
            {
                return Ok(String::new());
            }
        }

        assert_eq!(Registry::register(Arc::new(Shadow)).is_err(), true);
    }
}
