/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Passhash-RS
//!
//! A password hashing and verification framework: every supported
//! scheme produces a self-describing hash string and verifies secrets
//! against stored ones, and a [CryptContext] composes schemes into a
//! policy with a default, deprecations and per-category overrides.
//!
//! Schemes:
//! - crypt family: md5_crypt, sha256_crypt, sha512_crypt
//! - bcrypt family: bcrypt, bcrypt_sha256
//! - PBKDF2 family: pbkdf2_sha1, pbkdf2_sha256, pbkdf2_sha512,
//!   django_pbkdf2_sha1, django_pbkdf2_sha256
//! - memory hard: scrypt, argon2 (i/d/id)
//! - LDAP: ldap_md5, ldap_sha1, ldap_salted_md5, ldap_salted_sha1,
//!   ldap_plaintext
//! - legacy: hex_md5, hex_sha1, hex_sha256, hex_sha512, mysql41,
//!   postgres_md5, plaintext
//!
//! Files:
//! - passhash_error.rs error reporting code
//! - passhash_common.rs entropy, salts, constant time compare
//! - passhash_encoding.rs wire encodings (h64, bcrypt64, ab64, hex)
//! - passhash_hashing.rs primitive providers and backend selection
//! - passhash_mcf.rs the modular crypt format field walker
//! - passhash_hasher.rs the uniform scheme contract
//! - passhash_*.rs one file per scheme family
//! - passhash_registry.rs name to handler resolution
//! - passhash_context.rs the policy engine
//! - passhash_policy.rs the declarative policy map and INI form
//! - passhash_calibrate.rs rounds auto calibration
//! - passhash_totp.rs RFC 6238 one time passwords

pub mod passhash_error;
pub mod passhash_common;
pub mod passhash_encoding;
pub mod passhash_hashing;
pub mod passhash_hashing_sha1;
pub mod passhash_hashing_sha2;
pub mod passhash_mcf;
pub mod passhash_hasher;
pub mod passhash_md5_crypt;
pub mod passhash_sha2_crypt;
pub mod passhash_bcrypt;
pub mod passhash_pbkdf2;
pub mod passhash_scrypt;
pub mod passhash_argon2;
pub mod passhash_digest;
pub mod passhash_ldap;
pub mod passhash_registry;
pub mod passhash_policy;
pub mod passhash_context;
pub mod passhash_calibrate;
pub mod passhash_totp;

pub use self::passhash_error::{PasshashResult, PasshashRuntimeError, PasshashErrorCode};
pub use self::passhash_common::PasshashCommon;
pub use self::passhash_hashing::{PasshashHashing, HashingBackend, set_backend, active_backend};
pub use self::passhash_hasher::{
    SchemeHandler, SchemeInfo, RoundsInfo, SaltInfo, RoundsCost,
    HashSettings, ContextKwds, ParsedHash, VaryRounds,
};
pub use self::passhash_registry::Registry;
pub use self::passhash_policy::PolicyMap;
pub use self::passhash_context::CryptContext;
pub use self::passhash_calibrate::calibrate_rounds;
pub use self::passhash_totp::{Totp, OtpAlgorithm};
