/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Primitive providers: digest, HMAC and PBKDF2 over SHA-1, SHA-256 and
//! SHA-512, plus the MD5 digest used by the legacy schemes.
//!
//! Every digest family implements [PasshashHashing] once per backend
//! (RustNative always, Ring behind the `use_ring` feature). The facade
//! functions at the bottom dispatch on the active backend; both backends
//! produce identical output for identical input, so switching is purely
//! a policy matter.

use std::num::NonZeroU32;
use std::sync::OnceLock;

use md5::{Md5, Digest as DigestMd5};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};

pub use super::passhash_hashing_sha1::*;
pub use super::passhash_hashing_sha2::*;

pub trait PasshashHashing
{
    /// A function which hashes the data using the hash function.
    fn hash(data: &[u8]) -> Vec<u8>;

    /// A function which performs an HMAC using the hash function.
    fn hmac(data: &[u8], key: &[u8]) -> PasshashResult<Vec<u8>>;

    /// A function which does PBKDF2 key derivation using the hash
    /// function. Output length equals the digest size.
    fn derive(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> PasshashResult<Vec<u8>>;
}

/// MD5 digest. No alternate backend exists for it, the legacy schemes
/// always use the RustNative implementation.
pub
fn md5_digest(data: &[u8]) -> Vec<u8>
{
    let hash = Md5::digest(data);

    return Vec::from(hash.as_slice());
}

/// Digest families with more than one available backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pbkdf2Digest
{
    Sha1,
    Sha256,
    Sha512,
}

/// Candidate primitive backends, probed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashingBackend
{
    RustNative,

    #[cfg(feature = "use_ring")]
    Ring,
}

impl HashingBackend
{
    pub
    fn name(&self) -> &'static str
    {
        match *self
        {
            Self::RustNative => return "rust-native",

            #[cfg(feature = "use_ring")]
            Self::Ring => return "ring",
        }
    }

    fn from_name(name: &str) -> PasshashResult<Self>
    {
        match name
        {
            "rust-native" => return Ok(Self::RustNative),

            #[cfg(feature = "use_ring")]
            "ring" => return Ok(Self::Ring),

            _ => passhash_error!(PasshashErrorCode::MissingBackend,
                    "unknown or unavailable backend: {}", name),
        }
    }
}

static BACKEND_PIN: OnceLock<HashingBackend> = OnceLock::new();

/// Pins the primitive backend. Published once: the first successful pin
/// wins for the lifetime of the process. Pinning never changes hash
/// output, only which implementation computes it.
///
/// # Throws
///
/// [PasshashErrorCode::MissingBackend] if the name is unknown or the
/// backend is compiled out.
pub
fn set_backend(name: &str) -> PasshashResult<()>
{
    let backend = HashingBackend::from_name(name)?;

    let stored = *BACKEND_PIN.get_or_init(|| backend);

    if stored != backend
    {
        passhash_error!(PasshashErrorCode::Config,
            "backend already pinned to: {}", stored.name());
    }

    return Ok(());
}

/// Resolves the active backend: explicit pin, then the documented
/// `PASSHASH_BACKEND` environment variable, then the first available.
pub
fn active_backend() -> HashingBackend
{
    let resolved = *BACKEND_PIN.get_or_init(||
        {
            match std::env::var("PASSHASH_BACKEND")
            {
                Ok(name) =>
                {
                    match HashingBackend::from_name(name.as_str())
                    {
                        Ok(b) => b,
                        Err(_) => HashingBackend::RustNative,
                    }
                },
                Err(_) => HashingBackend::RustNative,
            }
        });

    return resolved;
}

/// Plain digest through the active backend.
pub
fn digest_bytes(digest: Pbkdf2Digest, data: &[u8]) -> Vec<u8>
{
    match active_backend()
    {
        HashingBackend::RustNative =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1RustNative::hash(data),
                Pbkdf2Digest::Sha256 => return PasshashSha256RustNative::hash(data),
                Pbkdf2Digest::Sha512 => return PasshashSha512RustNative::hash(data),
            }
        },

        #[cfg(feature = "use_ring")]
        HashingBackend::Ring =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1Ring::hash(data),
                Pbkdf2Digest::Sha256 => return PasshashSha256Ring::hash(data),
                Pbkdf2Digest::Sha512 => return PasshashSha512Ring::hash(data),
            }
        },
    }
}

/// HMAC through the active backend.
pub
fn hmac_digest(digest: Pbkdf2Digest, key: &[u8], data: &[u8]) -> PasshashResult<Vec<u8>>
{
    match active_backend()
    {
        HashingBackend::RustNative =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1RustNative::hmac(data, key),
                Pbkdf2Digest::Sha256 => return PasshashSha256RustNative::hmac(data, key),
                Pbkdf2Digest::Sha512 => return PasshashSha512RustNative::hmac(data, key),
            }
        },

        #[cfg(feature = "use_ring")]
        HashingBackend::Ring =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1Ring::hmac(data, key),
                Pbkdf2Digest::Sha256 => return PasshashSha256Ring::hmac(data, key),
                Pbkdf2Digest::Sha512 => return PasshashSha512Ring::hmac(data, key),
            }
        },
    }
}

/// PBKDF2 through the active backend.
///
/// # Throws
///
/// [PasshashErrorCode::Config] on a zero iteration count.
pub
fn pbkdf2_derive(
    digest: Pbkdf2Digest,
    password: &[u8],
    salt: &[u8],
    iterations: u32
) -> PasshashResult<Vec<u8>>
{
    let iters = NonZeroU32::new(iterations)
        .ok_or_else(||
            passhash_error_map!(PasshashErrorCode::Config, "pbkdf2 iteration count is zero")
        )?;

    match active_backend()
    {
        HashingBackend::RustNative =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1RustNative::derive(password, salt, iters),
                Pbkdf2Digest::Sha256 => return PasshashSha256RustNative::derive(password, salt, iters),
                Pbkdf2Digest::Sha512 => return PasshashSha512RustNative::derive(password, salt, iters),
            }
        },

        #[cfg(feature = "use_ring")]
        HashingBackend::Ring =>
        {
            match digest
            {
                Pbkdf2Digest::Sha1 => return PasshashSha1Ring::derive(password, salt, iters),
                Pbkdf2Digest::Sha256 => return PasshashSha256Ring::derive(password, salt, iters),
                Pbkdf2Digest::Sha512 => return PasshashSha512Ring::derive(password, salt, iters),
            }
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn pbkdf2_rfc6070_sha1()
    {
        // RFC 6070 case 1: P="password", S="salt", c=1
        let dk = pbkdf2_derive(Pbkdf2Digest::Sha1, b"password", b"salt", 1).unwrap();
        assert_eq!(hex::encode(&dk).as_str(), "0c60c80f961f0e71f3a9b524af6012062fe037a6");

        // case 2: c=2
        let dk = pbkdf2_derive(Pbkdf2Digest::Sha1, b"password", b"salt", 2).unwrap();
        assert_eq!(hex::encode(&dk).as_str(), "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957");
    }

    #[test]
    fn pbkdf2_sha256_vector()
    {
        let dk = pbkdf2_derive(Pbkdf2Digest::Sha256, b"password", b"salt", 1).unwrap();
        assert_eq!(
            hex::encode(&dk).as_str(),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b");
    }

    #[test]
    fn pbkdf2_rejects_zero_iterations()
    {
        let res = pbkdf2_derive(Pbkdf2Digest::Sha256, b"password", b"salt", 0);
        assert_eq!(res.is_err(), true);
    }

    #[test]
    fn md5_digest_vector()
    {
        assert_eq!(hex::encode(md5_digest(b"abc")).as_str(),
            "900150983cd24fb0d6963f7d28e17f72");
    }
}
