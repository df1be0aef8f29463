/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::num::NonZeroU32;

use sha2::{Sha256, Sha512, Digest as Digest2};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;

use crate::PasshashHashing;

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error_map};

/// A SHA-256 provider based on PBKDF2, Sha, Hmac.
pub struct PasshashSha256RustNative;

impl PasshashHashing for PasshashSha256RustNative
{
    fn hash(data: &[u8]) -> Vec<u8>
    {
        let hash = Sha256::digest(data);

        return Vec::from(hash.as_slice());
    }

    fn hmac(data: &[u8], key: &[u8]) -> PasshashResult<Vec<u8>>
    {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(key)
                .map_err(|e|
                    passhash_error_map!(PasshashErrorCode::External,
                        "hmac() Hmac::<Sha256> err, {}", e)
                )?;

        mac.update(data);

        let result = mac.finalize();
        let ret = Vec::from(result.into_bytes().as_slice());

        return Ok(ret);
    }

    fn derive(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> PasshashResult<Vec<u8>>
    {
        let mut salted = vec![0; Sha256::output_size()]; // 32
        pbkdf2::<Hmac<Sha256>>(password, salt, iterations.get(), &mut salted)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::External,
                    "pbkdf2 Hmac::<Sha256> err, {}", e)
            )?;

        return Ok(salted);
    }
}

/// A SHA-512 provider based on PBKDF2, Sha, Hmac.
pub struct PasshashSha512RustNative;

impl PasshashHashing for PasshashSha512RustNative
{
    fn hash(data: &[u8]) -> Vec<u8>
    {
        let hash = Sha512::digest(data);

        return Vec::from(hash.as_slice());
    }

    fn hmac(data: &[u8], key: &[u8]) -> PasshashResult<Vec<u8>>
    {
        let mut mac =
            Hmac::<Sha512>::new_from_slice(key)
                .map_err(|e|
                    passhash_error_map!(PasshashErrorCode::External,
                        "hmac() Hmac::<Sha512> err, {}", e)
                )?;

        mac.update(data);

        let result = mac.finalize();
        let ret = Vec::from(result.into_bytes().as_slice());

        return Ok(ret);
    }

    fn derive(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> PasshashResult<Vec<u8>>
    {
        let mut salted = vec![0; Sha512::output_size()]; //64
        pbkdf2::<Hmac<Sha512>>(password, salt, iterations.get(), &mut salted)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::External,
                    "pbkdf2 Hmac::<Sha512> err, {}", e)
            )?;

        return Ok(salted);
    }
}

#[cfg(feature = "use_ring")]
pub mod sha2_ring_based
{
    use std::num::NonZeroU32;

    use ring::{digest as ring_digest, hmac as ring_hmac, pbkdf2 as ring_pbkdf2};

    use crate::{PasshashHashing, PasshashResult};

    /// A SHA-256 provider based on Ring.
    pub struct PasshashSha256Ring;

    impl PasshashHashing for PasshashSha256Ring
    {
        fn hash(data: &[u8]) -> Vec<u8>
        {
            let hash = ring_digest::digest(&ring_digest::SHA256, data);

            return Vec::from(hash.as_ref());
        }

        fn hmac(data: &[u8], key: &[u8]) -> PasshashResult<Vec<u8>>
        {
            let s_key = ring_hmac::Key::new(ring_hmac::HMAC_SHA256, key);
            let mut mac = ring_hmac::Context::with_key(&s_key);

            mac.update(data);

            let ret: Vec<u8> = mac.sign().as_ref().into();

            return Ok(ret);
        }

        fn derive(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> PasshashResult<Vec<u8>>
        {
            let mut salted = vec![0; ring_digest::SHA256_OUTPUT_LEN];

            ring_pbkdf2::derive(ring_pbkdf2::PBKDF2_HMAC_SHA256, iterations.into(), salt, password, &mut salted);

            return Ok(salted);
        }
    }

    /// A SHA-512 provider based on Ring.
    pub struct PasshashSha512Ring;

    impl PasshashHashing for PasshashSha512Ring
    {
        fn hash(data: &[u8]) -> Vec<u8>
        {
            let hash = ring_digest::digest(&ring_digest::SHA512, data);

            return Vec::from(hash.as_ref());
        }

        fn hmac(data: &[u8], key: &[u8]) -> PasshashResult<Vec<u8>>
        {
            let s_key = ring_hmac::Key::new(ring_hmac::HMAC_SHA512, key);
            let mut mac = ring_hmac::Context::with_key(&s_key);

            mac.update(data);

            let ret: Vec<u8> = mac.sign().as_ref().into();

            return Ok(ret);
        }

        fn derive(password: &[u8], salt: &[u8], iterations: NonZeroU32) -> PasshashResult<Vec<u8>>
        {
            let mut salted = vec![0; ring_digest::SHA512_OUTPUT_LEN];

            ring_pbkdf2::derive(ring_pbkdf2::PBKDF2_HMAC_SHA512, iterations.into(), salt, password, &mut salted);

            return Ok(salted);
        }
    }
}

#[cfg(feature = "use_ring")]
pub use self::sha2_ring_based::*;
