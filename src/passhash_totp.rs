/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Time based one-time passwords per RFC 6238, bundled with the
//! password hashing core for second-factor flows. Key material wraps
//! from raw bytes, hex or base64; validation walks a ± drift window of
//! periods around the presented time.

use std::time::{SystemTime, UNIX_EPOCH};

use zeroize::Zeroize;

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;
use super::passhash_encoding::Encoding;
use super::passhash_hashing::{Pbkdf2Digest, hmac_digest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpAlgorithm
{
    Sha1,
    Sha256,
    Sha512,
}

impl OtpAlgorithm
{
    fn digest(&self) -> Pbkdf2Digest
    {
        match *self
        {
            Self::Sha1 => return Pbkdf2Digest::Sha1,
            Self::Sha256 => return Pbkdf2Digest::Sha256,
            Self::Sha512 => return Pbkdf2Digest::Sha512,
        }
    }
}

pub const TOTP_DEFAULT_PERIOD: u64 = 30;
pub const TOTP_DEFAULT_DIGITS: u32 = 6;

pub struct Totp
{
    key: Vec<u8>,
    digits: u32,
    period: u64,
    algorithm: OtpAlgorithm,
}

impl Drop for Totp
{
    fn drop(&mut self)
    {
        self.key.zeroize();
    }
}

impl Totp
{
    /// Wraps raw key material.
    ///
    /// # Throws
    ///
    /// [PasshashErrorCode::Config] on an empty key, a zero period or a
    /// digit count outside 6..10.
    pub
    fn new(key: Vec<u8>, digits: u32, period: u64, algorithm: OtpAlgorithm) -> PasshashResult<Self>
    {
        if key.len() == 0
        {
            passhash_error!(PasshashErrorCode::Config, "empty TOTP key");
        }

        if digits < 6 || digits > 10
        {
            passhash_error!(PasshashErrorCode::Config, "digits: {} outside of range 6..10", digits);
        }

        if period == 0
        {
            passhash_error!(PasshashErrorCode::Config, "period must be positive");
        }

        return Ok(Totp{key: key, digits: digits, period: period, algorithm: algorithm});
    }

    /// Default shape: 6 digits, 30 second period, SHA-1.
    pub
    fn with_defaults(key: Vec<u8>) -> PasshashResult<Self>
    {
        return Totp::new(key, TOTP_DEFAULT_DIGITS, TOTP_DEFAULT_PERIOD, OtpAlgorithm::Sha1);
    }

    pub
    fn from_hex(key: &str, digits: u32, period: u64, algorithm: OtpAlgorithm) -> PasshashResult<Self>
    {
        let raw = Encoding::hex_decode(key)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "TOTP key, {}", e))?;

        return Totp::new(raw, digits, period, algorithm);
    }

    pub
    fn from_b64(key: &str, digits: u32, period: u64, algorithm: OtpAlgorithm) -> PasshashResult<Self>
    {
        let raw = Encoding::b64_decode(key)
            .map_err(|e| passhash_error_map!(PasshashErrorCode::Config, "TOTP key, {}", e))?;

        return Totp::new(raw, digits, period, algorithm);
    }

    /// The HOTP truncation of one counter value.
    fn hotp(&self, counter: u64) -> PasshashResult<String>
    {
        let mac = hmac_digest(self.algorithm.digest(), &self.key, &counter.to_be_bytes())?;

        let offset = (mac[mac.len() - 1] & 0x0F) as usize;

        let code = ((mac[offset] as u32 & 0x7F) << 24)
            | ((mac[offset + 1] as u32) << 16)
            | ((mac[offset + 2] as u32) << 8)
            | (mac[offset + 3] as u32);

        let modulus = 10_u64.pow(self.digits);
        let value = (code as u64) % modulus;

        return Ok(format!("{:0width$}", value, width = self.digits as usize));
    }

    /// The code for an absolute unix time.
    pub
    fn generate_at(&self, unix_time: u64) -> PasshashResult<String>
    {
        return self.hotp(unix_time / self.period);
    }

    /// The code for the current system clock.
    pub
    fn generate(&self) -> PasshashResult<String>
    {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::External, "system clock err, {}", e)
            )?;

        return self.generate_at(now.as_secs());
    }

    /// Validates a presented code against `unix_time` with a drift
    /// window of ± `window` periods. Comparison is constant time per
    /// candidate; the window order does not leak which slot matched.
    pub
    fn verify_at(&self, code: &str, unix_time: u64, window: u64) -> PasshashResult<bool>
    {
        if code.len() != self.digits as usize
        {
            return Ok(false);
        }

        let center = unix_time / self.period;
        let lo = center.saturating_sub(window);
        let hi = center.saturating_add(window);

        let mut matched = false;

        for counter in lo..=hi
        {
            let expected = self.hotp(counter)?;

            if PasshashCommon::consteq(expected.as_bytes(), code.as_bytes()) == true
            {
                matched = true;
            }
        }

        return Ok(matched);
    }

    /// Validates against the current system clock.
    pub
    fn verify(&self, code: &str, window: u64) -> PasshashResult<bool>
    {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::External, "system clock err, {}", e)
            )?;

        return self.verify_at(code, now.as_secs(), window);
    }
}
