/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::Duration;

use getrandom::getrandom;
use subtle::ConstantTimeEq;

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};

pub struct PasshashCommon{}

impl PasshashCommon
{
    /// Generates a random sequence of bytes from the OS entropy source.
    ///
    /// # Arguments
    ///
    /// * `len` - a length of the array
    ///
    /// # Returns
    ///
    /// * [PasshashResult] Ok - elements or Error
    pub
    fn random_bytes(len: usize) -> PasshashResult<Vec<u8>>
    {
        let mut data = vec![0_u8; len];

        getrandom(&mut data)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::External, "getrandom err, {}", e)
            )?;

        return Ok(data);
    }

    /// Generates a random u32, used for rounds jitter.
    pub
    fn random_u32() -> PasshashResult<u32>
    {
        let b = PasshashCommon::random_bytes(4)?;

        return Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
    }

    /// Generates a salt string of `len` chars drawn uniformly from
    /// `alphabet`. A 64 char alphabet is sampled by 6 bit masking,
    /// anything smaller falls back to rejection sampling so the draw
    /// stays unbiased.
    ///
    /// # Arguments
    ///
    /// * `len` - number of salt characters
    ///
    /// * `alphabet` - the scheme's declared salt alphabet
    ///
    /// # Returns
    ///
    /// * [PasshashResult] - the salt bytes, all members of `alphabet`
    pub
    fn random_salt(len: usize, alphabet: &str) -> PasshashResult<Vec<u8>>
    {
        let chars = alphabet.as_bytes();

        if chars.len() == 0 || chars.len() > 256
        {
            passhash_error!(PasshashErrorCode::Config,
                "salt alphabet size: '{}' is out of range", chars.len());
        }

        let mut out = Vec::with_capacity(len);

        if chars.len() == 64
        {
            let raw = PasshashCommon::random_bytes(len)?;

            for b in raw
            {
                out.push(chars[(b & 0x3F) as usize]);
            }

            return Ok(out);
        }

        // rejection sampling: accept only bytes below the largest
        // multiple of the alphabet size
        let limit: u16 = 256 - (256 % chars.len() as u16);

        while out.len() < len
        {
            let raw = PasshashCommon::random_bytes(len - out.len() + 8)?;

            for b in raw
            {
                if (b as u16) < limit
                {
                    out.push(chars[(b as usize) % chars.len()]);

                    if out.len() == len
                    {
                        break;
                    }
                }
            }
        }

        return Ok(out);
    }

    /// Compares two byte strings in constant time. A length mismatch
    /// returns false without leaking the position of the difference.
    pub
    fn consteq(a: &[u8], b: &[u8]) -> bool
    {
        return bool::from(a.ct_eq(b));
    }

    /// Parses a policy duration value: `350ms`, `2s`, or a bare number
    /// of milliseconds.
    ///
    /// # Throws
    ///
    /// [PasshashErrorCode::Config] on anything unparseable.
    pub
    fn parse_duration(val: &str) -> PasshashResult<Duration>
    {
        let v = val.trim();

        let (num, unit_ms) =
            if let Some(n) = v.strip_suffix("ms")
            {
                (n, 1_u64)
            }
            else if let Some(n) = v.strip_suffix('s')
            {
                (n, 1000_u64)
            }
            else
            {
                (v, 1_u64)
            };

        let parsed = u64::from_str_radix(num.trim(), 10)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::Config,
                    "duration value: '{}' err, {}", PasshashCommon::sanitize_str(val), e)
            )?;

        return Ok(Duration::from_millis(parsed * unit_ms));
    }
}

impl PasshashCommon
{
    pub(crate)
    fn sanitize_char(c: char) -> String
    {
        if c.is_ascii_graphic() == true
        {
            return c.to_string();
        }
        else
        {
            let mut buf = [0_u8; 4];
                c.encode_utf8(&mut buf);

            let formatted: String =
                buf[0..c.len_utf8()].into_iter()
                    .map(|c| format!("\\x{:02x}", c))
                    .collect();

            return formatted;
        }
    }

    pub(crate)
    fn sanitize_str(st: &str) -> String
    {
        let mut out = String::with_capacity(st.len());

        for c in st.chars()
        {
            if c.is_ascii_alphanumeric() == true ||
                c.is_ascii_punctuation() == true ||
                c == ' '
            {
                out.push(c);
            }
            else
            {
                out.push_str(PasshashCommon::sanitize_char(c).as_str());
            }
        }

        return out;
    }
}
