/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Wire encodings shared by the scheme catalogue:
//!
//! - h64: the little endian 6 bit encoding of the crypt family, emitted
//!   through a per scheme transpose map,
//! - bcrypt base64: standard bit order over the `./A-Za-z0-9` alphabet,
//!   22 char salts with 4 unused trailing bits,
//! - ab64: standard base64 with `+` swapped for `.` and no padding,
//! - standard base64 and hex passthroughs.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;

/// The crypt family salt/checksum alphabet, in encoding value order.
pub const H64_CHARS: &'static str =
    "./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// The bcrypt salt/checksum alphabet, in encoding value order.
pub const BCRYPT64_CHARS: &'static str =
    "./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const HEX_LOWER_CHARS: &'static str = "0123456789abcdef";
pub const HEX_UPPER_CHARS: &'static str = "0123456789ABCDEF";

/// Standard base64 alphabet plus padding, for checksum validation.
pub const B64_CHARS: &'static str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

/// Adapted base64 alphabet (`+` replaced by `.`, unpadded).
pub const AB64_CHARS: &'static str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789./";

/// Output position -> digest index maps for the crypt family. The
/// reference implementations interleave the digest before encoding;
/// applying the map and then encoding little endian triplets gives the
/// identical character stream.
pub const MD5_TRANSPOSE: &'static [u8] = &[
    12,  6,  0, 13,  7,  1, 14,  8,  2, 15,  9,  3,  5, 10,  4, 11,
];

pub const SHA256_TRANSPOSE: &'static [u8] = &[
    20, 10,  0, 11,  1, 21,  2, 22, 12, 23, 13,  3, 14,  4, 24,  5,
    25, 15, 26, 16,  6, 17,  7, 27,  8, 28, 18, 29, 19,  9, 30, 31,
];

pub const SHA512_TRANSPOSE: &'static [u8] = &[
    42, 21,  0,  1, 43, 22, 23,  2, 44, 45, 24,  3,  4, 46, 25, 26,
     5, 47, 48, 27,  6,  7, 49, 28, 29,  8, 50, 51, 30,  9, 10, 52,
    31, 32, 11, 53, 54, 33, 12, 13, 55, 34, 35, 14, 56, 57, 36, 15,
    16, 58, 37, 38, 17, 59, 60, 39, 18, 19, 61, 40, 41, 20, 62, 63,
];

const BCRYPT64_CFG: GeneralPurposeConfig =
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true);

/// bcrypt base64 engine. Decoding tolerates set trailing bits so that
/// salts with incorrectly set padding can be read and repaired.
pub const BCRYPT64: GeneralPurpose = GeneralPurpose::new(&alphabet::BCRYPT, BCRYPT64_CFG);

pub struct Encoding{}

impl Encoding
{
    /// Encodes a digest with the crypt family h64 encoding.
    ///
    /// # Arguments
    ///
    /// * `digest` - raw digest bytes
    ///
    /// * `transpose` - output position -> digest index map; must have
    ///    the same length as `digest`
    pub
    fn h64_encode_transposed(digest: &[u8], transpose: &[u8]) -> String
    {
        let h64 = H64_CHARS.as_bytes();
        let mut out = String::with_capacity((digest.len() * 4 + 2) / 3);

        let mut it = transpose.chunks(3);

        while let Some(chunk) = it.next()
        {
            let mut v: u32 = 0;
            for (i, idx) in chunk.iter().enumerate()
            {
                v |= (digest[*idx as usize] as u32) << (8 * i);
            }

            // 6 bits per char, low bits first
            let nchars = (chunk.len() * 8 + 5) / 6;
            for _ in 0..nchars
            {
                out.push(h64[(v & 0x3F) as usize] as char);
                v >>= 6;
            }
        }

        return out;
    }

    /// Encodes 16 raw bytes as a canonical 22 char bcrypt salt.
    pub
    fn bcrypt64_encode(raw: &[u8]) -> String
    {
        return BCRYPT64.encode(raw);
    }

    /// Decodes a bcrypt base64 string, tolerating set trailing bits.
    ///
    /// # Throws
    ///
    /// [PasshashErrorCode::MalformedHash] on a character outside the
    /// bcrypt alphabet.
    pub
    fn bcrypt64_decode(data: &str) -> PasshashResult<Vec<u8>>
    {
        return BCRYPT64.decode(data)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::MalformedHash,
                    "bcrypt64 data: '{}' err, {}", PasshashCommon::sanitize_str(data), e)
            );
    }

    /// Repairs the unused trailing bits of a 22 char bcrypt salt. The
    /// final position may only carry the values of `.`, `O`, `e` or
    /// `u`; anything else is masked down.
    ///
    /// # Returns
    ///
    /// * the canonical salt and whether a repair took place
    pub
    fn bcrypt64_repair_salt(salt: &str) -> PasshashResult<(String, bool)>
    {
        let bytes = salt.as_bytes();

        if bytes.len() == 0
        {
            passhash_error!(PasshashErrorCode::MalformedHash, "empty bcrypt salt");
        }

        let last = bytes[bytes.len() - 1];

        let val = match BCRYPT64_CHARS.as_bytes().iter().position(|c| *c == last)
        {
            Some(v) => v as u8,
            None => passhash_error!(PasshashErrorCode::MalformedHash,
                "bcrypt salt char: '{}' outside alphabet",
                PasshashCommon::sanitize_char(last as char)),
        };

        // 21 chars carry 126 bits, the final char contributes 2 more:
        // only its top 2 bits are data
        let masked = val & 0x30;

        if masked == val
        {
            return Ok((salt.to_string(), false));
        }

        let mut repaired = salt[..salt.len() - 1].to_string();
        repaired.push(BCRYPT64_CHARS.as_bytes()[masked as usize] as char);

        return Ok((repaired, true));
    }

    /// Encodes with the adapted base64 of the pbkdf2/scrypt wire
    /// formats: standard alphabet with
    /// `+` replaced by `.`, no padding.
    pub
    fn ab64_encode(raw: &[u8]) -> String
    {
        return STANDARD_NO_PAD.encode(raw).replace('+', ".");
    }

    pub
    fn ab64_decode(data: &str) -> PasshashResult<Vec<u8>>
    {
        return STANDARD_NO_PAD.decode(data.replace('.', "+"))
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::MalformedHash,
                    "ab64 data: '{}' err, {}", PasshashCommon::sanitize_str(data), e)
            );
    }

    pub
    fn b64_encode(raw: &[u8]) -> String
    {
        return STANDARD.encode(raw);
    }

    pub
    fn b64_decode(data: &str) -> PasshashResult<Vec<u8>>
    {
        return STANDARD.decode(data)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::MalformedHash,
                    "base64 data: '{}' err, {}", PasshashCommon::sanitize_str(data), e)
            );
    }

    pub
    fn b64_encode_nopad(raw: &[u8]) -> String
    {
        return STANDARD_NO_PAD.encode(raw);
    }

    pub
    fn b64_decode_nopad(data: &str) -> PasshashResult<Vec<u8>>
    {
        return STANDARD_NO_PAD.decode(data)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::MalformedHash,
                    "base64 data: '{}' err, {}", PasshashCommon::sanitize_str(data), e)
            );
    }

    pub
    fn hex_encode_lower(raw: &[u8]) -> String
    {
        return hex::encode(raw);
    }

    pub
    fn hex_encode_upper(raw: &[u8]) -> String
    {
        return hex::encode_upper(raw);
    }

    pub
    fn hex_decode(data: &str) -> PasshashResult<Vec<u8>>
    {
        return hex::decode(data)
            .map_err(|e|
                passhash_error_map!(PasshashErrorCode::MalformedHash,
                    "hex data: '{}' err, {}", PasshashCommon::sanitize_str(data), e)
            );
    }

    /// Checks every byte of `data` against `alphabet`.
    pub
    fn validate_chars(data: &str, alphabet: &str) -> bool
    {
        for b in data.bytes()
        {
            if alphabet.as_bytes().contains(&b) == false
            {
                return false;
            }
        }

        return true;
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn h64_md5_width()
    {
        // 16 bytes expand to 22 chars, all inside the h64 alphabet
        let digest: Vec<u8> = (0_u8..16).collect();
        let enc = Encoding::h64_encode_transposed(&digest, MD5_TRANSPOSE);

        assert_eq!(enc.len(), 22);
        assert_eq!(Encoding::validate_chars(&enc, H64_CHARS), true);
    }

    #[test]
    fn h64_sha2_widths()
    {
        let digest: Vec<u8> = (0_u8..32).collect();
        assert_eq!(Encoding::h64_encode_transposed(&digest, SHA256_TRANSPOSE).len(), 43);

        let digest: Vec<u8> = (0_u8..64).collect();
        assert_eq!(Encoding::h64_encode_transposed(&digest, SHA512_TRANSPOSE).len(), 86);
    }

    #[test]
    fn bcrypt64_roundtrip()
    {
        let raw = [0xAB_u8; 16];
        let enc = Encoding::bcrypt64_encode(&raw);

        assert_eq!(enc.len(), 22);
        assert_eq!(Encoding::bcrypt64_decode(&enc).unwrap(), raw.to_vec());
    }

    #[test]
    fn bcrypt64_salt_repair()
    {
        // from the bcrypt padding law: the final salt char may only be
        // one of ". O e u"; 'c' masks down to 'O'
        let (fixed, changed) = Encoding::bcrypt64_repair_salt("yjDgE74RJkeqC0/1NheSSc").unwrap();
        assert_eq!(fixed.as_str(), "yjDgE74RJkeqC0/1NheSSO");
        assert_eq!(changed, true);

        let (kept, changed) = Encoding::bcrypt64_repair_salt("yjDgE74RJkeqC0/1NheSSO").unwrap();
        assert_eq!(kept.as_str(), "yjDgE74RJkeqC0/1NheSSO");
        assert_eq!(changed, false);

        assert_eq!(Encoding::bcrypt64_repair_salt("abc!").is_err(), true);
    }

    #[test]
    fn ab64_swaps_plus()
    {
        // 0xFF 0xEF encodes to "/+8" under standard base64
        let enc = Encoding::ab64_encode(&[0xFF, 0xEF]);
        assert_eq!(enc.as_str(), "/.8");

        assert_eq!(Encoding::ab64_decode("/.8").unwrap(), vec![0xFF, 0xEF]);
    }
}
