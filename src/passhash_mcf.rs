/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Modular Crypt Format field walker. The grammar is
//! `$<ident>$[<params>$]<salt>$<checksum>`: the walker splits the raw
//! string, enforces the structural rules every scheme shares (leading
//! `$`, printable ASCII, no empty interior fields) and leaves the field
//! schema to the scheme.

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_common::PasshashCommon;

/// A split MCF hash with lifetime 'par tied to the source string.
#[derive(Debug)]
pub struct McfHash<'par>
{
    ident: &'par str,
    fields: Vec<&'par str>,
}

impl<'par> McfHash<'par>
{
    /// Splits a raw `$` delimited string. The final field may be empty
    /// (a config string carries no checksum yet); any other empty field
    /// is structural damage.
    pub
    fn parse(raw: &'par str) -> PasshashResult<McfHash<'par>>
    {
        for (pos, c) in raw.chars().enumerate()
        {
            if c.is_ascii_graphic() == false
            {
                passhash_error!(PasshashErrorCode::MalformedHash,
                    "expected printable ASCII \
                    but found char: {} near position: {}",
                    PasshashCommon::sanitize_char(c), pos);
            }
        }

        let rest = match raw.strip_prefix('$')
        {
            Some(r) => r,
            None => passhash_error!(PasshashErrorCode::MalformedHash,
                "missing '$' prefix in: '{}'", PasshashCommon::sanitize_str(raw)),
        };

        let mut it = rest.split('$');

        let ident = match it.next()
        {
            Some(i) if i.len() > 0 => i,
            _ => passhash_error!(PasshashErrorCode::MalformedHash,
                "empty ident in: '{}'", PasshashCommon::sanitize_str(raw)),
        };

        let fields: Vec<&str> = it.collect();

        for (i, f) in fields.iter().enumerate()
        {
            if f.len() == 0 && i + 1 != fields.len()
            {
                passhash_error!(PasshashErrorCode::MalformedHash,
                    "empty field {} in: '{}'", i + 1, PasshashCommon::sanitize_str(raw));
            }
        }

        return Ok(McfHash{ident: ident, fields: fields});
    }

    #[inline]
    pub
    fn ident(&self) -> &'par str
    {
        return self.ident;
    }

    /// Fields after the ident, in order. A trailing empty field stands
    /// for an absent checksum.
    #[inline]
    pub
    fn fields(&self) -> &[&'par str]
    {
        return &self.fields;
    }

    /// Requires an exact field count.
    pub
    fn expect_fields(&self, n: usize) -> PasshashResult<()>
    {
        if self.fields.len() != n
        {
            passhash_error!(PasshashErrorCode::MalformedHash,
                "{} fields after ident '{}', expected {}",
                self.fields.len(), PasshashCommon::sanitize_str(self.ident), n);
        }

        return Ok(());
    }
}

/// Decodes a decimal field. Schemes whose grammar forbids leading
/// zeros (sha2-crypt rounds, bcrypt-sha256 r= value) pass
/// `allow_leading_zero = false`; a lone `0` is still accepted.
pub
fn parse_decimal(field: &str, what: &str, allow_leading_zero: bool) -> PasshashResult<u32>
{
    if field.len() == 0
    {
        passhash_error!(PasshashErrorCode::MalformedHash, "empty {} field", what);
    }

    if allow_leading_zero == false && field.len() > 1 && field.starts_with('0') == true
    {
        passhash_error!(PasshashErrorCode::MalformedHash,
            "{} field: '{}' has a leading zero", what, PasshashCommon::sanitize_str(field));
    }

    let val = u32::from_str_radix(field, 10)
        .map_err(|e|
            passhash_error_map!(PasshashErrorCode::MalformedHash,
                "{} field: '{}' conversion err, {}",
                what, PasshashCommon::sanitize_str(field), e)
        )?;

    return Ok(val);
}

/// Decodes a `k=v,k=v` parameter field (argon2, scrypt, bcrypt-sha256
/// style), preserving order.
pub
fn parse_params(field: &str) -> PasshashResult<Vec<(&str, &str)>>
{
    let mut out = Vec::new();

    for item in field.split(',')
    {
        match item.split_once('=')
        {
            Some((k, v)) if k.len() > 0 && v.len() > 0 =>
            {
                out.push((k, v));
            },
            _ => passhash_error!(PasshashErrorCode::MalformedHash,
                "parameter item: '{}' is not k=v", PasshashCommon::sanitize_str(item)),
        }
    }

    return Ok(out);
}

/// Looks up a required parameter parsed by [parse_params].
pub
fn require_param<'a>(params: &[(&'a str, &'a str)], key: &str) -> PasshashResult<&'a str>
{
    for &(k, v) in params
    {
        if k == key
        {
            return Ok(v);
        }
    }

    passhash_error!(PasshashErrorCode::MalformedHash, "parameter '{}' was not found", key);
}
