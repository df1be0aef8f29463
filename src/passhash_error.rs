/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

/// A runtime error. Carries a stable [PasshashErrorCode] for programmatic
/// handling and a human readable message. The message never contains the
/// secret.
pub struct PasshashRuntimeError
{
    err_code: PasshashErrorCode,
    message: String,
}

impl PasshashRuntimeError
{
    pub
    fn new(err_code: PasshashErrorCode, msg: String) -> Self
    {
        return PasshashRuntimeError{err_code: err_code, message: msg};
    }

    /// Returns the stable kind tag of this error.
    pub
    fn err_code(&self) -> PasshashErrorCode
    {
        return self.err_code;
    }

    /// Shortcut: true if the error marks a structurally invalid hash.
    pub
    fn is_malformed(&self) -> bool
    {
        return self.err_code == PasshashErrorCode::MalformedHash;
    }
}

impl fmt::Display for PasshashRuntimeError
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "passhash: {}, {}", self.err_code, self.message)
    }
}

impl fmt::Debug for PasshashRuntimeError
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "passhash: {}, {}", self.err_code, self.message)
    }
}

/// Stable error kinds. Parsing errors distinguish structural damage
/// ([Self::MalformedHash]) from out-of-range parameters
/// ([Self::InvalidHash]): `identify` treats only the former as a
/// non-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasshashErrorCode
{
    /// Hash string is structurally invalid: bad delimiters, bad
    /// alphabet, wrong field length.
    MalformedHash,

    /// Hash string is well formed but a parameter is outside the
    /// scheme's accepted range.
    InvalidHash,

    /// No configured scheme matches the hash string.
    UnknownHash,

    /// The scheme is recognized but no usable backend is available.
    MissingBackend,

    /// The secret exceeds the scheme limit and policy forbids
    /// truncation.
    PasswordSize,

    /// bcrypt family: secret longer than the truncate size while
    /// `truncate_error` is in force.
    PasswordTruncate,

    /// The secret contains a NUL byte where the scheme forbids it.
    PasswordValue,

    /// Invalid policy map or parameter out of range at construction.
    Config,

    /// A primitive provider reported a failure.
    External,
}

impl fmt::Display for PasshashErrorCode
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match *self
        {
            Self::MalformedHash => write!(f, "Malformed Hash"),
            Self::InvalidHash => write!(f, "Invalid Hash Parameters"),
            Self::UnknownHash => write!(f, "Unknown Hash"),
            Self::MissingBackend => write!(f, "Missing Backend"),
            Self::PasswordSize => write!(f, "Password Size Exceeded"),
            Self::PasswordTruncate => write!(f, "Password Would Be Truncated"),
            Self::PasswordValue => write!(f, "Forbidden Byte In Password"),
            Self::Config => write!(f, "Configuration Error"),
            Self::External => write!(f, "External Provider Error"),
        }
    }
}

pub type PasshashResult<T> = Result<T, PasshashRuntimeError>;

#[macro_export]
macro_rules! passhash_error
{
    ($src:expr,$($arg:tt)*) => (
        return std::result::Result::Err($crate::passhash_error::PasshashRuntimeError::new($src, format!($($arg)*)))
    )
}

#[macro_export]
macro_rules! passhash_error_map
{
    ($src:expr,$($arg:tt)*) => (
        $crate::passhash_error::PasshashRuntimeError::new($src, format!($($arg)*))
    )
}

#[test]
fn error_codes_are_stable()
{
    let e = PasshashRuntimeError::new(PasshashErrorCode::MalformedHash, "3 fields, expected 4".to_string());

    assert_eq!(e.err_code(), PasshashErrorCode::MalformedHash);
    assert_eq!(e.is_malformed(), true);
    assert_eq!(format!("{}", e).as_str(), "passhash: Malformed Hash, 3 fields, expected 4");
}
