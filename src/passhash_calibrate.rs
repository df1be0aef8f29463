/*-
 * Passhash-rs - a password hashing and verification framework
 * Copyright (C) 2021  Aleksandr Morozov
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 *  file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Rounds auto-calibration: find the smallest rounds value whose
//! observed hash time meets a target wall-clock duration. Log2 schemes
//! step the exponent, linear schemes probe exponentially and then
//! binary search. Results are approximations by nature; the context
//! caches them per (scheme, target).

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::passhash_error::{PasshashResult, PasshashErrorCode};
use super::{passhash_error, passhash_error_map};
use super::passhash_hasher::{SchemeHandler, HashSettings, ContextKwds, RoundsCost};

const PROBE_SECRET: &'static [u8] = b"calibration probe";

fn timed_hash(handler: &Arc<dyn SchemeHandler>, rounds: u32) -> PasshashResult<Duration>
{
    let mut settings = HashSettings::default();
    settings.rounds = Some(rounds);

    let start = Instant::now();

    handler.hash(PROBE_SECRET, &settings, &ContextKwds::default())?;

    return Ok(start.elapsed());
}

/// Searches the scheme's rounds envelope for the smallest value whose
/// hash time reaches `target`. Saturates at the envelope bounds.
///
/// # Throws
///
/// [PasshashErrorCode::Config] for schemes without a rounds parameter
/// or a zero target.
pub
fn calibrate_rounds(handler: &Arc<dyn SchemeHandler>, target: Duration) -> PasshashResult<u32>
{
    let info = handler.info();

    let ri = match info.rounds
    {
        Some(r) => r,
        None => passhash_error!(PasshashErrorCode::Config,
            "scheme {} has no rounds parameter to calibrate", info.name),
    };

    if target.is_zero() == true
    {
        passhash_error!(PasshashErrorCode::Config, "calibration target must be positive");
    }

    match ri.cost
    {
        RoundsCost::Log2 =>
        {
            // each step doubles the work, walk up until the target falls
            let mut rounds = ri.min_rounds;

            loop
            {
                let elapsed = timed_hash(handler, rounds)?;

                if elapsed >= target || rounds >= ri.max_rounds
                {
                    return Ok(rounds);
                }

                rounds += 1;
            }
        },
        RoundsCost::Linear =>
        {
            // exponential probe for an upper bound
            let mut lo = ri.min_rounds;
            let mut hi = lo;

            loop
            {
                let elapsed = timed_hash(handler, hi)?;

                if elapsed >= target
                {
                    break;
                }

                if hi >= ri.max_rounds
                {
                    return Ok(ri.max_rounds);
                }

                lo = hi;
                hi = hi.saturating_mul(2).min(ri.max_rounds);
            }

            // smallest rounds in (lo, hi] meeting the target
            while lo + 1 < hi
            {
                let mid = lo + (hi - lo) / 2;

                let elapsed = timed_hash(handler, mid)
                    .map_err(|e|
                        passhash_error_map!(PasshashErrorCode::External,
                            "calibration probe failed, {}", e)
                    )?;

                if elapsed >= target
                {
                    hi = mid;
                }
                else
                {
                    lo = mid;
                }
            }

            return Ok(hi);
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::passhash_registry::Registry;

    #[test]
    fn calibrates_a_linear_scheme()
    {
        let handler = Registry::get("pbkdf2_sha256").unwrap();

        // a tiny target keeps the test quick; the answer must land in
        // the envelope and actually meet the target when rehearsed
        let rounds = calibrate_rounds(&handler, Duration::from_millis(5)).unwrap();

        assert_eq!(rounds >= 1, true);

        let elapsed = timed_hash(&handler, rounds).unwrap();
        assert_eq!(elapsed >= Duration::from_millis(2), true);
    }

    #[test]
    fn refuses_roundless_schemes()
    {
        let handler = Registry::get("plaintext").unwrap();

        let e = calibrate_rounds(&handler, Duration::from_millis(5)).unwrap_err();
        assert_eq!(e.err_code(), PasshashErrorCode::Config);
    }
}
