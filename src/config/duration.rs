//! Duration string parsing
//!
//! Accepts the Go `time.ParseDuration` syntax used by the
//! `DEVBOX_X_GITHUB_PLUGIN_CACHE_TTL` override: a sequence of decimal numbers,
//! each with an optional fraction and a unit suffix, such as `300ms`, `1.5h`
//! or `2h45m`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.

use std::time::Duration;

use crate::error::DurationError;

/// Fraction digits beyond this are ignored; they are below nanosecond precision
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a Go-style duration string
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid {
        input: input.to_string(),
    };

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    if rest.starts_with('-') {
        return Err(DurationError::Negative {
            input: input.to_string(),
        });
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after_whole) = split_digits(rest);
        let (fraction, after_fraction) = match after_whole.strip_prefix('.') {
            Some(tail) => split_digits(tail),
            None => ("", after_whole),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_end = after_fraction
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_fraction.len());
        let (unit, tail) = after_fraction.split_at(unit_end);
        let unit_nanos = unit_nanos(unit, input)?;

        let overflow = || DurationError::Overflow {
            input: input.to_string(),
        };
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(unit_nanos).ok_or_else(overflow)?;

        if !fraction.is_empty() {
            let digits = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
            let scale = 10u128.pow(digits.len() as u32);
            let numerator: u128 = digits.parse().map_err(|_| invalid())?;
            nanos = nanos
                .checked_add(numerator * unit_nanos / scale)
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        rest = tail;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| DurationError::Overflow {
            input: input.to_string(),
        })
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str, input: &str) -> Result<u128, DurationError> {
    match unit {
        "ns" => Ok(1),
        "us" | "µs" | "μs" => Ok(1_000),
        "ms" => Ok(1_000_000),
        "s" => Ok(1_000_000_000),
        "m" => Ok(60 * 1_000_000_000),
        "h" => Ok(60 * 60 * 1_000_000_000),
        "" => Err(DurationError::MissingUnit {
            input: input.to_string(),
        }),
        other => Err(DurationError::UnknownUnit {
            unit: other.to_string(),
            input: input.to_string(),
        }),
    }
}
