//! Version suffixes of handler names.
//!
//! A handler named `<name>_<YYYY>_<MM>_<DD>` is registered at version `YYYYMMDD`; any other
//! name is unversioned (version 0).

use crate::error::BuildError;

const MIN_YEAR: u32 = 1970;
const MAX_YEAR: u32 = 9999;

/// Parses the version encoded in a handler name.
///
/// A trailing `_dddd_dd_dd` group is always read as a date, so a group that is not a real
/// calendar date is rejected instead of silently falling back to version 0.
pub(crate) fn parse_version(name: &str) -> Result<u32, BuildError> {
    let mut parts = name.rsplitn(4, '_');
    let (Some(day), Some(month), Some(year), Some(base)) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Ok(0);
    };

    let is_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if base.is_empty() || !is_digits(year, 4) || !is_digits(month, 2) || !is_digits(day, 2) {
        return Ok(0);
    }

    let suffix = || format!("{year}_{month}_{day}");
    let (Ok(year), Ok(month), Ok(day)) = (year.parse::<u32>(), month.parse::<u32>(), day.parse::<u32>()) else {
        return Err(BuildError::invalid_version(name, suffix()));
    };

    if !(MIN_YEAR..=MAX_YEAR).contains(&year)
        || !(1..=12).contains(&month)
        || day == 0
        || day > days_in_month(year, month)
    {
        return Err(BuildError::invalid_version(name, suffix()));
    }

    Ok(year * 10_000 + month * 100 + day)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[inline]
fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
