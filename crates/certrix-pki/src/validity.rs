//! Validity windows with calendar-year arithmetic.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::error::{Error, Result};

/// Clock-skew tolerance subtracted from the issuance time.
pub const CLOCK_SKEW: Duration = Duration::seconds(60);

/// The `[not_before, not_after]` interval of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// Start of validity.
    pub not_before: DateTime<Utc>,
    /// End of validity.
    pub not_after: DateTime<Utc>,
}

impl ValidityWindow {
    /// Builds the window for a certificate issued at `issued_at` and valid for
    /// `years` calendar years.
    ///
    /// `not_before` is backdated by [`CLOCK_SKEW`]; `not_after` is `not_before`
    /// with its year field advanced.
    pub fn starting_at(issued_at: DateTime<Utc>, years: u32) -> Result<Self> {
        let not_before = issued_at - CLOCK_SKEW;
        let not_after = add_years(not_before, years)?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Builds the window for a certificate issued now.
    pub fn from_now(years: u32) -> Result<Self> {
        Self::starting_at(Utc::now(), years)
    }
}

/// Advances the year field of `at` by `years`, keeping month, day and time.
///
/// February 29 rolls over to March 1 when the target year is not a leap year.
pub fn add_years(at: DateTime<Utc>, years: u32) -> Result<DateTime<Utc>> {
    let date = at.date_naive();
    let target_year = i32::try_from(years)
        .ok()
        .and_then(|years| date.year().checked_add(years))
        .ok_or_else(|| Error::Validation(format!("{years} years is out of range")))?;

    let shifted = NaiveDate::from_ymd_opt(target_year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(target_year, 3, 1))
        .ok_or_else(|| Error::Validation(format!("year {target_year} is out of range")))?;

    Ok(shifted.and_time(at.time()).and_utc())
}
