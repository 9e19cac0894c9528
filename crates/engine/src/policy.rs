//! Rental policy knobs.

use chrono::{DateTime, Duration, Utc};

use crate::{EngineError, Money, ResultEngine};

/// Shop-wide rental policy.
///
/// `rental_period_days` is used both to compute the expected return date when
/// a bicycle is rented and as the number of days allowed before late fees
/// start accruing on return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RentalPolicy {
    pub rental_period_days: i64,
    pub late_fee_per_day: Money,
}

impl Default for RentalPolicy {
    fn default() -> Self {
        Self {
            rental_period_days: 7,
            late_fee_per_day: Money::new(10_00),
        }
    }
}

impl RentalPolicy {
    /// Longest rental period accepted, ten years.
    pub const MAX_RENTAL_PERIOD_DAYS: i64 = 3650;

    pub fn new(rental_period_days: i64, late_fee_per_day: Money) -> ResultEngine<Self> {
        let policy = Self {
            rental_period_days,
            late_fee_per_day,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if !(0..=Self::MAX_RENTAL_PERIOD_DAYS).contains(&self.rental_period_days) {
            return Err(EngineError::InvalidInput(format!(
                "rental period must be between 0 and {} days",
                Self::MAX_RENTAL_PERIOD_DAYS
            )));
        }
        if self.late_fee_per_day.is_negative() {
            return Err(EngineError::InvalidInput(
                "late fee per day must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Date by which a bicycle rented at `rented_at` is due back, capped at
    /// the latest representable date.
    #[must_use]
    pub fn expected_return_date(&self, rented_at: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(self.rental_period_days)
            .and_then(|period| rented_at.checked_add_signed(period))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
