//! Fee assessment and the `rental_fees` table entity.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{BicycleCondition, EngineError, Money, RentalPolicy};

/// Fees recorded for a closed rental, one row per transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RentalFee {
    pub transaction_id: i32,
    pub late_fee: Money,
    pub damage_fee: Money,
}

impl RentalFee {
    #[must_use]
    pub fn total(&self) -> Money {
        self.late_fee + self.damage_fee
    }
}

/// Result of the late fee rule for one return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LateFee {
    pub days_rented: i64,
    pub days_late: i64,
    pub amount: Money,
}

/// Applies the late fee rule.
///
/// `days_rented` counts calendar days (UTC) between rental and return; every
/// day past `policy.rental_period_days` costs `policy.late_fee_per_day`. A
/// return dated before the rental counts as zero days.
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use engine::{Money, RentalPolicy, assess_late_fee};
///
/// let rented = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
/// let fee = assess_late_fee(&RentalPolicy::default(), rented, rented + Duration::days(10));
/// assert_eq!(fee.days_late, 3);
/// assert_eq!(fee.amount, Money::new(30_00));
/// ```
#[must_use]
pub fn assess_late_fee(
    policy: &RentalPolicy,
    rental_date: DateTime<Utc>,
    returned_at: DateTime<Utc>,
) -> LateFee {
    let days_rented = (returned_at.date_naive() - rental_date.date_naive())
        .num_days()
        .max(0);
    let days_late = (days_rented - policy.rental_period_days).max(0);
    LateFee {
        days_rented,
        days_late,
        amount: policy.late_fee_per_day.times(days_late),
    }
}

/// Summary handed back to the desk after a completed return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub transaction_id: i32,
    pub bicycle_id: i32,
    pub member_id: i32,
    pub rental_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub days_rented: i64,
    pub late_fee: Money,
    pub damage_fee: Money,
    pub total_fee: Money,
    /// Condition recorded on the bicycle at return.
    pub condition: BicycleCondition,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rental_fees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: i32,
    pub late_fee_minor: i64,
    pub damage_fee_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rentals::Entity",
        from = "Column::TransactionId",
        to = "super::rentals::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Rentals,
}

impl Related<super::rentals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rentals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RentalFee> for ActiveModel {
    fn from(value: &RentalFee) -> Self {
        Self {
            transaction_id: ActiveValue::Set(value.transaction_id),
            late_fee_minor: ActiveValue::Set(value.late_fee.minor()),
            damage_fee_minor: ActiveValue::Set(value.damage_fee.minor()),
        }
    }
}

impl TryFrom<Model> for RentalFee {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        if model.late_fee_minor < 0 || model.damage_fee_minor < 0 {
            return Err(EngineError::InvalidInput(format!(
                "negative fee stored for transaction {}",
                model.transaction_id
            )));
        }
        Ok(Self {
            transaction_id: model.transaction_id,
            late_fee: Money::new(model.late_fee_minor),
            damage_fee: Money::new(model.damage_fee_minor),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn ten_days_with_seven_allowed_costs_thirty() {
        let fee = assess_late_fee(&RentalPolicy::default(), day0(), day0() + Duration::days(10));
        assert_eq!(fee.days_rented, 10);
        assert_eq!(fee.days_late, 3);
        assert_eq!(fee.amount, Money::new(30_00));
    }

    #[test]
    fn within_the_period_is_free() {
        let fee = assess_late_fee(&RentalPolicy::default(), day0(), day0() + Duration::days(5));
        assert_eq!(fee.days_rented, 5);
        assert_eq!(fee.amount, Money::ZERO);

        let fee = assess_late_fee(&RentalPolicy::default(), day0(), day0() + Duration::days(7));
        assert_eq!(fee.amount, Money::ZERO);
    }

    #[test]
    fn days_are_calendar_days() {
        // 18:00 on day 0 to 09:00 on day 8 is 8 calendar days.
        let returned = Utc.with_ymd_and_hms(2025, 3, 9, 9, 0, 0).unwrap();
        let fee = assess_late_fee(&RentalPolicy::default(), day0(), returned);
        assert_eq!(fee.days_rented, 8);
        assert_eq!(fee.amount, Money::new(10_00));
    }

    #[test]
    fn return_before_rental_counts_zero_days() {
        let fee = assess_late_fee(&RentalPolicy::default(), day0(), day0() - Duration::days(2));
        assert_eq!(fee.days_rented, 0);
        assert_eq!(fee.amount, Money::ZERO);
    }

    #[test]
    fn custom_policy_rates() {
        let policy = RentalPolicy::new(5, Money::new(2_50)).unwrap();
        let fee = assess_late_fee(&policy, day0(), day0() + Duration::days(7));
        assert_eq!(fee.days_late, 2);
        assert_eq!(fee.amount, Money::new(5_00));
    }

    #[test]
    fn total_adds_late_and_damage() {
        let fee = RentalFee {
            transaction_id: 1,
            late_fee: Money::new(30_00),
            damage_fee: Money::new(12_50),
        };
        assert_eq!(fee.total(), Money::new(42_50));
    }
}
