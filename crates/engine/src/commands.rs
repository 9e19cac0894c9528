//! Command structs for engine operations.
//!
//! These types group parameters for the rent/return workflow and catalog
//! searches, keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::{BicycleCondition, BicycleStatus, EngineError, Money, util::enum_token};

/// Start a rental.
#[derive(Clone, Debug)]
pub struct RentCmd {
    pub member_id: i32,
    pub bicycle_id: i32,
    pub rented_at: DateTime<Utc>,
}

impl RentCmd {
    #[must_use]
    pub fn new(member_id: i32, bicycle_id: i32, rented_at: DateTime<Utc>) -> Self {
        Self {
            member_id,
            bicycle_id,
            rented_at,
        }
    }
}

/// Close a rental.
///
/// `confirmed` defaults to `true`; a desk that asks the customer first passes
/// the answer through [`ReturnCmd::confirmed`].
#[derive(Clone, Debug)]
pub struct ReturnCmd {
    pub bicycle_id: i32,
    pub member_id: i32,
    pub confirmed: bool,
    /// Damage fee charged on top of any late fee. `None` means no damage.
    pub damage: Option<Money>,
    /// Condition assessed at the counter; stored on the bicycle.
    pub condition: BicycleCondition,
    pub returned_at: DateTime<Utc>,
}

impl ReturnCmd {
    #[must_use]
    pub fn new(
        bicycle_id: i32,
        member_id: i32,
        condition: BicycleCondition,
        returned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bicycle_id,
            member_id,
            confirmed: true,
            damage: None,
            condition,
            returned_at,
        }
    }

    #[must_use]
    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    #[must_use]
    pub fn damage(mut self, amount: Money) -> Self {
        self.damage = Some(amount);
        self
    }
}

/// Whitelisted ordering of catalog searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Brand,
    Type,
    Rate,
    Condition,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Type => "type",
            Self::Rate => "rate",
            Self::Condition => "condition",
        }
    }
}

impl TryFrom<&str> for SortField {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match enum_token(value).as_str() {
            "brand" => Ok(Self::Brand),
            "type" | "kind" => Ok(Self::Type),
            "rate" | "rentalrate" | "dailyrate" => Ok(Self::Rate),
            "condition" => Ok(Self::Condition),
            _ => Err(EngineError::InvalidInput(format!(
                "cannot sort by {value} (expected brand/type/rate/condition)"
            ))),
        }
    }
}

/// Catalog search filters. Every field is optional; text filters match
/// case-insensitively anywhere in the value, rate bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BicycleFilter {
    pub brand: Option<String>,
    pub kind: Option<String>,
    pub status: Option<BicycleStatus>,
    pub condition: Option<BicycleCondition>,
    pub min_rate: Option<Money>,
    pub max_rate: Option<Money>,
    /// Ordering; by id when `None`.
    pub sort_by: Option<SortField>,
}

impl BicycleFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: BicycleStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: BicycleCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn rate_between(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_rate = min;
        self.max_rate = max;
        self
    }

    #[must_use]
    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort_by = Some(field);
        self
    }

    /// `true` when a fallback search could relax something.
    pub(crate) fn has_relaxable_predicates(&self) -> bool {
        self.text_predicates_count() > 0 || self.min_rate.is_some() || self.max_rate.is_some()
    }

    pub(crate) fn text_predicates_count(&self) -> usize {
        [
            self.brand.as_deref().is_some_and(|s| !s.trim().is_empty()),
            self.kind.as_deref().is_some_and(|s| !s.trim().is_empty()),
            self.condition.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}
