//! The module contains the `Bicycle` struct, its status/condition enums and
//! the `bicycles` table entity.

use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    EngineError, Money, ResultEngine,
    util::{enum_token, normalize_required_text},
};

/// Physical state of a bicycle, reassessed on every return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BicycleCondition {
    New,
    Good,
    Fair,
    Damaged,
}

impl BicycleCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Damaged => "Damaged",
        }
    }
}

impl TryFrom<&str> for BicycleCondition {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match enum_token(value).as_str() {
            "new" => Ok(Self::New),
            "good" => Ok(Self::Good),
            "fair" => Ok(Self::Fair),
            "damaged" => Ok(Self::Damaged),
            _ => Err(EngineError::InvalidInput(format!(
                "invalid bicycle condition: {value} (expected New/Good/Fair/Damaged)"
            ))),
        }
    }
}

/// Availability of a bicycle.
///
/// `Rented` is owned by the rental lifecycle; `UnderMaintenance` is set by
/// administrative action only and blocks renting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BicycleStatus {
    Available,
    Rented,
    UnderMaintenance,
}

impl BicycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Rented => "Rented",
            Self::UnderMaintenance => "Under Maintenance",
        }
    }
}

impl TryFrom<&str> for BicycleStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match enum_token(value).as_str() {
            "available" => Ok(Self::Available),
            "rented" => Ok(Self::Rented),
            "undermaintenance" | "maintenance" => Ok(Self::UnderMaintenance),
            _ => Err(EngineError::InvalidInput(format!(
                "invalid bicycle status: {value}"
            ))),
        }
    }
}

impl std::fmt::Display for BicycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for BicycleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bicycle of the rental fleet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bicycle {
    /// Inventory number; assigned by the shop, not by the database.
    pub id: i32,
    pub brand: String,
    /// Bicycle type (road, mountain, hybrid...).
    pub kind: String,
    pub frame_size: String,
    pub daily_rate: Money,
    /// `None` when the inventory source carried an unreadable date.
    pub purchase_date: Option<NaiveDate>,
    pub condition: BicycleCondition,
    pub status: BicycleStatus,
}

impl Bicycle {
    /// Creates a new, available bicycle in `Good` condition.
    pub fn new(
        id: i32,
        brand: &str,
        kind: &str,
        frame_size: &str,
        daily_rate: Money,
    ) -> ResultEngine<Self> {
        if daily_rate.is_negative() {
            return Err(EngineError::InvalidInput(
                "daily rate must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id,
            brand: normalize_required_text(brand, "brand")?,
            kind: normalize_required_text(kind, "type")?,
            frame_size: frame_size.trim().to_string(),
            daily_rate,
            purchase_date: None,
            condition: BicycleCondition::Good,
            status: BicycleStatus::Available,
        })
    }

    #[must_use]
    pub fn purchased_on(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: BicycleCondition) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: BicycleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_rentable(&self) -> bool {
        self.status == BicycleStatus::Available
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bicycles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub brand: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub frame_size: String,
    pub daily_rate_minor: i64,
    pub purchase_date: Option<Date>,
    pub condition: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rentals::Entity")]
    Rentals,
}

impl Related<super::rentals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rentals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bicycle> for ActiveModel {
    fn from(value: &Bicycle) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            brand: ActiveValue::Set(value.brand.clone()),
            kind: ActiveValue::Set(value.kind.clone()),
            frame_size: ActiveValue::Set(value.frame_size.clone()),
            daily_rate_minor: ActiveValue::Set(value.daily_rate.minor()),
            purchase_date: ActiveValue::Set(value.purchase_date),
            condition: ActiveValue::Set(value.condition.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Bicycle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            brand: model.brand,
            kind: model.kind,
            frame_size: model.frame_size,
            daily_rate: Money::new(model.daily_rate_minor),
            purchase_date: model.purchase_date,
            condition: BicycleCondition::try_from(model.condition.as_str())?,
            status: BicycleStatus::try_from(model.status.as_str())?,
        })
    }
}
