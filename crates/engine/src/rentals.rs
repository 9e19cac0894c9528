//! Rental transactions.
//!
//! A `RentalTransaction` is opened when a bicycle leaves the shop and closed,
//! exactly once, when it comes back. It is never deleted.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RentalTransaction {
    /// Assigned by the store on insert; the identifier printed on receipts.
    pub id: i32,
    pub bicycle_id: i32,
    pub member_id: i32,
    pub rental_date: DateTime<Utc>,
    /// Informational due date; late fees are computed from the rental period.
    pub expected_return_date: DateTime<Utc>,
    /// `None` while the rental is open.
    pub return_date: Option<DateTime<Utc>>,
}

impl RentalTransaction {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.expected_return_date < now
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rental_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bicycle_id: i32,
    pub member_id: i32,
    pub rental_date: DateTimeUtc,
    pub expected_return_date: DateTimeUtc,
    pub return_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bicycles::Entity",
        from = "Column::BicycleId",
        to = "super::bicycles::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Bicycles,
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Members,
    #[sea_orm(has_one = "super::fees::Entity")]
    Fees,
}

impl Related<super::bicycles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bicycles.def()
    }
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::fees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert form of a new open rental; the id is left to the store.
impl From<&RentalTransaction> for ActiveModel {
    fn from(value: &RentalTransaction) -> Self {
        Self {
            id: ActiveValue::NotSet,
            bicycle_id: ActiveValue::Set(value.bicycle_id),
            member_id: ActiveValue::Set(value.member_id),
            rental_date: ActiveValue::Set(value.rental_date),
            expected_return_date: ActiveValue::Set(value.expected_return_date),
            return_date: ActiveValue::Set(value.return_date),
        }
    }
}

impl TryFrom<Model> for RentalTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            bicycle_id: model.bicycle_id,
            member_id: model.member_id,
            rental_date: model.rental_date,
            expected_return_date: model.expected_return_date,
            return_date: model.return_date,
        })
    }
}
