//! The module contains the `Member` struct and the `members` table entity.

use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    EngineError, ResultEngine,
    util::{enum_token, normalize_optional_text, normalize_required_text},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MembershipType {
    Student,
    Regular,
    Premium,
}

impl MembershipType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Regular => "regular",
            Self::Premium => "premium",
        }
    }
}

impl TryFrom<&str> for MembershipType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match enum_token(value).as_str() {
            "student" => Ok(Self::Student),
            "regular" => Ok(Self::Regular),
            "premium" => Ok(Self::Premium),
            _ => Err(EngineError::InvalidInput(format!(
                "invalid membership type: {value}"
            ))),
        }
    }
}

/// Account status. Only `Active` members may start new rentals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Suspended => "Suspended",
        }
    }
}

impl TryFrom<&str> for MemberStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match enum_token(value).as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            _ => Err(EngineError::InvalidInput(format!(
                "invalid member status: {value}"
            ))),
        }
    }
}

/// A shop member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub membership_type: MembershipType,
    pub status: MemberStatus,
    pub registration_date: NaiveDate,
    /// Maximum number of bicycles the member may hold at once.
    pub rental_limit: u32,
    /// Informational; eligibility is driven by `status` only.
    pub membership_end_date: NaiveDate,
}

impl Member {
    /// Creates an active regular member with a rental limit of one.
    pub fn new(
        id: i32,
        name: &str,
        registration_date: NaiveDate,
        membership_end_date: NaiveDate,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id,
            name: normalize_required_text(name, "name")?,
            email: None,
            phone: None,
            membership_type: MembershipType::Regular,
            status: MemberStatus::Active,
            registration_date,
            rental_limit: 1,
            membership_end_date,
        })
    }

    #[must_use]
    pub fn contact(mut self, email: Option<&str>, phone: Option<&str>) -> Self {
        self.email = normalize_optional_text(email);
        self.phone = normalize_optional_text(phone);
        self
    }

    #[must_use]
    pub fn membership_type(mut self, membership_type: MembershipType) -> Self {
        self.membership_type = membership_type;
        self
    }

    #[must_use]
    pub fn status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn rental_limit(mut self, rental_limit: u32) -> Self {
        self.rental_limit = rental_limit;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// Outcome of an eligibility check, with the reason shown at the desk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: String,
}

impl Eligibility {
    pub(crate) const INVALID_MEMBERSHIP: &'static str = "Invalid or inactive membership";

    pub(crate) fn eligible() -> Self {
        Self {
            eligible: true,
            reason: "Member validated and eligible to rent".to_string(),
        }
    }

    pub(crate) fn invalid_membership() -> Self {
        Self {
            eligible: false,
            reason: Self::INVALID_MEMBERSHIP.to_string(),
        }
    }

    pub(crate) fn limit_exceeded(limit: u32, current: u64) -> Self {
        Self {
            eligible: false,
            reason: format!("Rental limit exceeded: limit {limit}, current {current}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub membership_type: String,
    pub status: String,
    pub registration_date: Date,
    pub rental_limit: i32,
    pub membership_end_date: Date,
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

impl TryFrom<&Member> for ActiveModel {
    type Error = EngineError;

    fn try_from(value: &Member) -> Result<Self, Self::Error> {
        let rental_limit = i32::try_from(value.rental_limit).map_err(|_| {
            EngineError::InvalidInput(format!(
                "member {}: rental limit must be <= {}",
                value.id,
                i32::MAX
            ))
        })?;
        Ok(Self {
            id: ActiveValue::Set(value.id),
            name: ActiveValue::Set(value.name.clone()),
            email: ActiveValue::Set(value.email.clone()),
            phone: ActiveValue::Set(value.phone.clone()),
            membership_type: ActiveValue::Set(value.membership_type.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            registration_date: ActiveValue::Set(value.registration_date),
            rental_limit: ActiveValue::Set(rental_limit),
            membership_end_date: ActiveValue::Set(value.membership_end_date),
        })
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let rental_limit = u32::try_from(model.rental_limit).map_err(|_| {
            EngineError::InvalidInput(format!(
                "member {}: rental limit must be >= 0",
                model.id
            ))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            membership_type: MembershipType::try_from(model.membership_type.as_str())?,
            status: MemberStatus::try_from(model.status.as_str())?,
            registration_date: model.registration_date,
            rental_limit,
            membership_end_date: model.membership_end_date,
        })
    }
}
