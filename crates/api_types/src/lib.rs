use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Body of every rejected request (4xx).
#[derive(Debug, Serialize, Deserialize)]
pub struct Rejected {
    pub rejected: String,
}

pub mod bicycle {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum BicycleCondition {
        New,
        Good,
        Fair,
        Damaged,
    }

    impl BicycleCondition {
        /// Returns the canonical condition string used by the engine/database.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::New => "New",
                Self::Good => "Good",
                Self::Fair => "Fair",
                Self::Damaged => "Damaged",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum BicycleStatus {
        Available,
        Rented,
        #[serde(rename = "Under Maintenance", alias = "UnderMaintenance")]
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

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SortField {
        Brand,
        Type,
        Rate,
        Condition,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BicycleView {
        pub id: i32,
        pub brand: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub frame_size: String,
        pub daily_rate_minor: i64,
        pub purchase_date: Option<NaiveDate>,
        pub condition: BicycleCondition,
        pub status: BicycleStatus,
    }

    /// Catalog filters, used both as query string and JSON body.
    ///
    /// Text filters match case-insensitively anywhere in the value; rate
    /// bounds are inclusive.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BicycleFilter {
        pub brand: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub status: Option<BicycleStatus>,
        pub condition: Option<BicycleCondition>,
        pub min_rate_minor: Option<i64>,
        pub max_rate_minor: Option<i64>,
        pub sort_by: Option<SortField>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BicyclesResponse {
        pub bicycles: Vec<BicycleView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BicycleSearchResponse {
        /// `false` when nothing matched and near-matches are returned instead.
        pub exact: bool,
        pub count: usize,
        pub average_daily_rate_minor: Option<i64>,
        pub bicycles: Vec<BicycleView>,
    }
}

pub mod member {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipType {
        Student,
        Regular,
        Premium,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum MemberStatus {
        Active,
        Inactive,
        Suspended,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: i32,
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub membership_type: MembershipType,
        pub status: MemberStatus,
        pub registration_date: NaiveDate,
        pub rental_limit: u32,
        pub membership_end_date: NaiveDate,
        pub open_rentals: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EligibilityView {
        pub member_id: i32,
        pub eligible: bool,
        pub reason: String,
    }
}

pub mod rental {
    use super::*;
    use crate::bicycle::BicycleCondition;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RentNew {
        pub member_id: i32,
        pub bicycle_id: i32,
        /// RFC3339 timestamp; if absent, server uses now().
        pub rented_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RentalConfirmed {
        pub transaction_id: i32,
        pub bicycle_id: i32,
        pub member_id: i32,
        pub rental_date: DateTime<Utc>,
        pub expected_return_date: DateTime<Utc>,
    }

    /// Body of a successful `POST /rentals`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RentResponse {
        pub confirmed: RentalConfirmed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReturnNew {
        pub bicycle_id: i32,
        pub member_id: i32,
        /// The customer's confirmation; `false` cancels the return.
        pub confirmed: bool,
        /// Must be >= 0 when present.
        pub damage_amount_minor: Option<i64>,
        pub condition: BicycleCondition,
        /// RFC3339 timestamp; if absent, server uses now().
        pub returned_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReturnReceipt {
        pub transaction_id: i32,
        pub bicycle_id: i32,
        pub member_id: i32,
        pub rental_date: DateTime<Utc>,
        pub return_date: DateTime<Utc>,
        pub days_rented: i64,
        pub late_fee_minor: i64,
        pub damage_fee_minor: i64,
        pub total_fee_minor: i64,
        pub condition: BicycleCondition,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OpenRentalView {
        pub transaction_id: i32,
        pub bicycle_id: i32,
        pub member_id: i32,
        pub brand: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub rental_date: DateTime<Utc>,
        pub expected_return_date: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OpenRentalsResponse {
        pub rentals: Vec<OpenRentalView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct OverdueQuery {
        /// RFC3339 timestamp; if absent, server uses now().
        pub at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HistoryList {
        pub member_id: Option<i32>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryEntryView {
        pub transaction_id: i32,
        pub bicycle_id: i32,
        pub member_id: i32,
        pub rental_date: DateTime<Utc>,
        pub expected_return_date: DateTime<Utc>,
        /// `None` while the rental is open.
        pub return_date: Option<DateTime<Utc>>,
        pub late_fee_minor: Option<i64>,
        pub damage_fee_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryResponse {
        pub rentals: Vec<HistoryEntryView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}
