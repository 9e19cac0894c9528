//! Core of the bicycle rental desk.
//!
//! The [`Engine`] owns the database handle and implements three parts of the
//! shop's business rules on top of the record store (the sea-orm entities in
//! this crate):
//!
//! - the inventory catalog (bicycle lookup, search, status/condition),
//! - the membership ledger (active members, open rentals, eligibility),
//! - the rental lifecycle (rent, return, fee assessment).
//!
//! Every public operation runs inside its own database transaction: it either
//! commits completely or leaves no trace.

pub use bicycles::{Bicycle, BicycleCondition, BicycleStatus};
pub use commands::{BicycleFilter, RentCmd, ReturnCmd, SortField};
pub use error::EngineError;
pub use fees::{LateFee, RentalFee, ReturnReceipt, assess_late_fee};
pub use members::{Eligibility, Member, MemberStatus, MembershipType};
pub use money::Money;
pub use ops::{BicycleSearch, Engine, EngineBuilder, OpenRental, RentalHistoryEntry};
pub use policy::RentalPolicy;
pub use rentals::RentalTransaction;

mod bicycles;
mod commands;
mod error;
mod fees;
mod members;
mod money;
mod ops;
mod policy;
mod rentals;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
