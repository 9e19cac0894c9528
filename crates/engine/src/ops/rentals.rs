//! The rental lifecycle: renting, returning and the rental listings.
//!
//! A bicycle moves `Available -> Rented` when a rental opens and back to
//! `Available` when it closes. Both transitions are conditional updates, so
//! two desks racing on the same bicycle or the same rental cannot both win.

use crate::{RentalFee, RentalTransaction};

mod list;
mod rent;
mod returns;

/// An open rental with the bicycle it concerns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenRental {
    pub rental: RentalTransaction,
    pub brand: String,
    pub kind: String,
}

/// A rental of the history listing, with its fees once closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RentalHistoryEntry {
    pub rental: RentalTransaction,
    pub fee: Option<RentalFee>,
}
