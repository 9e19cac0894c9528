//! Rental lifecycle API endpoints

use api_types::rental::{
    HistoryEntryView, HistoryList, HistoryResponse, OpenRentalView, OpenRentalsResponse,
    OverdueQuery, RentNew, RentResponse, RentalConfirmed, ReturnNew, ReturnReceipt,
};
use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::Query;
use chrono::{DateTime, FixedOffset, Utc};
use engine::{Money, RentCmd, ReturnCmd};

use crate::{
    ServerError,
    bicycles::{condition_from_engine, condition_to_engine},
    server::ServerState,
};

const DEFAULT_HISTORY_LIMIT: u64 = 10;
const MAX_HISTORY_LIMIT: u64 = 100;

fn at_or_now(value: Option<DateTime<FixedOffset>>) -> DateTime<Utc> {
    value.map_or_else(Utc::now, |at| at.with_timezone(&Utc))
}

fn open_rental_view(open: engine::OpenRental) -> OpenRentalView {
    OpenRentalView {
        transaction_id: open.rental.id,
        bicycle_id: open.rental.bicycle_id,
        member_id: open.rental.member_id,
        brand: open.brand,
        kind: open.kind,
        rental_date: open.rental.rental_date,
        expected_return_date: open.rental.expected_return_date,
    }
}

/// Handle rent requests
pub async fn rent(
    State(state): State<ServerState>,
    Json(payload): Json<RentNew>,
) -> Result<(StatusCode, Json<RentResponse>), ServerError> {
    let cmd = RentCmd::new(
        payload.member_id,
        payload.bicycle_id,
        at_or_now(payload.rented_at),
    );
    let rental = state.engine.initiate_rental(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(RentResponse {
            confirmed: RentalConfirmed {
                transaction_id: rental.id,
                bicycle_id: rental.bicycle_id,
                member_id: rental.member_id,
                rental_date: rental.rental_date,
                expected_return_date: rental.expected_return_date,
            },
        }),
    ))
}

/// Handle return requests
pub async fn return_bicycle(
    State(state): State<ServerState>,
    Json(payload): Json<ReturnNew>,
) -> Result<Json<ReturnReceipt>, ServerError> {
    let mut cmd = ReturnCmd::new(
        payload.bicycle_id,
        payload.member_id,
        condition_to_engine(payload.condition),
        at_or_now(payload.returned_at),
    )
    .confirmed(payload.confirmed);
    if let Some(damage) = payload.damage_amount_minor {
        cmd = cmd.damage(Money::new(damage));
    }

    let receipt = state.engine.complete_return(cmd).await?;
    Ok(Json(ReturnReceipt {
        transaction_id: receipt.transaction_id,
        bicycle_id: receipt.bicycle_id,
        member_id: receipt.member_id,
        rental_date: receipt.rental_date,
        return_date: receipt.return_date,
        days_rented: receipt.days_rented,
        late_fee_minor: receipt.late_fee.minor(),
        damage_fee_minor: receipt.damage_fee.minor(),
        total_fee_minor: receipt.total_fee.minor(),
        condition: condition_from_engine(receipt.condition),
    }))
}

/// Handle requests for bicycles currently out on rent
pub async fn open(State(state): State<ServerState>) -> Result<Json<OpenRentalsResponse>, ServerError> {
    let rentals = state.engine.open_rentals().await?;
    Ok(Json(OpenRentalsResponse {
        rentals: rentals.into_iter().map(open_rental_view).collect(),
    }))
}

/// Handle requests for rentals past their expected return date
pub async fn overdue(
    State(state): State<ServerState>,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<OpenRentalsResponse>, ServerError> {
    let rentals = state.engine.overdue_rentals(at_or_now(query.at)).await?;
    Ok(Json(OpenRentalsResponse {
        rentals: rentals.into_iter().map(open_rental_view).collect(),
    }))
}

/// Handle paginated rental history requests
pub async fn history(
    State(state): State<ServerState>,
    Json(payload): Json<HistoryList>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(ServerError::Generic(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }

    let (entries, next_cursor) = state
        .engine
        .rental_history(payload.member_id, limit, payload.cursor.as_deref())
        .await?;

    Ok(Json(HistoryResponse {
        rentals: entries
            .into_iter()
            .map(|entry| HistoryEntryView {
                transaction_id: entry.rental.id,
                bicycle_id: entry.rental.bicycle_id,
                member_id: entry.rental.member_id,
                rental_date: entry.rental.rental_date,
                expected_return_date: entry.rental.expected_return_date,
                return_date: entry.rental.return_date,
                late_fee_minor: entry.fee.map(|fee| fee.late_fee.minor()),
                damage_fee_minor: entry.fee.map(|fee| fee.damage_fee.minor()),
            })
            .collect(),
        next_cursor,
    }))
}
