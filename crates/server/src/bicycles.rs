//! Catalog API endpoints

use api_types::bicycle::{
    BicycleCondition, BicycleFilter, BicycleSearchResponse, BicycleStatus, BicycleView,
    BicyclesResponse, SortField,
};
use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::Query;

use crate::{ServerError, server::ServerState};

pub(crate) fn condition_to_engine(condition: BicycleCondition) -> engine::BicycleCondition {
    match condition {
        BicycleCondition::New => engine::BicycleCondition::New,
        BicycleCondition::Good => engine::BicycleCondition::Good,
        BicycleCondition::Fair => engine::BicycleCondition::Fair,
        BicycleCondition::Damaged => engine::BicycleCondition::Damaged,
    }
}

pub(crate) fn condition_from_engine(condition: engine::BicycleCondition) -> BicycleCondition {
    match condition {
        engine::BicycleCondition::New => BicycleCondition::New,
        engine::BicycleCondition::Good => BicycleCondition::Good,
        engine::BicycleCondition::Fair => BicycleCondition::Fair,
        engine::BicycleCondition::Damaged => BicycleCondition::Damaged,
    }
}

fn status_to_engine(status: BicycleStatus) -> engine::BicycleStatus {
    match status {
        BicycleStatus::Available => engine::BicycleStatus::Available,
        BicycleStatus::Rented => engine::BicycleStatus::Rented,
        BicycleStatus::UnderMaintenance => engine::BicycleStatus::UnderMaintenance,
    }
}

fn status_from_engine(status: engine::BicycleStatus) -> BicycleStatus {
    match status {
        engine::BicycleStatus::Available => BicycleStatus::Available,
        engine::BicycleStatus::Rented => BicycleStatus::Rented,
        engine::BicycleStatus::UnderMaintenance => BicycleStatus::UnderMaintenance,
    }
}

fn sort_to_engine(field: SortField) -> engine::SortField {
    match field {
        SortField::Brand => engine::SortField::Brand,
        SortField::Type => engine::SortField::Type,
        SortField::Rate => engine::SortField::Rate,
        SortField::Condition => engine::SortField::Condition,
    }
}

fn filter_to_engine(filter: BicycleFilter) -> engine::BicycleFilter {
    engine::BicycleFilter {
        brand: filter.brand,
        kind: filter.kind,
        status: filter.status.map(status_to_engine),
        condition: filter.condition.map(condition_to_engine),
        min_rate: filter.min_rate_minor.map(engine::Money::new),
        max_rate: filter.max_rate_minor.map(engine::Money::new),
        sort_by: filter.sort_by.map(sort_to_engine),
    }
}

fn bicycle_view(bicycle: engine::Bicycle) -> BicycleView {
    BicycleView {
        id: bicycle.id,
        brand: bicycle.brand,
        kind: bicycle.kind,
        frame_size: bicycle.frame_size,
        daily_rate_minor: bicycle.daily_rate.minor(),
        purchase_date: bicycle.purchase_date,
        condition: condition_from_engine(bicycle.condition),
        status: status_from_engine(bicycle.status),
    }
}

/// Handle requests for the whole fleet
pub async fn list(State(state): State<ServerState>) -> Result<Json<BicyclesResponse>, ServerError> {
    let bicycles = state.engine.list_all_bicycles().await?;
    Ok(Json(BicyclesResponse {
        bicycles: bicycles.into_iter().map(bicycle_view).collect(),
    }))
}

/// Handle requests for a single bicycle
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<BicycleView>, ServerError> {
    let bicycle = state.engine.get_bicycle(id).await?;
    Ok(Json(bicycle_view(bicycle)))
}

/// Handle requests for rentable bicycles, filtered by query string
pub async fn available(
    State(state): State<ServerState>,
    Query(filter): Query<BicycleFilter>,
) -> Result<Json<BicyclesResponse>, ServerError> {
    let bicycles = state
        .engine
        .list_available(&filter_to_engine(filter))
        .await?;
    Ok(Json(BicyclesResponse {
        bicycles: bicycles.into_iter().map(bicycle_view).collect(),
    }))
}

/// Handle catalog searches, falling back to near-matches
pub async fn search(
    State(state): State<ServerState>,
    Json(filter): Json<BicycleFilter>,
) -> Result<Json<BicycleSearchResponse>, ServerError> {
    let search = state.engine.search_bicycles(&filter_to_engine(filter)).await?;
    let average_daily_rate_minor = search.average_daily_rate().map(engine::Money::minor);
    Ok(Json(BicycleSearchResponse {
        exact: search.exact,
        count: search.count(),
        average_daily_rate_minor,
        bicycles: search.bicycles.into_iter().map(bicycle_view).collect(),
    }))
}
