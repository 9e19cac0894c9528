//! Membership API endpoints

use api_types::member::{EligibilityView, MemberStatus, MemberView, MembershipType};
use axum::{
    Json,
    extract::{Path, State},
};

use crate::{ServerError, server::ServerState};

fn membership_type(value: engine::MembershipType) -> MembershipType {
    match value {
        engine::MembershipType::Student => MembershipType::Student,
        engine::MembershipType::Regular => MembershipType::Regular,
        engine::MembershipType::Premium => MembershipType::Premium,
    }
}

fn member_status(value: engine::MemberStatus) -> MemberStatus {
    match value {
        engine::MemberStatus::Active => MemberStatus::Active,
        engine::MemberStatus::Inactive => MemberStatus::Inactive,
        engine::MemberStatus::Suspended => MemberStatus::Suspended,
    }
}

/// Handle requests for a member record with its open rental count
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<MemberView>, ServerError> {
    let member = state.engine.get_member(id).await?;
    let open_rentals = state.engine.count_open_rentals(id).await?;
    Ok(Json(MemberView {
        id: member.id,
        name: member.name,
        email: member.email,
        phone: member.phone,
        membership_type: membership_type(member.membership_type),
        status: member_status(member.status),
        registration_date: member.registration_date,
        rental_limit: member.rental_limit,
        membership_end_date: member.membership_end_date,
        open_rentals,
    }))
}

/// Handle eligibility checks
pub async fn eligibility(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<EligibilityView>, ServerError> {
    let eligibility = state.engine.is_eligible(id).await?;
    Ok(Json(EligibilityView {
        member_id: id,
        eligible: eligibility.eligible,
        reason: eligibility.reason,
    }))
}
