use api_types::Rejected;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, app, run_with_listener};

mod bicycles;
mod members;
mod rentals;
mod server;

pub mod types {
    pub use api_types::Rejected;

    pub mod bicycle {
        pub use api_types::bicycle::{
            BicycleCondition, BicycleFilter, BicycleSearchResponse, BicycleStatus, BicycleView,
            BicyclesResponse, SortField,
        };
    }

    pub mod member {
        pub use api_types::member::{EligibilityView, MemberStatus, MemberView, MembershipType};
    }

    pub mod rental {
        pub use api_types::rental::{
            HistoryEntryView, HistoryList, HistoryResponse, OpenRentalView, OpenRentalsResponse,
            OverdueQuery, RentNew, RentResponse, RentalConfirmed, ReturnNew, ReturnReceipt,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::NotAvailable(_) | EngineError::AlreadyClosed(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Ineligible(_) | EngineError::InvalidInput(_) | EngineError::Canceled(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, rejected) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Rejected { rejected })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
