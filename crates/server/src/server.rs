use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{bicycles, members, rentals};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/bicycles", get(bicycles::list))
        .route("/bicycles/available", get(bicycles::available))
        .route("/bicycles/search", post(bicycles::search))
        .route("/bicycles/{id}", get(bicycles::get))
        .route("/members/{id}", get(members::get))
        .route("/members/{id}/eligibility", get(members::eligibility))
        .route("/rentals", post(rentals::rent))
        .route("/rentals/open", get(rentals::open))
        .route("/rentals/overdue", get(rentals::overdue))
        .route("/rentals/history", post(rentals::history))
        .route("/returns", post(rentals::return_bicycle))
        .with_state(state)
}

/// Builds the API router around an engine.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
    })
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}
