mod handlers;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{API, DynAPI};
use crate::server::handlers::{bids, bookings};

pub async fn serve<T: API + Sync + Send + 'static>(api: T) {
    tracing_subscriber::fmt::init();

    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/:uuid", get(bookings::find).patch(bookings::update))
        .route("/bookings/:uuid/publish", patch(bookings::publish))
        .route("/bookings/:uuid/cancel", patch(bookings::cancel))
        .route("/bookings/:uuid/transit", patch(bookings::start_transit))
        .route("/bookings/:uuid/delivered", patch(bookings::mark_delivered))
        .route("/bookings/:uuid/complete", patch(bookings::complete))
        .route("/bookings/:uuid/bids", post(bids::submit).get(bids::list))
        .route("/bookings/:uuid/bids/:bid_id/accept", patch(bids::accept))
        .route("/bookings/:uuid/bids/:bid_id/reject", patch(bids::reject))
        .route(
            "/bookings/:uuid/bids/:bid_id/withdraw",
            patch(bids::withdraw),
        )
        .route("/bids/expire", post(bids::expire))
        .layer(Extension(api));

    let addr = env::var("BIND_ADDR")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
