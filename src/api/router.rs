//! HTTP router over the clinic collections.
//!
//! Every collection gets the same three routes, nested under `/api/`:
//! `GET /` (paginated list), `GET /:id` and `POST /seed`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::endpoints::collections::{self, CollectionContext};
use crate::core_state::ClinicState;
use crate::mock_api::{Entity, MockApi};

/// Build the clinic API router.
pub fn clinic_router(state: Arc<ClinicState>) -> Router {
    let apis = &state.apis;

    // NOTE: Path params use `:param` syntax (axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/stats", get(endpoints::health::stats))
        .with_state(Arc::clone(&state))
        .nest("/users", collection_routes(&apis.users, &state))
        .nest("/patients", collection_routes(&apis.patients, &state))
        .nest("/appointments", collection_routes(&apis.appointments, &state))
        .nest("/emr", collection_routes(&apis.medical_records, &state))
        .nest("/billing/invoices", collection_routes(&apis.invoices, &state))
        .nest("/billing/payments", collection_routes(&apis.payments, &state))
        .nest("/inventory", collection_routes(&apis.inventory, &state))
        .nest(
            "/inventory/movements",
            collection_routes(&apis.stock_movements, &state),
        )
        .nest("/notifications", collection_routes(&apis.notifications, &state));

    Router::new().nest("/api", api)
}

fn collection_routes<T: Entity>(api: &Arc<MockApi<T>>, state: &Arc<ClinicState>) -> Router {
    let ctx = CollectionContext {
        api: Arc::clone(api),
        state: Arc::clone(state),
    };
    Router::new()
        .route("/", get(collections::list::<T>))
        .route("/seed", post(collections::seed::<T>))
        .route("/:id", get(collections::detail::<T>))
        .with_state(ctx)
}
