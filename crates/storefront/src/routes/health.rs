//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};

use crate::db::Store;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, empty_request, send};

    #[tokio::test]
    async fn test_health_and_readiness() {
        let store = MemoryStore::new();

        let response = send(app(&store, None), empty_request("GET", "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(app(&store, None), empty_request("GET", "/health/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
