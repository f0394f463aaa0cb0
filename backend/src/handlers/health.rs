//! Service health reporting

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthReport {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub record_store: &'static str,
}

/// Overall status follows the record store: the ledger cannot take
/// purchases or sales without it.
fn report(store_reachable: bool) -> HealthReport {
    HealthReport {
        service: "granel",
        status: if store_reachable { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        record_store: if store_reachable {
            "reachable"
        } else {
            "unreachable"
        },
    }
}

/// Liveness probe, including record-store reachability
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let store_reachable = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    Json(report(store_reachable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_when_store_reachable() {
        let r = report(true);
        assert_eq!(r.status, "healthy");
        assert_eq!(r.record_store, "reachable");
        assert_eq!(r.service, "granel");
    }

    #[test]
    fn test_degraded_when_store_unreachable() {
        let r = report(false);
        assert_eq!(r.status, "degraded");
        assert_eq!(r.record_store, "unreachable");
    }
}
