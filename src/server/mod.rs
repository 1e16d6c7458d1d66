//! # Server — HTTP Surface for the Donation Platform
//!
//! Runs an Axum HTTP server exposing the JSON API: authentication,
//! inventory and donation intake, the order lifecycle, and the role-scoped
//! order views. A 30-second background loop refreshes the domain gauges.

pub(crate) mod middleware_auth;
mod routes_auth;
mod routes_dashboard;
mod routes_donations;
mod routes_health;
mod routes_inventory;
mod routes_orders;

use crate::{db, prom_metrics};
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{warn, Instrument};

pub struct AppState {
    pub db: db::Database,
    pub session_secret: String,
    pub prom_metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn with_db(db: db::Database, session_secret: &str) -> Arc<Self> {
        Arc::new(AppState {
            db,
            session_secret: session_secret.to_string(),
            prom_metrics: prom_metrics::Metrics::new(),
        })
    }
}

/// Middleware that records HTTP request duration into the Prometheus
/// histogram, generates (or propagates) a request ID for correlation, and
/// wraps the request in a tracing span using `.instrument()` for proper
/// async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    let mut response = response;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Normalize URL path to collapse high-cardinality segments (numeric IDs,
/// usernames in donor intake paths) into placeholders, preventing histogram
/// label explosion.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut prev = "";
    for seg in path.split('/') {
        let normalized = if seg.is_empty() {
            seg.to_string()
        } else if seg.chars().all(|c| c.is_ascii_digit()) {
            ":id".to_string()
        } else if prev == "donations" && seg != "check" {
            ":donor".to_string()
        } else {
            seg.to_string()
        };
        prev = seg;
        segments.push(normalized);
    }
    segments.join("/")
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Accounts & sessions
        .route("/api/register", post(routes_auth::handler_register))
        .route("/api/login", post(routes_auth::handler_login))
        .route("/api/logout", post(routes_auth::handler_logout))
        .route("/api/me", get(routes_auth::handler_me))
        .route("/api/roles", get(routes_auth::handler_roles))
        // Dashboard
        .route("/api/dashboard", get(routes_dashboard::handler_dashboard))
        // Catalog & inventory
        .route("/api/inventory", get(routes_inventory::handler_inventory))
        .route(
            "/api/items/available",
            get(routes_inventory::handler_available_items),
        )
        .route("/api/items/{id}", get(routes_inventory::handler_item_locations))
        .route("/api/categories", get(routes_inventory::handler_categories))
        .route(
            "/api/subcategories",
            post(routes_inventory::handler_subcategories),
        )
        // Donations
        .route("/api/donations", get(routes_donations::handler_donations))
        .route(
            "/api/donations/check",
            post(routes_donations::handler_check_donor),
        )
        .route(
            "/api/donations/{donor}",
            post(routes_donations::handler_record_donation),
        )
        // Orders
        .route(
            "/api/orders",
            get(routes_orders::handler_orders).post(routes_orders::handler_start_order),
        )
        .route("/api/orders/{id}", get(routes_orders::handler_order_details))
        .route(
            "/api/orders/{id}/items",
            get(routes_orders::handler_order_items).post(routes_orders::handler_add_item),
        )
        .route(
            "/api/orders/{id}/prepare",
            post(routes_orders::handler_prepare_order),
        )
        .route(
            "/api/orders/status",
            post(routes_orders::handler_update_status),
        )
        .route(
            "/api/volunteers/ranking",
            get(routes_orders::handler_volunteer_ranking),
        )
        // Health & observability
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(port: u16, database_url: &str, session_secret: &str) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let state = AppState::with_db(database, session_secret);
    let app = build_router(state.clone());

    // Background task: refresh domain gauges
    let gauge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            match gauge_state.db.count_orders().await {
                Ok(n) => gauge_state.prom_metrics.orders_total.set(n),
                Err(e) => {
                    warn!(error = %e, "failed to refresh orders gauge");
                    continue;
                }
            };
            match gauge_state.db.count_items().await {
                Ok(n) => gauge_state.prom_metrics.inventory_items.set(n),
                Err(e) => {
                    warn!(error = %e, "failed to refresh inventory gauge");
                    continue;
                }
            };
        }
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "welcomehome server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_collapses_numeric_ids() {
        assert_eq!(normalize_path("/api/orders/42"), "/api/orders/:id");
        assert_eq!(
            normalize_path("/api/orders/42/prepare"),
            "/api/orders/:id/prepare"
        );
        assert_eq!(normalize_path("/api/items/17"), "/api/items/:id");
    }

    #[test]
    fn normalize_path_collapses_donor_segments() {
        assert_eq!(
            normalize_path("/api/donations/alice"),
            "/api/donations/:donor"
        );
        assert_eq!(
            normalize_path("/api/donations/check"),
            "/api/donations/check"
        );
    }

    #[test]
    fn normalize_path_leaves_static_routes_alone() {
        assert_eq!(normalize_path("/api/orders"), "/api/orders");
        assert_eq!(normalize_path("/healthz"), "/healthz");
    }
}
