//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS for the dashboard frontend.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Parameters
        .route("/parameters", get(handlers::get_parameters))
        .route("/parameters/{name}", put(handlers::update_parameter))
        .route("/params", get(handlers::get_parameter_domains))
        .route("/filters", get(handlers::get_filters))
        // Series
        .route("/variables", get(handlers::list_variables))
        .route("/series", get(handlers::get_series))
        .route("/series/comparison", get(handlers::get_comparison))
        .route("/series/statistics", get(handlers::get_statistics))
        .route("/climate", get(handlers::get_climate))
        // Cache
        .route("/cache/stats", get(handlers::get_cache_stats))
        .route("/cache/clear", post(handlers::clear_cache));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LocalCatalog, SeriesClient};
    use crate::models::{RawSeriesPoint, TimeWindow};
    use crate::params::ParameterStore;
    use crate::services::{ScenarioSeriesCache, SeriesPipeline};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const VARIABLE: &str = "YRB available surface water";

    fn state() -> AppState {
        let catalog = LocalCatalog::new();
        catalog.add_scenario("sc1", [("SNWTP", 0.0), ("Fertility Variation", 1.0)]);
        catalog.add_scenario("sc2", [("SNWTP", 0.0), ("Fertility Variation", 1.6)]);
        catalog.add_scenario("sc3", [("SNWTP", 1.0), ("Fertility Variation", 1.0)]);
        for (id, first, second) in [("sc1", 10.0, 20.0), ("sc2", 30.0, 40.0), ("sc3", 5.0, 6.0)] {
            catalog.add_series(
                VARIABLE,
                id,
                vec![RawSeriesPoint::new(2020, first), RawSeriesPoint::new(2021, second)],
            );
        }

        let client: Arc<dyn SeriesClient> = Arc::new(catalog);
        let pipeline = SeriesPipeline::new(
            ParameterStore::new(crate::params::ParameterSnapshot::wildcard()),
            client,
            Arc::new(ScenarioSeriesCache::unbounded()),
            TimeWindow::new(2020, 2021).unwrap(),
        );
        AppState::new(pipeline, 2020)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn put_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(create_router(state()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["source"], "connected");
    }

    #[tokio::test]
    async fn test_series_follows_parameter_updates() {
        let state = state();

        let (status, body) = send(
            create_router(state.clone()),
            get("/v1/series?variable=YRB%20available%20surface%20water"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "multi");
        assert!(body.get("value").is_none());

        let (status, _) = send(
            create_router(state.clone()),
            put_json("/v1/parameters/water_transfer", r#"{"value": true}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            create_router(state),
            get("/v1/series?variable=YRB%20available%20surface%20water"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "single");
        assert_eq!(body["value"], serde_json::json!([5.0, 6.0]));
    }

    #[tokio::test]
    async fn test_parameter_domains() {
        let (status, body) = send(create_router(state()), get("/v1/params")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parameters"]["SNWTP"], serde_json::json!([0.0, 1.0]));
        assert_eq!(
            body["parameters"]["Fertility Variation"],
            serde_json::json!([1.0, 1.6])
        );
    }

    #[tokio::test]
    async fn test_unknown_parameter_is_not_found() {
        let (status, body) = send(
            create_router(state()),
            put_json("/v1/parameters/rainfall", r#"{"value": 1}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_no_match_maps_to_404() {
        let state = state();
        state
            .pipeline
            .store()
            .update(crate::params::ParameterKey::Fertility, 9.0);

        let (status, body) = send(
            create_router(state),
            get("/v1/series?variable=YRB%20available%20surface%20water"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NO_MATCH");
    }

    #[tokio::test]
    async fn test_comparison_and_cache_stats() {
        let state = state();
        let (status, body) = send(
            create_router(state.clone()),
            get("/v1/series/comparison?variable=YRB%20available%20surface%20water"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Mean of the two scenarios: 20 in 2020, 30 in 2021.
        assert_eq!(body["now"], 20.0);
        assert_eq!(body["future"], 30.0);
        assert_eq!(body["diffPercent"], 50.0);

        let (status, body) = send(create_router(state), get("/v1/cache/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"], 1);
    }

    #[tokio::test]
    async fn test_inverted_statistics_window_is_bad_request() {
        let (status, body) = send(
            create_router(state()),
            get("/v1/series/statistics?variable=YRB%20WSI&start_year=2050&end_year=2030"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}
