// API Integration Tests
//
// Purpose: exercise the HTTP surface against the reference fixtures
// Run with: cargo test --features api --test api_integration_tests

#[cfg(feature = "api")]
mod api_tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use releve_analyzer::data::ReferencePaths;
    use releve_analyzer::pipeline::NO_MATCH_MESSAGE;
    use releve_analyzer::{create_router, AppState, JsonEncoder};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // for oneshot

    const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

    // Helper: Create test app over the fixture reference data
    async fn create_test_app() -> axum::Router {
        create_router(AppState::new(FIXTURES).await)
    }

    // Helper: POST raw bytes to the analysis endpoint
    async fn post_analyze(app: axum::Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/analyze")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        (status, json_response(response).await)
    }

    // Helper: Parse JSON response
    async fn json_response(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&body).expect("Failed to parse JSON")
    }

    // =========================================================================
    // Section 1: Health Check
    // =========================================================================

    #[tokio::test]
    async fn test_health_check() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    // =========================================================================
    // Section 2: Successful analyses
    // =========================================================================

    #[tokio::test]
    async fn test_analyze_two_plots() {
        let app = create_test_app().await;
        let request = json!({
            "releves_data": [
                ["Chênaie", "Pelouse"],
                ["Quercus robur", "Bromus erectus"],
                ["Fagus sylvatica", "Carex flacca"],
                ["Hedera helix", "Brachypodium pinnatum"]
            ],
            "selected_indices": [0, 1]
        });

        let (status, body) = post_analyze(app, request.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["species_data"].as_array().unwrap().len(), 6);
        assert_eq!(body["species_data"][3]["Source_Habitat"], "Pelouse");
        assert_eq!(body["pca_coords"].as_array().unwrap().len(), 6);
        assert_eq!(body["cluster_labels"].as_array().unwrap().len(), 6);
        assert_eq!(body["communalities"].as_array().unwrap().len(), 10);

        // Fagion and Mesobromion tie on 3: reference order is kept
        let ids: Vec<&str> = body["top_syntaxons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["FAG", "MESO", "CARP"]);
        assert_eq!(body["top_syntaxons"][1]["score"], 3);
        assert_eq!(body["top_syntaxons"][1]["absent_species"], json!([]));
    }

    #[tokio::test]
    async fn test_analyze_no_match_is_informational() {
        let app = create_test_app().await;
        let request = json!({
            "releves_data": [["Vide"], ["Taxon absent"]],
            "selected_indices": [0]
        });

        let (status, body) = post_analyze(app, request.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": NO_MATCH_MESSAGE }));
    }

    // =========================================================================
    // Section 3: Input errors (400)
    // =========================================================================

    #[tokio::test]
    async fn test_analyze_empty_selection_rejected() {
        let app = create_test_app().await;
        let request = json!({
            "releves_data": [["A"], ["Quercus robur"]],
            "selected_indices": []
        });

        let (status, body) = post_analyze(app, request.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Données de relevé ou indices manquants");
        assert!(body.get("trace").is_none());
    }

    #[tokio::test]
    async fn test_analyze_empty_body_rejected() {
        let app = create_test_app().await;
        let (status, body) = post_analyze(app, Body::empty()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Données de relevé ou indices manquants");
    }

    #[tokio::test]
    async fn test_analyze_malformed_json_rejected() {
        let app = create_test_app().await;
        let (status, body) = post_analyze(app, "{\"releves_data\": [").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Requête invalide"));
    }

    #[tokio::test]
    async fn test_analyze_out_of_range_plot_rejected() {
        let app = create_test_app().await;
        let request = json!({
            "releves_data": [["A", "B"], ["Quercus robur", "Fagus sylvatica"]],
            "selected_indices": [0, 5]
        });

        let (status, body) = post_analyze(app, request.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains('5'));
    }

    // =========================================================================
    // Section 4: Internal errors (500)
    // =========================================================================

    #[tokio::test]
    async fn test_missing_reference_reports_trace() {
        let state = AppState::with_encoder(
            ReferencePaths::in_dir("/nonexistent/reference/dir"),
            Arc::new(JsonEncoder),
        );
        let app = create_router(state);
        let request = json!({
            "releves_data": [["A"], ["Quercus robur"]],
            "selected_indices": [0]
        });

        let (status, body) = post_analyze(app, request.to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Une erreur est survenue pendant l'analyse"));
        assert!(body["trace"].as_str().unwrap().contains("data_ref.csv"));
    }
}
