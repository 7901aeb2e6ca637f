use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::routing::post;
use axum::{Json, Router};

use bento_core::analysis::AnalysisResult;

use crate::assembler;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/analyze-day", post(analyze_day))
}

/// Analyze one day of food logs
///
/// Accepts any body. Unreadable or malformed input, days without meals and
/// narrative backend outages all produce HTTP 200 with `success: true`;
/// `isBackup` tells the client whether the text came from a fallback.
#[utoipa::path(
    post,
    path = "/analyze-day",
    request_body(
        content = serde_json::Value,
        description = "Loosely structured day: `context` (goalType, todayDate, timezone), optional `userProfile`, and a meal list (`foodLogs`) of {mealType, description, date?, time?}. Unknown fields are ignored.",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Analysis result (always returned, possibly degraded)", body = AnalysisResult)
    ),
    tag = "analysis"
)]
pub async fn analyze_day(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<AnalysisResult> {
    let body = body.unwrap_or_else(|rejection| {
        tracing::debug!(error = %rejection, "analyze-day body could not be read");
        Bytes::new()
    });

    let result = assembler::analyze_day(
        &body,
        &state.policy,
        state.narrator.as_ref(),
        state.narrative_timeout,
    )
    .await;

    Json(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use bento_core::analysis::AnalysisPolicy;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::narrative::NarrativeGenerator;
    use crate::narrative::stubs::{FailingNarrative, FixedNarrative};

    fn app(narrator: Arc<dyn NarrativeGenerator>) -> Router {
        crate::routes::router().with_state(AppState::new(
            AnalysisPolicy::default(),
            narrator,
            Duration::from_secs(5),
        ))
    }

    async fn post_analyze(app: Router, body: impl Into<Body>, content_type: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method("POST").uri("/analyze-day");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let response = app
            .oneshot(request.body(body.into()).expect("request should build"))
            .await
            .expect("request should succeed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = serde_json::from_slice(&bytes).expect("response should be JSON");
        (status, json)
    }

    #[tokio::test]
    async fn unparsable_body_returns_200_backup() {
        let (status, json) = post_analyze(
            app(Arc::new(FixedNarrative("unused".to_string()))),
            "this is not json",
            Some("application/json"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["isBackup"], true);
        assert_eq!(json["score"], 60);
        assert!(json["analysisText"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn missing_body_and_content_type_still_returns_200() {
        let (status, json) =
            post_analyze(app(Arc::new(FailingNarrative)), Body::empty(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["isBackup"], true);
    }

    #[tokio::test]
    async fn oversized_body_is_served_as_parse_failure() {
        // Valid JSON with a meal, but past axum's 2 MB default body limit.
        let padding = "x".repeat(2 * 1024 * 1024 + 1);
        let body = format!(r#"{{"foodLogs": [{{"description": "雞胸肉"}}], "pad": "{padding}"}}"#);

        let (status, json) = post_analyze(
            app(Arc::new(FixedNarrative("unused".to_string()))),
            body,
            Some("application/json"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["isBackup"], true);
        assert_eq!(json["score"], 60);
    }

    #[tokio::test]
    async fn empty_logs_score_50_and_ask_for_a_meal() {
        let (status, json) = post_analyze(
            app(Arc::new(FixedNarrative("unused".to_string()))),
            r#"{"context": {"goalType": "muscle_gain"}, "foodLogs": []}"#,
            Some("application/json"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["score"], 50);
        assert_eq!(json["isBackup"], true);
        assert!(json["analysisText"]
            .as_str()
            .is_some_and(|t| t.contains("請至少記錄一餐")));
    }

    #[tokio::test]
    async fn adapter_failure_keeps_score_and_flags_backup() {
        let (status, json) = post_analyze(
            app(Arc::new(FailingNarrative)),
            r#"{"context": {"goalType": "fat_loss"}, "foodLogs": [{"description": "珍奶"}, {"description": "雞胸肉沙拉"}]}"#,
            Some("application/json"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["score"], 65);
        assert_eq!(json["isBackup"], true);
        assert_eq!(json["suggestions"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn adapter_success_returns_generated_text() {
        let (status, json) = post_analyze(
            app(Arc::new(FixedNarrative("多喝水，少喝手搖。".to_string()))),
            r#"{"userProfile": {"country": "Taiwan"}, "foodLogs": [{"mealType": "lunch", "description": "雞腿便當"}]}"#,
            Some("application/json"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isBackup"], false);
        assert_eq!(json["score"], 70);
        assert!(json["analysisText"]
            .as_str()
            .is_some_and(|t| t.contains("多喝水，少喝手搖。")));
        assert_eq!(json["suggestions"], Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn health_is_ok_without_credentials() {
        let response = app(Arc::new(FailingNarrative))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json: Value = serde_json::from_slice(&bytes).expect("response should be JSON");
        assert_eq!(json["status"], "ok");
    }
}
