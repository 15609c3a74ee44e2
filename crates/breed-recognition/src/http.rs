/// REST surface for browser clients.
///
/// Routes:
/// - `GET  /api/`                 service banner
/// - `POST /api/recognize-breed`  classify one image
/// - `GET  /api/breeds`           the breed catalog
/// - `GET  /api/models`           model ids offered by the classifier host
/// - `GET  /health`               liveness plus credential presence
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use breed_common::vision::Classifier;

use crate::error::AppError;
use crate::model::{BreedListing, ModelList, RecognitionRequest, RecognitionResult};
use crate::recognizer::Recognizer;

const SERVICE_BANNER: &str = "Cattle & Buffalo Breed Recognition API";
// Base64 photos from phone cameras run to several megabytes.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn router<C>(recognizer: Arc<Recognizer<C>>, cors_origins: &[String]) -> Router
where
    C: Classifier + 'static,
{
    Router::new()
        .route("/api/", get(banner))
        .route("/api/recognize-breed", post(recognize_breed::<C>))
        .route("/api/breeds", get(list_breeds::<C>))
        .route("/api/models", get(list_models::<C>))
        .route("/health", get(health::<C>))
        .with_state(recognizer)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// `*` anywhere in the list allows any origin. Unparsable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .inspect_err(|_| warn!(origin = %origin, "ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        AllowOrigin::list(values)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Serialize)]
struct Banner {
    message: &'static str,
}

async fn banner() -> Json<Banner> {
    Json(Banner {
        message: SERVICE_BANNER,
    })
}

async fn recognize_breed<C: Classifier + 'static>(
    State(recognizer): State<Arc<Recognizer<C>>>,
    body: Result<Json<RecognitionRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RecognitionResult::failed(rejection.body_text())),
            )
                .into_response();
        }
    };

    match recognizer.recognize(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!(error = %e, "breed recognition unavailable");
            }
            (status, Json(RecognitionResult::failed(e.to_string()))).into_response()
        }
    }
}

async fn list_breeds<C: Classifier + 'static>(
    State(recognizer): State<Arc<Recognizer<C>>>,
) -> Json<BreedListing> {
    Json(recognizer.catalog().listing())
}

async fn list_models<C: Classifier + 'static>(
    State(recognizer): State<Arc<Recognizer<C>>>,
) -> Response {
    let classifier = recognizer.classifier();
    if !classifier.is_configured() {
        let e = AppError::Config("classifier API key not configured".to_string());
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
            .into_response();
    }
    match classifier.list_models().await {
        Ok(listing) => Json(ModelList {
            models: listing.data.into_iter().map(|m| m.id).collect(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "listing classifier models failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

async fn health<C: Classifier + 'static>(
    State(recognizer): State<Arc<Recognizer<C>>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "classifier_configured": recognizer.classifier().is_configured(),
    }))
}

fn status_for(e: &AppError) -> StatusCode {
    match e {
        AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AppError::Config(_) | AppError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::recognizer::tests::{recognizer, ScriptedClassifier};

    fn app(classifier: ScriptedClassifier) -> Router {
        router(Arc::new(recognizer(classifier)), &["*".to_string()])
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn recognize_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/recognize-breed")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn banner_names_the_service() {
        let (status, json) = send(app(ScriptedClassifier::failing()), get_request("/api/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Cattle & Buffalo Breed Recognition API");
    }

    #[tokio::test]
    async fn recognize_returns_the_assembled_result() {
        let classifier = ScriptedClassifier::replying(
            "Animal Type: buffalo\nPrimary Breed: Murrah\nConfidence: High\nReasoning: Tightly coiled horns\n",
        );
        let (status, json) = send(
            app(classifier),
            recognize_request(json!({ "image_base64": "iVBORw0KGgo", "animal_type": "buffalo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["breed"], "Murrah");
        assert_eq!(json["animal_type"], "buffalo");
        assert_eq!(json["breed_info"]["horn_shape"], "Coiled");
        assert_eq!(json["reasoning"], "Tightly coiled horns");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn classifier_failure_is_still_ok_with_success_false() {
        let (status, json) = send(
            app(ScriptedClassifier::failing()),
            recognize_request(json!({ "image_base64": "iVBORw0KGgo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("classifier error"));
    }

    #[tokio::test]
    async fn empty_image_is_a_bad_request() {
        let (status, json) = send(
            app(ScriptedClassifier::replying("Breed: Gir")),
            recognize_request(json!({ "image_base64": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (status, json) = send(
            app(ScriptedClassifier::replying("Breed: Gir")),
            recognize_request(json!({ "animal_type": "cattle" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn missing_credentials_are_a_server_error() {
        let (status, json) = send(
            app(ScriptedClassifier::unconfigured()),
            recognize_request(json!({ "image_base64": "iVBORw0KGgo" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("config error"));
    }

    #[tokio::test]
    async fn breeds_are_listed_per_category_in_catalog_order() {
        let (status, json) =
            send(app(ScriptedClassifier::failing()), get_request("/api/breeds")).await;
        assert_eq!(status, StatusCode::OK);
        let cattle: Vec<&str> = json["cattle"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["name"].as_str().unwrap())
            .collect();
        assert_eq!(cattle, ["Gir", "Red Sindhi"]);
        assert_eq!(json["buffalo"][0]["name"], "Murrah");
    }

    #[tokio::test]
    async fn models_need_credentials() {
        let (status, _) =
            send(app(ScriptedClassifier::unconfigured()), get_request("/api/models")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, json) =
            send(app(ScriptedClassifier::failing()), get_request("/api/models")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["models"], json!([]));
    }

    #[tokio::test]
    async fn health_reports_credential_presence() {
        let (status, json) =
            send(app(ScriptedClassifier::unconfigured()), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["classifier_configured"], false);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let response = app(ScriptedClassifier::failing())
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/recognize-breed")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn explicit_origins_only_allow_listed_hosts() {
        let origins = [
            "http://allowed.test".to_string(),
            "bad\norigin".to_string(),
        ];
        let app = router(
            Arc::new(recognizer(ScriptedClassifier::failing())),
            &origins,
        );

        let allowed = app.clone().oneshot(preflight("http://allowed.test")).await.unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://allowed.test"
        );

        let denied = app.oneshot(preflight("http://other.test")).await.unwrap();
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
