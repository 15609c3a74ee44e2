use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};

use breed_common::vision::{Classifier, VisionClient};

use crate::model::{BreedListing, ModelList, RecognitionRequest, RecognitionResult};
use crate::recognizer::Recognizer;

#[derive(Clone)]
pub struct BreedRecognitionServer {
    recognizer: Arc<Recognizer<VisionClient>>,
    tool_router: ToolRouter<BreedRecognitionServer>,
}

impl BreedRecognitionServer {
    pub fn new(recognizer: Arc<Recognizer<VisionClient>>) -> Self {
        Self {
            recognizer,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl BreedRecognitionServer {
    #[tool(description = "Identify the cattle or buffalo breed in a photo. Pass the image as base64 (a data: URL is accepted) and optionally animal_type ('cattle' or 'buffalo') as a hint. Every failure, including missing classifier credentials, comes back with success=false and an error message.")]
    async fn recognize_breed(
        &self,
        Parameters(request): Parameters<RecognitionRequest>,
    ) -> Result<Json<RecognitionResult>, String> {
        let result = match self.recognizer.recognize(&request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "breed recognition unavailable");
                RecognitionResult::failed(e.to_string())
            }
        };
        Ok(Json(result))
    }

    #[tool(description = "List every known breed with origin, utility, traits, color, horn shape and size, grouped into cattle and buffalo.")]
    async fn list_breeds(&self) -> Result<Json<BreedListing>, String> {
        Ok(Json(self.recognizer.catalog().listing()))
    }

    #[tool(description = "List model ids offered by the configured classifier host.")]
    async fn list_models(&self) -> Result<Json<ModelList>, String> {
        let listing = self
            .recognizer
            .classifier()
            .list_models()
            .await
            .map_err(|e| format!("list_models failed: {e}"))?;
        Ok(Json(ModelList {
            models: listing.data.into_iter().map(|m| m.id).collect(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for BreedRecognitionServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "breed-recognition".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Cattle and buffalo breed recognition for Indian breeds. Call recognize_breed with a \
base64 photo to get the breed, confidence, catalog details and alternatives. Use list_breeds to see \
the breeds the service can resolve."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use breed_common::vision::VisionClientConfig;

    use super::*;
    use crate::cache::RecognitionCache;
    use crate::catalog::Catalog;

    fn unconfigured_server() -> BreedRecognitionServer {
        let client = VisionClient::new(VisionClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..VisionClientConfig::default()
        })
        .unwrap();
        let recognizer = Recognizer::new(
            Arc::new(Catalog::indian_breeds()),
            client,
            RecognitionCache::disabled(),
            None,
        );
        BreedRecognitionServer::new(Arc::new(recognizer))
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = BreedRecognitionServer::tool_router().list_all();
        for name in ["recognize_breed", "list_breeds", "list_models"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn recognize_without_credentials_is_a_failed_result() {
        let server = unconfigured_server();
        let Json(result) = server
            .recognize_breed(Parameters(RecognitionRequest {
                image_base64: "iVBORw0KGgo".to_string(),
                animal_type: None,
            }))
            .await
            .unwrap();
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("config error"), "{error}");
        assert!(result.breed.is_none());
    }

    #[tokio::test]
    async fn empty_image_is_a_failed_result() {
        let Json(result) = unconfigured_server()
            .recognize_breed(Parameters(RecognitionRequest {
                image_base64: "  ".to_string(),
                animal_type: Some("cattle".to_string()),
            }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn list_breeds_covers_both_categories() {
        let Json(listing) = unconfigured_server().list_breeds().await.unwrap();
        assert!(listing.cattle.iter().any(|b| b.name == "Gir"));
        assert!(listing.buffalo.iter().any(|b| b.name == "Murrah"));
    }
}
