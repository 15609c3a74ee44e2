/// End-to-end recognition: prompt, classify, interpret.
use std::sync::Arc;

use tracing::{debug, error, info};

use breed_common::vision::{Classifier, ClassifyRequest};

use crate::assembler;
use crate::cache::RecognitionCache;
use crate::catalog::Catalog;
use crate::error::{AppError, RecognitionFailure};
use crate::model::{RecognitionRequest, RecognitionResult};
use crate::prompt;
use crate::rate_limit::RateLimiter;

pub struct Recognizer<C> {
    catalog: Arc<Catalog>,
    classifier: C,
    instruction: String,
    cache: RecognitionCache,
    limiter: Option<RateLimiter>,
}

impl<C: Classifier> Recognizer<C> {
    pub fn new(
        catalog: Arc<Catalog>,
        classifier: C,
        cache: RecognitionCache,
        limiter: Option<RateLimiter>,
    ) -> Self {
        let instruction = prompt::build(&catalog);
        let cache = cache.scoped(classifier.model_id(), &instruction);
        Self {
            catalog,
            classifier,
            instruction,
            cache,
            limiter,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Identify the breed in `request.image_base64`.
    ///
    /// Only precondition failures are errors: an empty image payload or a
    /// classifier without credentials. Every classifier failure comes back as
    /// a `success=false` result.
    pub async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResult, AppError> {
        if request.image_base64.trim().is_empty() {
            return Err(AppError::InvalidRequest("image_base64 must not be empty".to_string()));
        }
        if !self.classifier.is_configured() {
            return Err(AppError::Config("classifier API key not configured".to_string()));
        }

        if let Some(cached) = self.cache.get(request).await {
            info!(breed = cached.breed.as_deref().unwrap_or_default(), "recognition cache hit");
            return Ok(cached);
        }

        info!(
            image_bytes = request.image_base64.len(),
            hint = request.animal_type.as_deref().unwrap_or("none"),
            "sending breed recognition request"
        );
        let outcome = self.classify(request).await;
        match &outcome {
            Ok(reply) => debug!(reply = %preview(reply, 200), "received classifier reply"),
            Err(e) => error!(error = %e, "breed recognition failed"),
        }

        let result = assembler::finish(&self.catalog, outcome);
        if result.success {
            info!(
                breed = result.breed.as_deref().unwrap_or_default(),
                animal_type = result.animal_type.as_deref().unwrap_or_default(),
                resolved = result.breed_info.is_some(),
                alternatives = result.alternative_breeds.as_ref().map_or(0, Vec::len),
                "breed recognized"
            );
            self.cache.put(request, &result).await;
        }
        Ok(result)
    }

    async fn classify(&self, request: &RecognitionRequest) -> Result<String, RecognitionFailure> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await.map_err(RecognitionFailure::RateLimited)?;
        }
        let user_prompt = prompt::user_prompt(request.animal_type.as_deref());
        let reply = self
            .classifier
            .classify(ClassifyRequest {
                instruction: &self.instruction,
                prompt: &user_prompt,
                image_base64: &request.image_base64,
            })
            .await?;
        Ok(reply)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
