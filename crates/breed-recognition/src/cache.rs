/// Short-lived Redis cache of successful recognition results.
///
/// Key schema:
/// - `breed:v1:result:{sha256(scope | hint | image)}`: JSON-serialized RecognitionResult (TTL)
///
/// `scope` fingerprints the classifier model and the instruction built from the
/// catalog, so switching either stops serving earlier results.
///
/// Failed results are never stored. Without Redis every lookup misses.
use sha2::{Digest, Sha256};
use tracing::warn;

use breed_common::redis::RedisCache;

use crate::model::{RecognitionRequest, RecognitionResult};

const KEY_PREFIX: &str = "breed:v1:";

pub struct RecognitionCache {
    redis: RedisCache,
    ttl_secs: u64,
    scope: String,
}

impl RecognitionCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl_secs,
            scope: String::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(RedisCache::disabled(), 0)
    }

    /// Tie cached results to one classifier model and one instruction text.
    pub fn scoped(mut self, model: &str, instruction: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b"\n");
        hasher.update(instruction.as_bytes());
        self.scope = format!("{:x}", hasher.finalize());
        self
    }

    pub async fn get(&self, request: &RecognitionRequest) -> Option<RecognitionResult> {
        let key = self.result_key(request);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn put(&self, request: &RecognitionRequest, result: &RecognitionResult) {
        if !result.success || self.ttl_secs == 0 {
            return;
        }
        let key = self.result_key(request);
        if let Ok(json) = serde_json::to_string(result) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    fn result_key(&self, request: &RecognitionRequest) -> String {
        let hint = request
            .animal_type
            .as_deref()
            .map(|h| h.trim().to_lowercase())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(self.scope.as_bytes());
        hasher.update(b"|");
        hasher.update(hint.as_bytes());
        hasher.update(b"|");
        hasher.update(request.image_base64.trim().as_bytes());
        format!("{KEY_PREFIX}result:{:x}", hasher.finalize())
    }
}
