use async_trait::async_trait;
use serde_json::Value;

use crate::error::ServiceError;

// Face analysis capability. Returns the raw `{ "analysis": ... }` envelope;
// the controller validates it into a typed `Analysis`, so a structurally
// broken response is an analysis-stage failure rather than a crash.
#[async_trait]
pub trait FaceAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<Value, ServiceError>;
}
