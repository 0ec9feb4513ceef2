//! Structural validation of raw service payloads. A payload that fails here
//! becomes a stage failure at the controller boundary, never a crash.

use serde_json::Value;

use crate::error::ValidationError;
use crate::pipeline::types::{Analysis, Product};

// The face analysis service wraps its result as `{ "analysis": { ... } }`.
pub fn analysis_from_value(payload: Value) -> Result<Analysis, ValidationError> {
    let inner = payload
        .get("analysis")
        .cloned()
        .ok_or(ValidationError::MissingField("analysis"))?;
    let analysis: Analysis = serde_json::from_value(inner)?;
    if analysis.recommended_frame_shapes.is_empty() {
        return Err(ValidationError::EmptyFrameShapes);
    }
    Ok(analysis)
}

// Catalog records arrive as raw JSON; a record missing required attributes
// is rejected here and dropped by the caller rather than propagated.
pub fn product_from_value(record: Value) -> Result<Product, ValidationError> {
    let product: Product = serde_json::from_value(record)?;
    product.validate()?;
    Ok(product)
}
