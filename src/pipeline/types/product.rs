use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// A catalog entry. Owned and mutated only by the catalog store; the pipeline
// treats products as immutable values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub frame_shape: String,
    pub frame_size: String,
    pub frame_color: String,
    pub material: String,
    pub price: f64,
    pub image_url: String,
    pub in_stock: bool,
    pub description: String,
    // Used only as the secondary ordering key in search results.
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativePrice(self.price));
        }
        Ok(())
    }
}
