use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::search::SearchCriteria;
use crate::error::ServiceError;
use crate::pipeline::types::Product;

// Read-only seam over the product catalog. Implementations filter on the
// raw criteria; ordering and truncation are the search component's job.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn query(&self, criteria: &SearchCriteria) -> Result<Vec<Value>, ServiceError>;
}

// Catalog backed by a fixed set of raw records. Records are returned in
// insertion order, which is the final tie-break for search ordering.
pub struct InMemoryCatalog {
    records: Vec<Value>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        let records = products
            .into_iter()
            .filter_map(|product| serde_json::to_value(product).ok())
            .collect();
        Self { records }
    }

    fn matches(record: &Value, attribute: &str, allowed: &[String]) -> bool {
        // An empty criterion list is an open filter, not an empty-result
        // constraint; partial analysis output still yields candidates.
        if allowed.is_empty() {
            return true;
        }
        record
            .get(attribute)
            .and_then(Value::as_str)
            .map(|value| allowed.iter().any(|candidate| candidate == value))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn query(&self, criteria: &SearchCriteria) -> Result<Vec<Value>, ServiceError> {
        let matched = self
            .records
            .iter()
            .filter(|record| {
                Self::matches(record, "frame_shape", &criteria.shapes)
                    && Self::matches(record, "frame_size", &criteria.sizes)
                    && Self::matches(record, "frame_color", &criteria.colors)
            })
            .cloned()
            .collect();
        Ok(matched)
    }
}
