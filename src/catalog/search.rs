use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::store::CatalogStore;
use crate::error::ServiceError;
use crate::pipeline::contracts;
use crate::pipeline::types::{Analysis, Product};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    pub shapes: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

impl From<&Analysis> for SearchCriteria {
    fn from(analysis: &Analysis) -> Self {
        Self {
            shapes: analysis.recommended_frame_shapes.clone(),
            sizes: analysis.recommended_frame_sizes.clone(),
            colors: analysis.recommended_frame_colors.clone(),
        }
    }
}

// Turns soft analysis criteria into a bounded, deterministically ordered
// product list. Matching nothing is a valid empty result; only store
// failures surface as errors.
#[derive(Clone)]
pub struct FrameSearch {
    store: Arc<dyn CatalogStore>,
    result_limit: usize,
}

impl FrameSearch {
    pub fn new(store: Arc<dyn CatalogStore>, result_limit: usize) -> Self {
        Self {
            store,
            result_limit,
        }
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Product>, ServiceError> {
        let records = self.store.query(criteria).await?;
        let total = records.len();

        let mut products: Vec<Product> = records
            .into_iter()
            .filter_map(|record| match contracts::product_from_value(record) {
                Ok(product) => Some(product),
                Err(e) => {
                    debug!("Dropping malformed catalog record: {}", e);
                    None
                }
            })
            .collect();
        let dropped = total - products.len();
        if dropped > 0 {
            warn!("Dropped {} malformed catalog record(s) from results", dropped);
        }

        // In-stock first, newest first; stable sort keeps catalog iteration
        // order for remaining ties.
        products.sort_by(|a, b| {
            b.in_stock
                .cmp(&a.in_stock)
                .then(b.created_at.cmp(&a.created_at))
        });
        products.truncate(self.result_limit);
        Ok(products)
    }
}
