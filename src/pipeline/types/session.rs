use std::sync::Arc;

use uuid::Uuid;

use super::analysis::Analysis;
use super::product::Product;

// One phase of the capture -> recommend -> try-on flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Capturing,
    Analyzing,
    Recommending,
    TryingOn,
}

// Composited (or passthrough) preview returned by the try-on renderer. A
// present `note` marks a degraded/simulated render and is informational,
// never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnPreview {
    pub image: Arc<[u8]>,
    pub frame_name: String,
    pub note: Option<String>,
}

// Working state of one user's flow. The controller is the only writer; the
// presentation layer reads cloned snapshots and submits intents.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub stage: Stage,
    pub photo: Option<Arc<[u8]>>,
    pub analysis: Option<Analysis>,
    pub products: Vec<Product>,
    pub selected: Option<Product>,
    pub preview: Option<TryOnPreview>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    // Bumped by every intent that invalidates in-flight work; completions
    // carrying an older epoch are discarded.
    pub epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Capturing,
            photo: None,
            analysis: None,
            products: Vec::new(),
            selected: None,
            preview: None,
            loading: false,
            last_error: None,
            notice: None,
            epoch: 0,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
