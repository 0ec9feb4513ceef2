use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tracing::{info, Level};

use smartspecs::catalog::{FrameSearch, InMemoryCatalog};
use smartspecs::config::Configuration;
use smartspecs::error::{AppError, ServiceError};
use smartspecs::pipeline::services::{FaceAnalyzer, SimulatedTryOn};
use smartspecs::pipeline::types::Stage;
use smartspecs::pipeline::{Intent, PipelineRunner};

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

// Offline stand-in for the real analysis backend; the flow itself is what
// this binary demonstrates. A production frontend supplies its own
// `FaceAnalyzer` over whatever transport it uses.
struct CannedAnalyzer;

#[async_trait]
impl FaceAnalyzer for CannedAnalyzer {
    async fn analyze(&self, _image: &[u8]) -> Result<Value, ServiceError> {
        Ok(json!({
            "analysis": {
                "face_shape": "oval",
                "recommended_frame_shapes": ["round", "aviator"],
                "recommended_frame_sizes": ["medium"],
                "recommended_frame_colors": ["black", "tortoise", "gold"],
                "reasoning": "Oval faces carry most frame shapes well; rounded and aviator styles keep the proportions soft."
            }
        }))
    }
}

fn sample_catalog() -> InMemoryCatalog {
    let record = |id: &str, name: &str, shape: &str, color: &str, in_stock: bool, day: u32| {
        json!({
            "id": id,
            "name": name,
            "brand": "Lumen",
            "frame_shape": shape,
            "frame_size": "medium",
            "frame_color": color,
            "material": "acetate",
            "price": 129.0,
            "image_url": format!("https://catalog.example/{}.jpg", id),
            "in_stock": in_stock,
            "description": "Handmade acetate frame.",
            "created_at": Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap().to_rfc3339()
        })
    };
    InMemoryCatalog::new(vec![
        record("p-1", "Round Tort", "round", "tortoise", true, 3),
        record("p-2", "Aviator Classic", "aviator", "gold", true, 9),
        record("p-3", "Round Noir", "round", "black", false, 12),
        record("p-4", "Square Slim", "square", "black", true, 5),
    ])
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let configuration = Configuration::load()?;

    let search = FrameSearch::new(Arc::new(sample_catalog()), configuration.result_limit);
    let (runner, handle) = PipelineRunner::new(
        &configuration,
        Arc::new(CannedAnalyzer),
        search,
        Arc::new(SimulatedTryOn),
    );
    tokio::spawn(runner.run());

    let mut snapshots = handle.watch();
    handle.submit(Intent::ConfirmPhoto(vec![0u8; 64])).await;
    while snapshots.changed().await.is_ok() {
        let session = snapshots.borrow().clone();
        match session.stage {
            Stage::Recommending if !session.loading => {
                for product in &session.products {
                    info!("Recommended: {} ({})", product.name, product.frame_shape);
                }
                let Some(first) = session.products.first().cloned() else {
                    break;
                };
                handle.submit(Intent::SelectProduct(first)).await;
            }
            Stage::TryingOn if session.preview.is_some() => {
                let preview = session.preview.as_ref().unwrap();
                info!("Preview ready for {}", preview.frame_name);
                if let Some(note) = &preview.note {
                    info!("{}", note);
                }
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
