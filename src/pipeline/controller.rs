use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::SearchCriteria;
use crate::config::AnalysisRetryPolicy;
use crate::error::ServiceError;
use crate::pipeline::contracts;
use crate::pipeline::services::{RenderRequest, RenderResponse};
use crate::pipeline::types::{Product, Session, Stage, TryOnPreview};

// User intents forwarded by the presentation layer.
#[derive(Debug, Clone)]
pub enum Intent {
    ConfirmPhoto(Vec<u8>),
    SelectProduct(Product),
    Back,
    RetryAnalysis,
    DismissError,
}

// Service call to issue next. Each stage entry produces at most one command;
// the runner executes it and feeds the outcome back as a `Completion`.
#[derive(Debug, Clone)]
pub enum Command {
    Analyze { epoch: u64, image: Arc<[u8]> },
    Search { epoch: u64, criteria: SearchCriteria },
    Render { epoch: u64, request: RenderRequest },
}

// Outcome of a previously issued command, tagged with the epoch it was
// issued under so stale outcomes can be discarded.
#[derive(Debug)]
pub enum Completion {
    Analysis {
        epoch: u64,
        result: Result<Value, ServiceError>,
    },
    Search {
        epoch: u64,
        result: Result<Vec<Product>, ServiceError>,
    },
    Render {
        epoch: u64,
        result: Result<RenderResponse, ServiceError>,
    },
}

/// Drives the capture -> analyze -> recommend -> try-on flow as an explicit
/// state machine. The controller is the single writer to the session; it
/// never performs IO itself, it only emits `Command`s and applies
/// `Completion`s. In-flight calls are never cancelled; a completion whose
/// epoch or target stage no longer matches the session is discarded.
pub struct PipelineController {
    session: Session,
    retry_policy: AnalysisRetryPolicy,
}

impl PipelineController {
    pub fn new(retry_policy: AnalysisRetryPolicy) -> Self {
        Self {
            session: Session::new(),
            retry_policy,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> Session {
        self.session.clone()
    }

    pub fn handle_intent(&mut self, intent: Intent) -> Option<Command> {
        match intent {
            Intent::ConfirmPhoto(photo) => self.confirm_photo(photo),
            Intent::SelectProduct(product) => self.select_product(product),
            Intent::Back => {
                self.back();
                None
            }
            Intent::RetryAnalysis => self.retry_analysis(),
            Intent::DismissError => {
                self.session.last_error = None;
                None
            }
        }
    }

    pub fn apply(&mut self, completion: Completion) -> Option<Command> {
        match completion {
            Completion::Analysis { epoch, result } => self.complete_analysis(epoch, result),
            Completion::Search { epoch, result } => {
                self.complete_search(epoch, result);
                None
            }
            Completion::Render { epoch, result } => {
                self.complete_render(epoch, result);
                None
            }
        }
    }

    fn confirm_photo(&mut self, photo: Vec<u8>) -> Option<Command> {
        if self.session.stage != Stage::Capturing {
            debug!("Ignoring photo confirmation outside of capture");
            return None;
        }
        if self.session.loading {
            debug!("Analysis already in flight, ignoring repeated confirmation");
            return None;
        }
        self.session.photo = Some(Arc::from(photo));
        self.begin_analysis()
    }

    fn retry_analysis(&mut self) -> Option<Command> {
        if self.session.stage != Stage::Capturing || self.session.loading {
            debug!("Ignoring analysis retry outside of capture");
            return None;
        }
        if self.session.photo.is_none() {
            // Under the force-retake policy the photo is gone by now, so a
            // retry degenerates into a fresh capture.
            debug!("No retained photo to retry analysis on");
            return None;
        }
        self.begin_analysis()
    }

    fn begin_analysis(&mut self) -> Option<Command> {
        let image = self.session.photo.clone()?;
        self.session.epoch += 1;
        self.session.stage = Stage::Analyzing;
        self.session.loading = true;
        self.session.last_error = None;
        self.session.notice = None;
        info!("Dispatching face analysis (epoch {})", self.session.epoch);
        Some(Command::Analyze {
            epoch: self.session.epoch,
            image,
        })
    }

    fn select_product(&mut self, product: Product) -> Option<Command> {
        if self.session.stage != Stage::Recommending {
            debug!("Ignoring product selection outside of recommendations");
            return None;
        }
        if self.session.loading {
            debug!("Render already in flight, ignoring repeated selection");
            return None;
        }
        // A selection is always drawn from the current result list.
        if !self.session.products.iter().any(|p| p.id == product.id) {
            warn!("Selected product {} is not in the current results", product.id);
            return None;
        }
        let Some(user_image) = self.session.photo.clone() else {
            warn!("No captured photo available for try-on");
            return None;
        };

        self.session.epoch += 1;
        self.session.selected = Some(product.clone());
        self.session.preview = None;
        self.session.notice = None;
        // Optimistic transition: the stage changes now, the preview arrives
        // whenever the render completes.
        self.session.stage = Stage::TryingOn;
        self.session.loading = true;
        info!(
            "Trying on {} (epoch {})",
            product.name, self.session.epoch
        );
        Some(Command::Render {
            epoch: self.session.epoch,
            request: RenderRequest {
                user_image,
                frame_image_url: product.image_url,
                frame_name: product.name,
            },
        })
    }

    fn back(&mut self) {
        match self.session.stage {
            Stage::TryingOn => {
                // Keep the analysis and result list; no re-search on return.
                self.session.epoch += 1;
                self.session.stage = Stage::Recommending;
                self.session.selected = None;
                self.session.preview = None;
                self.session.loading = false;
                self.session.notice = None;
            }
            Stage::Recommending => {
                // Full restart: everything derived from the photo goes away.
                let epoch = self.session.epoch + 1;
                let id = self.session.id;
                self.session = Session::new();
                self.session.id = id;
                self.session.epoch = epoch;
            }
            Stage::Capturing | Stage::Analyzing => {
                debug!("Ignoring back navigation in {:?}", self.session.stage);
            }
        }
    }

    fn complete_analysis(
        &mut self,
        epoch: u64,
        result: Result<Value, ServiceError>,
    ) -> Option<Command> {
        if self.is_stale(epoch, Stage::Analyzing) {
            return None;
        }
        let analysis = match result {
            Ok(payload) => match contracts::analysis_from_value(payload) {
                Ok(analysis) => analysis,
                Err(e) => {
                    self.fail_analysis(e.to_string());
                    return None;
                }
            },
            Err(e) => {
                self.fail_analysis(e.to_string());
                return None;
            }
        };

        info!(
            "Face analysis complete: {} face, {} recommended shape(s)",
            analysis.face_shape,
            analysis.recommended_frame_shapes.len()
        );
        let criteria = SearchCriteria::from(&analysis);
        self.session.analysis = Some(analysis);
        // Same epoch: analysis and search are one uninterrupted stage pair.
        Some(Command::Search {
            epoch: self.session.epoch,
            criteria,
        })
    }

    fn fail_analysis(&mut self, message: String) {
        warn!("Face analysis failed: {}", message);
        self.session.loading = false;
        self.session.last_error = Some(message);
        self.session.stage = Stage::Capturing;
        if self.retry_policy == AnalysisRetryPolicy::ForceRetake {
            self.session.photo = None;
        }
    }

    fn complete_search(&mut self, epoch: u64, result: Result<Vec<Product>, ServiceError>) {
        if self.is_stale(epoch, Stage::Analyzing) {
            return;
        }
        self.session.loading = false;
        match result {
            Ok(products) => {
                let face_shape = self
                    .session
                    .analysis
                    .as_ref()
                    .map(|a| a.face_shape.to_string())
                    .unwrap_or_default();
                self.session.notice = Some(format!(
                    "Found {} frame(s) for your {} face shape.",
                    products.len(),
                    face_shape
                ));
                self.session.products = products;
            }
            Err(e) => {
                // Degraded-result policy: the user lands on an empty result
                // list with a visible error instead of a stalled pipeline.
                warn!("Frame search failed: {}", e);
                self.session.products = Vec::new();
                self.session.last_error = Some(e.to_string());
            }
        }
        self.session.stage = Stage::Recommending;
    }

    fn complete_render(&mut self, epoch: u64, result: Result<RenderResponse, ServiceError>) {
        if self.is_stale(epoch, Stage::TryingOn) {
            return;
        }
        self.session.loading = false;
        match result {
            Ok(response) if response.success => {
                self.session.notice = response.note.clone();
                self.session.preview = Some(TryOnPreview {
                    image: response.preview_image,
                    frame_name: self
                        .session
                        .selected
                        .as_ref()
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                    note: response.note,
                });
            }
            Ok(_) => {
                // Non-fatal: keep showing the un-rendered photo.
                info!("Try-on render declined; keeping original photo");
                self.session.notice =
                    Some("Try-on preview unavailable; showing your original photo.".to_string());
            }
            Err(e) => {
                warn!("Try-on render failed: {}", e);
                self.session.notice =
                    Some("Try-on preview unavailable; showing your original photo.".to_string());
            }
        }
    }

    fn is_stale(&self, epoch: u64, expected_stage: Stage) -> bool {
        if epoch != self.session.epoch || self.session.stage != expected_stage {
            debug!(
                "Discarding stale completion (epoch {} vs {}, stage {:?})",
                epoch, self.session.epoch, self.session.stage
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn product(id: &str, name: &str, day: u32) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            brand: "Lumen".to_string(),
            frame_shape: "round".to_string(),
            frame_size: "medium".to_string(),
            frame_color: "black".to_string(),
            material: "acetate".to_string(),
            price: 129.0,
            image_url: format!("https://catalog.example/{}.jpg", id),
            in_stock: true,
            description: "A frame.".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
        }
    }

    fn analysis_payload() -> Value {
        json!({
            "analysis": {
                "face_shape": "oval",
                "recommended_frame_shapes": ["round", "square"],
                "recommended_frame_sizes": [],
                "recommended_frame_colors": [],
                "reasoning": "Balanced proportions."
            }
        })
    }

    fn service_error() -> ServiceError {
        ServiceError::Upstream {
            service: "face analysis",
            message: "model overloaded".to_string(),
        }
    }

    // Walks a fresh controller to `Recommending` with the given products.
    fn to_recommending(products: Vec<Product>) -> PipelineController {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let command = controller
            .handle_intent(Intent::ConfirmPhoto(vec![0xAB; 8]))
            .expect("photo confirmation should dispatch analysis");
        let Command::Analyze { epoch, .. } = command else {
            panic!("expected an analyze command");
        };
        let search = controller
            .apply(Completion::Analysis {
                epoch,
                result: Ok(analysis_payload()),
            })
            .expect("analysis success should dispatch search");
        let Command::Search { epoch, .. } = search else {
            panic!("expected a search command");
        };
        controller.apply(Completion::Search {
            epoch,
            result: Ok(products),
        });
        assert_eq!(controller.session().stage, Stage::Recommending);
        controller
    }

    #[test]
    fn test_confirm_photo_dispatches_analysis() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let command = controller.handle_intent(Intent::ConfirmPhoto(vec![1, 2, 3]));
        assert!(matches!(command, Some(Command::Analyze { .. })));
        assert_eq!(controller.session().stage, Stage::Analyzing);
        assert!(controller.session().loading);
        assert!(controller.session().photo.is_some());
    }

    #[test]
    fn test_repeated_intent_is_noop_while_loading() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        assert!(controller
            .handle_intent(Intent::ConfirmPhoto(vec![1]))
            .is_some());
        let epoch = controller.session().epoch;
        assert!(controller
            .handle_intent(Intent::ConfirmPhoto(vec![2]))
            .is_none());
        assert_eq!(controller.session().epoch, epoch);
    }

    #[test]
    fn test_analysis_success_chains_into_search() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        let command = controller.apply(Completion::Analysis {
            epoch,
            result: Ok(analysis_payload()),
        });
        let Some(Command::Search { criteria, .. }) = command else {
            panic!("expected a search command");
        };
        assert_eq!(criteria.shapes, vec!["round", "square"]);
        assert!(criteria.sizes.is_empty());
        assert!(criteria.colors.is_empty());
        // Still loading: search is part of the same uninterrupted stretch.
        assert!(controller.session().loading);
        assert!(controller.session().analysis.is_some());
    }

    #[test]
    fn test_search_failure_degrades_to_empty_results() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        controller.apply(Completion::Analysis {
            epoch,
            result: Ok(analysis_payload()),
        });
        controller.apply(Completion::Search {
            epoch: controller.session().epoch,
            result: Err(ServiceError::Unreachable {
                service: "catalog store",
                message: "connection refused".to_string(),
            }),
        });
        let session = controller.session();
        assert_eq!(session.stage, Stage::Recommending);
        assert!(session.products.is_empty());
        assert!(!session.loading);
        assert!(session.last_error.is_some());
    }

    #[test]
    fn test_analysis_failure_returns_to_capture_with_photo_retained() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        controller.apply(Completion::Analysis {
            epoch,
            result: Err(service_error()),
        });
        let session = controller.session();
        assert_eq!(session.stage, Stage::Capturing);
        assert!(!session.loading);
        assert!(session.last_error.is_some());
        assert!(session.analysis.is_none());
        assert!(session.photo.is_some());

        // The retained photo supports a retry without recapturing.
        let retry = controller.handle_intent(Intent::RetryAnalysis);
        assert!(matches!(retry, Some(Command::Analyze { .. })));
    }

    #[test]
    fn test_force_retake_policy_discards_photo_on_failure() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::ForceRetake);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        controller.apply(Completion::Analysis {
            epoch,
            result: Err(service_error()),
        });
        assert!(controller.session().photo.is_none());
        assert!(controller.handle_intent(Intent::RetryAnalysis).is_none());
    }

    #[test]
    fn test_malformed_analysis_payload_is_a_stage_failure() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        let command = controller.apply(Completion::Analysis {
            epoch,
            result: Ok(json!({ "analysis": { "face_shape": "triangular" } })),
        });
        assert!(command.is_none());
        let session = controller.session();
        assert_eq!(session.stage, Stage::Capturing);
        assert!(session.analysis.is_none());
        assert!(session.last_error.is_some());
    }

    #[test]
    fn test_back_from_trying_on_retains_analysis_and_results() {
        let products = vec![
            product("p-1", "Aviator Classic", 1),
            product("p-2", "Round Tort", 2),
            product("p-3", "Square Slim", 3),
        ];
        let mut controller = to_recommending(products.clone());
        let command = controller.handle_intent(Intent::SelectProduct(products[1].clone()));
        assert!(matches!(command, Some(Command::Render { .. })));
        assert_eq!(controller.session().stage, Stage::TryingOn);

        controller.handle_intent(Intent::Back);
        let session = controller.session();
        assert_eq!(session.stage, Stage::Recommending);
        assert_eq!(session.products, products);
        assert!(session.analysis.is_some());
        assert!(session.selected.is_none());
        assert!(session.preview.is_none());
    }

    #[test]
    fn test_back_from_recommending_resets_session() {
        let mut controller = to_recommending(vec![product("p-1", "Aviator Classic", 1)]);
        controller.handle_intent(Intent::Back);
        let session = controller.session();
        assert_eq!(session.stage, Stage::Capturing);
        assert!(session.photo.is_none());
        assert!(session.analysis.is_none());
        assert!(session.products.is_empty());
        assert!(session.selected.is_none());
    }

    #[test]
    fn test_stale_render_completion_is_discarded() {
        let products = vec![
            product("p-1", "Aviator Classic", 1),
            product("p-2", "Round Tort", 2),
        ];
        let mut controller = to_recommending(products.clone());

        let Some(Command::Render { epoch: stale_epoch, .. }) =
            controller.handle_intent(Intent::SelectProduct(products[0].clone()))
        else {
            panic!("expected a render command");
        };
        controller.handle_intent(Intent::Back);
        let Some(Command::Render { epoch: fresh_epoch, .. }) =
            controller.handle_intent(Intent::SelectProduct(products[1].clone()))
        else {
            panic!("expected a render command");
        };
        assert_ne!(stale_epoch, fresh_epoch);

        // The first render finishes late, after the selection has moved on.
        controller.apply(Completion::Render {
            epoch: stale_epoch,
            result: Ok(RenderResponse {
                success: true,
                preview_image: Arc::from(vec![9u8; 4]),
                note: None,
            }),
        });
        let session = controller.session();
        assert_eq!(session.selected.as_ref().unwrap().id, "p-2");
        assert!(session.preview.is_none());
        assert!(session.loading);

        controller.apply(Completion::Render {
            epoch: fresh_epoch,
            result: Ok(RenderResponse {
                success: true,
                preview_image: Arc::from(vec![7u8; 4]),
                note: None,
            }),
        });
        let session = controller.session();
        let preview = session.preview.as_ref().unwrap();
        assert_eq!(preview.frame_name, "Round Tort");
        assert!(!session.loading);
    }

    #[test]
    fn test_render_failure_is_non_fatal() {
        let products = vec![product("p-1", "Aviator Classic", 1)];
        let mut controller = to_recommending(products.clone());
        let Some(Command::Render { epoch, .. }) =
            controller.handle_intent(Intent::SelectProduct(products[0].clone()))
        else {
            panic!("expected a render command");
        };
        controller.apply(Completion::Render {
            epoch,
            result: Ok(RenderResponse {
                success: false,
                preview_image: Arc::from(Vec::new()),
                note: None,
            }),
        });
        let session = controller.session();
        assert_eq!(session.stage, Stage::TryingOn);
        assert!(session.photo.is_some());
        assert!(session.preview.is_none());
        assert!(session.notice.is_some());
        assert!(session.last_error.is_none());
    }

    #[test]
    fn test_render_note_is_surfaced_as_informational() {
        let products = vec![product("p-1", "Aviator Classic", 1)];
        let mut controller = to_recommending(products.clone());
        let Some(Command::Render { epoch, .. }) =
            controller.handle_intent(Intent::SelectProduct(products[0].clone()))
        else {
            panic!("expected a render command");
        };
        controller.apply(Completion::Render {
            epoch,
            result: Ok(RenderResponse {
                success: true,
                preview_image: Arc::from(vec![1u8; 4]),
                note: Some("Simulated preview.".to_string()),
            }),
        });
        let session = controller.session();
        assert_eq!(session.notice.as_deref(), Some("Simulated preview."));
        assert!(session.last_error.is_none());
        assert!(session.preview.is_some());
    }

    #[test]
    fn test_selection_must_come_from_current_results() {
        let mut controller = to_recommending(vec![product("p-1", "Aviator Classic", 1)]);
        let command =
            controller.handle_intent(Intent::SelectProduct(product("p-9", "Unknown", 9)));
        assert!(command.is_none());
        assert_eq!(controller.session().stage, Stage::Recommending);
    }

    #[test]
    fn test_dismiss_error_clears_it() {
        let mut controller = PipelineController::new(AnalysisRetryPolicy::RetainPhoto);
        let Some(Command::Analyze { epoch, .. }) =
            controller.handle_intent(Intent::ConfirmPhoto(vec![1]))
        else {
            panic!("expected an analyze command");
        };
        controller.apply(Completion::Analysis {
            epoch,
            result: Err(service_error()),
        });
        assert!(controller.session().last_error.is_some());
        controller.handle_intent(Intent::DismissError);
        assert!(controller.session().last_error.is_none());
    }
}
