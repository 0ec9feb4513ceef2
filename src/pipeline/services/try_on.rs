use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub user_image: Arc<[u8]>,
    pub frame_image_url: String,
    pub frame_name: String,
}

#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub success: bool,
    pub preview_image: Arc<[u8]>,
    // Present when the render is degraded or simulated; surfaced to the user
    // as informational text, never as an error.
    pub note: Option<String>,
}

#[async_trait]
pub trait TryOnRenderer: Send + Sync {
    async fn render(&self, request: RenderRequest) -> Result<RenderResponse, ServiceError>;
}

// Deterministic passthrough renderer: returns the user's photo unchanged
// with a disclosure note. Stands in until a real compositing backend exists.
pub struct SimulatedTryOn;

#[async_trait]
impl TryOnRenderer for SimulatedTryOn {
    async fn render(&self, request: RenderRequest) -> Result<RenderResponse, ServiceError> {
        tracing::debug!("Simulating try-on render for frame {}", request.frame_name);
        Ok(RenderResponse {
            success: true,
            preview_image: request.user_image,
            note: Some(format!(
                "Preview of {} is simulated; no real compositing was performed.",
                request.frame_name
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_render_is_a_disclosed_passthrough() {
        let photo: Arc<[u8]> = Arc::from(vec![1u8, 2, 3]);
        let response = SimulatedTryOn
            .render(RenderRequest {
                user_image: photo.clone(),
                frame_image_url: "https://catalog.example/p-1.jpg".to_string(),
                frame_name: "Aviator Classic".to_string(),
            })
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.preview_image, photo);
        assert!(response.note.is_some());
    }
}
