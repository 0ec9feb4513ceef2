pub mod face_analysis;
pub mod try_on;

pub use face_analysis::FaceAnalyzer;
pub use try_on::{RenderRequest, RenderResponse, SimulatedTryOn, TryOnRenderer};
