pub mod contracts;
pub mod controller;
pub mod runner;
pub mod services;
pub mod types;

pub use controller::{Command, Completion, Intent, PipelineController};
pub use runner::{PipelineHandle, PipelineRunner};
pub use types::{Analysis, FaceShape, Product, Session, Stage, TryOnPreview};
