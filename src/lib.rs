pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;

pub use catalog::{CatalogStore, FrameSearch, InMemoryCatalog, SearchCriteria};
pub use config::{AnalysisRetryPolicy, Configuration};
pub use error::{AppError, ServiceError, ValidationError};
pub use pipeline::{Intent, PipelineController, PipelineHandle, PipelineRunner, Session, Stage};
