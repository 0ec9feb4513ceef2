pub mod search;
pub mod store;

pub use search::{FrameSearch, SearchCriteria};
pub use store::{CatalogStore, InMemoryCatalog};
