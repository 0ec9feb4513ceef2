pub mod analysis;
pub mod product;
pub mod session;

pub use analysis::{Analysis, FaceShape};
pub use product::Product;
pub use session::{Session, Stage, TryOnPreview};
