pub mod cache;
pub mod error;
pub mod options;
pub mod tolerance;

pub use cache::{CacheStats, ContentCache, ContentHasher, ContentKey};
pub use error::{KernelError, Result};
pub use options::{OnFailure, SolverOptions};
pub use tolerance::Tolerance;
