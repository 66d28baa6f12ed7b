pub mod errors;
pub mod filters;
pub mod journal;
pub mod models;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod submit;

pub use errors::*;
pub use filters::*;
pub use journal::*;
pub use models::*;
pub use scheduler::*;
pub use stats::*;
pub use store::*;
pub use submit::*;
