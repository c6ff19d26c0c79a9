pub mod action;
pub mod context;
pub mod error;
pub mod params;

pub use action::Action;
pub use context::Context;
pub use error::{BraidError, Result};
pub use params::Params;
