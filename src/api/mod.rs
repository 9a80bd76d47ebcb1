//! Applications the handler can bind to.

pub mod diagnostic;
pub mod helpers;
pub mod routes;

pub use routes::AppState;
