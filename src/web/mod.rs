pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;
pub mod templates;

pub use state::AppState;
