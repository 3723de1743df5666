pub mod config;
pub mod error;
pub mod fixtures;
pub mod folders;
pub mod h2h;
pub mod loader;
pub mod metrics;
pub mod panels;
pub mod players;
pub mod remote;
pub mod selector;
pub mod session;
pub mod table;
pub mod types;

pub use error::{PipelineError, RemoteError, Result};
pub use session::{Session, ViewState};
