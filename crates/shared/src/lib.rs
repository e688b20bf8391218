pub mod config;
pub mod logging;
pub mod retry;

pub use config::*;
pub use logging::*;
pub use retry::*;
