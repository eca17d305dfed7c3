pub mod config;
pub mod error;
pub mod logging;

pub use config::{ContainerConfig, LogFormat, LoggingConfig, SpritzConfig};
pub use error::{SpritzError, SpritzResult};
pub use logging::init_logging;
