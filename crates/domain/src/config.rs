pub mod cache;
pub mod errors;
pub mod logging;
pub mod resolver;
pub mod root;

pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use resolver::ResolverConfig;
pub use root::Config;
