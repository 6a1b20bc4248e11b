pub mod env;
pub mod error;
pub mod model;
pub mod proxy;
pub mod resolve;
pub mod secret;

pub use env::Environment;
pub use error::ConfigError;
pub use model::{
    CacheBackend, CacheRedisParams, Config, S3AttachmentsConfig, SessionBackend,
    SessionRedisParams, DEFAULT_TRUSTED_PROXIES,
};
pub use proxy::TrustedProxies;
pub use resolve::{Resolver, Variant};
