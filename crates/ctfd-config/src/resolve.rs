use std::path::{Path, PathBuf};

use crate::env::{vars, Environment};
use crate::error::ConfigError;
use crate::model::{
    CacheBackend, CacheRedisParams, Config, S3AttachmentsConfig, SessionBackend,
    SessionRedisParams, DEFAULT_TRUSTED_PROXIES,
};
use crate::secret;

/// Fixed session lifetime: 7 days in seconds.
pub const DEFAULT_SESSION_LIFETIME_SECONDS: u64 = 604_800;

/// Which profile to resolve: the standard one, or the testing profile that
/// forces an in-memory database and the debug flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Testing,
}

impl Default for Variant {
    fn default() -> Self {
        Self::Default
    }
}

/// Turns an environment snapshot plus a base directory into a [`Config`].
///
/// Resolution is total: every lookup falls back to a documented default and
/// nothing here touches the filesystem. [`Config::load`] is the one entry
/// point that does I/O, for the persisted secret key.
#[derive(Debug, Clone)]
pub struct Resolver {
    env: Environment,
    base_dir: PathBuf,
}

impl Resolver {
    pub fn new(env: Environment, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            env,
            base_dir: base_dir.into(),
        }
    }

    /// Resolver over the current process environment.
    pub fn from_process(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(Environment::from_process(), base_dir)
    }

    pub fn resolve(&self, variant: Variant) -> Config {
        let env = &self.env;

        let secret_key = env
            .get(vars::SECRET_KEY)
            .map(str::to_string)
            .unwrap_or_else(secret::generate_key);
        let database_uri = env
            .get(vars::DATABASE_URL)
            .map(str::to_string)
            .unwrap_or_else(|| default_database_uri(&self.base_dir));

        let mut config = Config {
            secret_key,
            database_uri,
            track_modifications: false,
            session: self.resolve_session(),
            session_file_dir: default_session_file_dir(),
            cookie_http_only: true,
            session_lifetime_seconds: DEFAULT_SESSION_LIFETIME_SECONDS,
            host: env.get(vars::HOST).map(str::to_string).unwrap_or_default(),
            mail_from_addr: env
                .get(vars::MAILFROM_ADDR)
                .map(str::to_string)
                .unwrap_or_default(),
            upload_folder: self.base_dir.join("uploads"),
            s3_attachments: self.resolve_s3(),
            templates_auto_reload: true,
            trusted_proxies: DEFAULT_TRUSTED_PROXIES
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
            cache: self.resolve_cache(),
            debug: false,
            testing: false,
            preserve_context_on_exception: false,
        };

        if let Variant::Testing = variant {
            config.preserve_context_on_exception = false;
            config.testing = true;
            config.debug = true;
            config.database_uri = "sqlite://".into();
        }

        config
    }

    fn resolve_session(&self) -> SessionBackend {
        match self.env.get(vars::SESSION_TYPE).unwrap_or("filesystem") {
            "filesystem" => SessionBackend::Filesystem,
            // The session store shares the cache server's connection
            // variables.
            "redis" => SessionBackend::Redis(SessionRedisParams {
                host: self.env.get(vars::CACHE_HOST).map(str::to_string),
                port: self.env.get(vars::CACHE_PORT).map(str::to_string),
                password: self.env.get(vars::CACHE_PASSWORD).map(str::to_string),
                db: self.env.get(vars::CACHE_DB).map(str::to_string),
            }),
            other => {
                tracing::warn!(
                    "Ignoring invalid CTFD_SESSION_TYPE value '{}'; expected filesystem or redis",
                    other
                );
                SessionBackend::Filesystem
            }
        }
    }

    fn resolve_cache(&self) -> CacheBackend {
        match self.env.get(vars::CACHE_TYPE).unwrap_or("simple") {
            "simple" => CacheBackend::Simple,
            "redis" => CacheBackend::Redis(CacheRedisParams {
                url: self.env.get(vars::CACHE_URL).map(str::to_string),
                user: self.env.get(vars::CACHE_USER).map(str::to_string),
                password: self.env.get(vars::CACHE_PASSWORD).map(str::to_string),
                host: self.env.get(vars::CACHE_HOST).map(str::to_string),
                port: self.env.get(vars::CACHE_PORT).map(str::to_string),
                db: self.env.get(vars::CACHE_DB).map(str::to_string),
                ..CacheRedisParams::default()
            }),
            other => {
                tracing::warn!(
                    "Ignoring invalid CTFD_CACHE_TYPE value '{}'; expected simple or redis",
                    other
                );
                CacheBackend::Simple
            }
        }
    }

    fn resolve_s3(&self) -> Option<S3AttachmentsConfig> {
        let access_key_id = self.env.get(vars::S3_ACCESS_KEY_ID).map(str::to_string);
        let secret_access_key = self.env.get(vars::S3_SECRET_ACCESS_KEY).map(str::to_string);
        let bucket = self.env.get(vars::S3_BUCKET).map(str::to_string);
        if access_key_id.is_none() && secret_access_key.is_none() && bucket.is_none() {
            return None;
        }
        Some(S3AttachmentsConfig {
            access_key_id,
            secret_access_key,
            bucket,
        })
    }
}

impl Config {
    /// Resolve the standard profile from the process environment, reading
    /// or creating the persisted secret key under `base_dir`.
    ///
    /// This is the startup path. `CTFD_SECRET_KEY` still wins when set; the
    /// key file only backs the generated fallback.
    pub fn load(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let env = Environment::from_process();
        let external_key = env.get(vars::SECRET_KEY).is_some();

        let mut config = Resolver::new(env, base_dir.clone()).resolve(Variant::Default);
        if !external_key {
            config.secret_key = secret::load_or_generate(&Config::secret_key_path(&base_dir))?;
        }
        Ok(config)
    }
}

fn default_database_uri(base_dir: &Path) -> String {
    format!("sqlite:///{}/ctfd.db", base_dir.display())
}

fn default_session_file_dir() -> PathBuf {
    std::env::temp_dir().join("ctfd_session")
}

#[cfg(test)]
mod tests {
    use super::{Resolver, Variant};
    use crate::env::{vars, Environment};
    use crate::model::{CacheBackend, SessionBackend};
    use std::path::Path;

    #[test]
    fn database_uri_defaults_under_the_base_dir() {
        let resolver = Resolver::new(Environment::empty(), Path::new("/srv/ctfd"));
        let config = resolver.resolve(Variant::Default);
        assert_eq!(config.database_uri, "sqlite:////srv/ctfd/ctfd.db");
    }

    #[test]
    fn unrecognized_backend_kinds_fall_back_to_defaults() {
        let env = Environment::from_pairs([
            (vars::SESSION_TYPE, "memcached"),
            (vars::CACHE_TYPE, "memcached"),
        ]);
        let config = Resolver::new(env, "/srv/ctfd").resolve(Variant::Default);
        assert_eq!(config.session, SessionBackend::Filesystem);
        assert_eq!(config.cache, CacheBackend::Simple);
    }
}
