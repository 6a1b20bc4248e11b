use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::secret;

/// The resolved, immutable runtime configuration.
///
/// Built once at startup (see [`crate::resolve::Resolver`]) and handed to
/// every collaborator explicitly; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Key used to sign sessions and other tokens. Generated randomly when
    /// `CTFD_SECRET_KEY` is unset; [`Config::load`] persists the generated
    /// value so restarts and sibling workers agree on it.
    pub secret_key: String,
    /// Connection string handed to the database layer.
    pub database_uri: String,
    pub track_modifications: bool,
    /// Which store backs user sessions.
    pub session: SessionBackend,
    /// Directory used by the filesystem session store.
    pub session_file_dir: PathBuf,
    pub cookie_http_only: bool,
    pub session_lifetime_seconds: u64,
    /// Informational hostname; no logic keys off it.
    pub host: String,
    /// Default sender address for outgoing mail.
    pub mail_from_addr: String,
    /// Where uploaded files land when stored locally.
    pub upload_folder: PathBuf,
    /// Object-storage credentials for attachments. `None` means local
    /// uploads only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_attachments: Option<S3AttachmentsConfig>,
    pub templates_auto_reload: bool,
    /// Ordered regex patterns matched against proxy chains to find the real
    /// client address.
    pub trusted_proxies: Vec<String>,
    /// Which store backs the application cache.
    pub cache: CacheBackend,
    pub debug: bool,
    pub testing: bool,
    pub preserve_context_on_exception: bool,
}

impl Config {
    /// Create the directories the running service expects: the upload
    /// folder, and the session directory when sessions live on disk.
    pub fn ensure_runtime_dirs(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.upload_folder)?;
        if let SessionBackend::Filesystem = self.session {
            fs::create_dir_all(&self.session_file_dir)?;
        }
        Ok(())
    }

    /// Path of the persisted secret key file for an instance rooted at
    /// `base_dir`.
    pub fn secret_key_path(base_dir: &Path) -> PathBuf {
        base_dir.join(secret::SECRET_KEY_FILE)
    }
}

/// Session store selection, driven by `CTFD_SESSION_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionBackend {
    Filesystem,
    Redis(SessionRedisParams),
}

impl SessionBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Redis(_) => "redis",
        }
    }

    pub fn is_redis(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::Filesystem
    }
}

/// Connection parameters for a redis session store. Values pass through to
/// the redis client verbatim; a missing variable stays `None` and the client
/// applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionRedisParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
}

/// Cache store selection, driven by `CTFD_CACHE_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheBackend {
    Simple,
    Redis(CacheRedisParams),
}

impl CacheBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Redis(_) => "redis",
        }
    }

    pub fn is_redis(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

impl Default for CacheBackend {
    fn default() -> Self {
        Self::Simple
    }
}

/// Connection parameters for a redis cache, passed through verbatim like
/// [`SessionRedisParams`]. Cache keys are namespaced under `key_prefix` so
/// several instances can share one server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheRedisParams {
    #[serde(default = "default_cache_key_prefix")]
    pub key_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
}

impl Default for CacheRedisParams {
    fn default() -> Self {
        Self {
            key_prefix: default_cache_key_prefix(),
            url: None,
            user: None,
            password: None,
            host: None,
            port: None,
            db: None,
        }
    }
}

/// Credentials for storing attachments in S3. Any unset field defers to an
/// IAM role or a credentials file on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct S3AttachmentsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

/// Loopback plus RFC1918/ULA ranges. Operators running a competition on a
/// trusted LAN may want to trim this list.
pub const DEFAULT_TRUSTED_PROXIES: [&str; 6] = [
    r"^127\.0\.0\.1$",
    r"^::1$",
    r"^fc00:",
    r"^10\.",
    r"^172\.(1[6-9]|2[0-9]|3[0-1])\.",
    r"^192\.168\.",
];

fn default_cache_key_prefix() -> String {
    "cache-".into()
}

#[cfg(test)]
mod tests {
    use super::{CacheBackend, CacheRedisParams, SessionBackend, SessionRedisParams};
    use crate::resolve::{Resolver, Variant};
    use crate::Environment;

    #[test]
    fn backend_kinds_match_their_flag_values() {
        assert_eq!(SessionBackend::Filesystem.kind(), "filesystem");
        assert_eq!(
            SessionBackend::Redis(SessionRedisParams::default()).kind(),
            "redis"
        );
        assert_eq!(CacheBackend::Simple.kind(), "simple");
        assert_eq!(
            CacheBackend::Redis(CacheRedisParams::default()).kind(),
            "redis"
        );
    }

    #[test]
    fn cache_params_default_to_namespaced_prefix() {
        let params = CacheRedisParams::default();
        assert_eq!(params.key_prefix, "cache-");
        assert!(params.url.is_none());
    }

    #[test]
    fn backends_serialize_with_kind_tag() {
        let backend = SessionBackend::Redis(SessionRedisParams {
            host: Some("10.0.0.5".into()),
            ..Default::default()
        });
        let value = serde_json::to_value(&backend).expect("serialize backend");
        assert_eq!(value["kind"], "redis");
        assert_eq!(value["host"], "10.0.0.5");

        let value = serde_json::to_value(SessionBackend::Filesystem).expect("serialize backend");
        assert_eq!(value["kind"], "filesystem");
        assert!(value.get("host").is_none());
    }

    #[test]
    fn runtime_dirs_are_created_for_filesystem_sessions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = Resolver::new(Environment::empty(), temp.path()).resolve(Variant::Default);
        config.upload_folder = temp.path().join("uploads");
        config.session_file_dir = temp.path().join("sessions");

        config.ensure_runtime_dirs().expect("create dirs");
        assert!(config.upload_folder.is_dir());
        assert!(config.session_file_dir.is_dir());
    }

    #[test]
    fn session_dir_is_skipped_for_redis_sessions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = Resolver::new(Environment::empty(), temp.path()).resolve(Variant::Default);
        config.upload_folder = temp.path().join("uploads");
        config.session_file_dir = temp.path().join("sessions");
        config.session = SessionBackend::Redis(SessionRedisParams::default());

        config.ensure_runtime_dirs().expect("create dirs");
        assert!(config.upload_folder.is_dir());
        assert!(!config.session_file_dir.exists());
    }
}
