use std::collections::HashMap;

/// Names of every environment variable the resolver recognizes.
pub mod vars {
    pub const SECRET_KEY: &str = "CTFD_SECRET_KEY";
    pub const DATABASE_URL: &str = "CTFD_DATABASE_URL";
    pub const SESSION_TYPE: &str = "CTFD_SESSION_TYPE";
    pub const HOST: &str = "CTFD_HOST";
    pub const MAILFROM_ADDR: &str = "CTFD_MAILFROM_ADDR";
    pub const S3_ACCESS_KEY_ID: &str = "CTFD_S3_ATTACHMENTS_ACCESS_KEY_ID";
    pub const S3_SECRET_ACCESS_KEY: &str = "CTFD_S3_ATTACHMENTS_SECRET_ACCESS_KEY";
    pub const S3_BUCKET: &str = "CTFD_S3_ATTACHMENTS_BUCKET";
    pub const CACHE_TYPE: &str = "CTFD_CACHE_TYPE";
    pub const CACHE_URL: &str = "CTFD_CACHE_URL";
    pub const CACHE_USER: &str = "CTFD_CACHE_USER";
    pub const CACHE_PASSWORD: &str = "CTFD_CACHE_PASSWORD";
    pub const CACHE_HOST: &str = "CTFD_CACHE_HOST";
    pub const CACHE_PORT: &str = "CTFD_CACHE_PORT";
    pub const CACHE_DB: &str = "CTFD_CACHE_DB";

    pub const ALL: [&str; 15] = [
        SECRET_KEY,
        DATABASE_URL,
        SESSION_TYPE,
        HOST,
        MAILFROM_ADDR,
        S3_ACCESS_KEY_ID,
        S3_SECRET_ACCESS_KEY,
        S3_BUCKET,
        CACHE_TYPE,
        CACHE_URL,
        CACHE_USER,
        CACHE_PASSWORD,
        CACHE_HOST,
        CACHE_PORT,
        CACHE_DB,
    ];
}

/// Prefix shared by every recognized variable.
pub const VAR_PREFIX: &str = "CTFD_";

/// A snapshot of environment variables, taken once and handed to the
/// resolver so resolution stays a function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, String>,
}

impl Environment {
    /// An environment with nothing set; every lookup falls back to its
    /// default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the process environment. Variables with non-unicode names
    /// or values are skipped rather than failing the whole snapshot.
    pub fn from_process() -> Self {
        let values = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { values }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value of `name` exactly as set, or `None` when absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names carrying the `CTFD_` prefix that the resolver does not
    /// recognize. Useful for flagging probable typos in deployment
    /// manifests.
    pub fn unrecognized(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .values
            .keys()
            .filter(|name| name.starts_with(VAR_PREFIX))
            .filter(|name| !vars::ALL.contains(&name.as_str()))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::{vars, Environment};

    #[test]
    fn values_come_back_verbatim() {
        let env = Environment::from_pairs([(vars::HOST, "  ctf.example.com ")]);
        assert_eq!(env.get(vars::HOST), Some("  ctf.example.com "));
        assert_eq!(env.get(vars::MAILFROM_ADDR), None);
    }

    #[test]
    fn set_overwrites_earlier_values() {
        let mut env = Environment::empty();
        env.set(vars::CACHE_TYPE, "simple");
        env.set(vars::CACHE_TYPE, "redis");
        assert_eq!(env.get(vars::CACHE_TYPE), Some("redis"));
    }

    #[test]
    fn unrecognized_reports_prefixed_typos_only() {
        let env = Environment::from_pairs([
            ("CTFD_CACHE_TIPE", "redis"),
            ("CTFD_SECRET_KEY", "k"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(env.unrecognized(), vec!["CTFD_CACHE_TIPE"]);
    }
}
