use regex::RegexSet;

use crate::error::ConfigError;

/// Compiled trusted-proxy patterns, kept in the order they were supplied.
#[derive(Debug, Clone)]
pub struct TrustedProxies {
    set: RegexSet,
}

impl TrustedProxies {
    /// Compile a pattern list. Fails if any entry is not a valid regex.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = RegexSet::new(patterns)?;
        Ok(Self { set })
    }

    /// Whether `addr` matches any trusted pattern.
    pub fn is_trusted(&self, addr: &str) -> bool {
        self.set.is_match(addr)
    }

    /// Pick the client address out of a proxy chain.
    ///
    /// `access_route` is the forwarded-for chain with the nearest hop last;
    /// `remote_addr` is the socket peer. Walking from the socket peer
    /// backwards, the first address not matching a trusted pattern is the
    /// client. When every hop is trusted, the socket peer is returned.
    pub fn client_ip<'a>(&self, access_route: &[&'a str], remote_addr: &'a str) -> &'a str {
        for addr in std::iter::once(remote_addr).chain(access_route.iter().copied().rev()) {
            if !self.is_trusted(addr) {
                return addr;
            }
        }
        remote_addr
    }
}
