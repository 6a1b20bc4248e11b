use rand::Rng;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Name of the key file kept at the root of the instance data directory.
pub const SECRET_KEY_FILE: &str = ".ctfd_secret_key";

/// Size of a generated key in raw bytes; the stored form is hex, twice as
/// long.
pub const SECRET_KEY_BYTES: usize = 64;

/// Generate a fresh signing key: 64 random bytes, hex encoded.
pub fn generate_key() -> String {
    generate_random_hex(SECRET_KEY_BYTES * 2)
}

/// Read the persisted key, or `None` when the file is missing or blank.
pub fn load(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let key = contents.trim();
    if key.is_empty() {
        Ok(None)
    } else {
        Ok(Some(key.to_string()))
    }
}

/// Read the persisted key, generating and writing one first if needed.
///
/// Restarts and sibling worker processes share the key through this file:
/// the first process to start writes it, everyone else reads it back.
pub fn load_or_generate(path: &Path) -> Result<String, ConfigError> {
    if let Some(key) = load(path)? {
        return Ok(key);
    }
    tracing::info!(
        "Secret key file not found at '{}', generating one",
        path.display()
    );
    let key = generate_key();
    fs::write(path, &key)?;
    let _ = harden_secret_file_permissions(path);
    Ok(key)
}

/// Whether an operator-supplied key looks like a placeholder that was never
/// replaced.
pub fn looks_like_placeholder(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return true;
    }
    normalized.contains("change_me")
        || normalized.contains("replace_me")
        || normalized.contains("replace_with")
        || normalized.starts_with("example")
        || normalized == "devkey"
        || normalized == "devsecret"
        || normalized == "secret"
}

/// Generate a cryptographically random hex string of the given length.
fn generate_random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..16u8);
            char::from(if idx < 10 {
                b'0' + idx
            } else {
                b'a' + idx - 10
            })
        })
        .collect()
}

fn harden_secret_file_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(windows)]
    {
        use std::ffi::OsStr;
        use std::process::Command;

        let principal_output = Command::new("whoami").output()?;
        if principal_output.status.success() {
            let principal = String::from_utf8_lossy(&principal_output.stdout)
                .trim()
                .to_string();
            if !principal.is_empty() {
                let _ = Command::new("icacls")
                    .args([path.as_os_str(), OsStr::new("/inheritance:r")])
                    .status();
                let grant = format!("{principal}:F");
                let _ = Command::new("icacls")
                    .args([path.as_os_str(), OsStr::new("/grant:r"), OsStr::new(&grant)])
                    .status();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{generate_key, load, load_or_generate, looks_like_placeholder};

    #[test]
    fn generated_keys_are_lowercase_hex() {
        let key = generate_key();
        assert_eq!(key.len(), 128);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_key_is_persisted_and_read_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(super::SECRET_KEY_FILE);

        assert_eq!(load(&path).expect("load"), None);
        let first = load_or_generate(&path).expect("generate");
        let second = load_or_generate(&path).expect("reload");
        assert_eq!(first, second);
        assert_eq!(load(&path).expect("load"), Some(first));
    }

    #[test]
    fn existing_key_is_returned_trimmed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(super::SECRET_KEY_FILE);
        std::fs::write(&path, "deadbeef\n").expect("write key");

        assert_eq!(load_or_generate(&path).expect("load"), "deadbeef");
    }

    #[test]
    fn blank_key_file_is_regenerated() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(super::SECRET_KEY_FILE);
        std::fs::write(&path, "  \n").expect("write key");

        let key = load_or_generate(&path).expect("generate");
        assert_eq!(key.len(), 128);
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(super::SECRET_KEY_FILE);
        load_or_generate(&path).expect("generate");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn placeholder_secrets_are_flagged() {
        assert!(looks_like_placeholder(""));
        assert!(looks_like_placeholder("CHANGE_ME_NOW"));
        assert!(looks_like_placeholder("secret"));
        assert!(!looks_like_placeholder(&generate_key()));
    }
}
