use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{MercuryError, Result};

/// Mercury API token. Sent as the basic-auth username with an empty password.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(MercuryError::Credentials("API key is empty".to_string()));
        }
        Ok(Self(key))
    }

    /// Read the key from a plain-text file. Surrounding whitespace (usually a
    /// trailing newline left by an editor) is stripped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            MercuryError::Credentials(format!("cannot read key file {}: {e}", path.display()))
        })?;
        Self::new(contents).map_err(|_| {
            MercuryError::Credentials(format!("key file {} is empty", path.display()))
        })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_key_file_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  secret-token-123  ").unwrap();

        let key = ApiKey::from_file(file.path()).unwrap();
        assert_eq!(key.expose(), "secret-token-123");
    }

    #[test]
    fn test_empty_key_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        let err = ApiKey::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MercuryError::Credentials(_)));
    }

    #[test]
    fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ApiKey::from_file(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("cannot read key file"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = ApiKey::new("abc").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }
}
