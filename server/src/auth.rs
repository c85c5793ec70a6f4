//! Flat password-file authentication (spec §6, §9).
//!
//! Checking is case-sensitive and the raw username string becomes the Avatar
//! key directly — the source's behavior, preserved per the design note in
//! §9 so an avatar's identity is never split across two keys.

use std::collections::HashMap;
use std::io;
use std::path::Path;

#[derive(Debug, Default)]
pub struct PasswordFile {
    credentials: HashMap<String, String>,
}

impl PasswordFile {
    /// Loads `username:password` pairs, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };

        let mut credentials = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((username, password)) = line.split_once(':') {
                credentials.insert(username.to_string(), password.to_string());
            }
        }
        Ok(PasswordFile { credentials })
    }

    /// Case-sensitive credential check.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.credentials.get(username).is_some_and(|expected| expected == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticates_exact_match_only() {
        let mut credentials = HashMap::new();
        credentials.insert("alice".to_string(), "secret".to_string());
        let store = PasswordFile { credentials };

        assert!(store.authenticate("alice", "secret"));
        assert!(!store.authenticate("Alice", "secret"));
        assert!(!store.authenticate("alice", "Secret"));
        assert!(!store.authenticate("bob", "secret"));
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let store = PasswordFile::load(Path::new("/nonexistent/path/to/passwords")).unwrap();
        assert!(!store.authenticate("alice", "secret"));
    }
}
