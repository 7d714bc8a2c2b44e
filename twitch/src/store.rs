//! Persistence for the cached app access token.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Somewhere the app access token survives between runs.
///
/// The store is read once when a [`crate::TwitchClient`] connects and written at most once, when
/// the stored token turned out to be invalid and a new one was issued.
pub trait CredentialStore {
    /// Returns the previously saved token, if any.
    fn load_token(&self) -> io::Result<Option<String>>;

    /// Saves `token`, replacing whatever was stored before.
    fn save_token(&self, token: &str) -> io::Result<()>;
}

/// Stores the token as a `KEY=VALUE` line in a dotenv file.
///
/// Other lines in the file are left untouched, so the same file can hold the client ID and
/// secret.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
    key: String,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the value stored under `key` in the file, if the file and key exist.
    pub fn get(&self, key: &str) -> io::Result<Option<String>> {
        let iter = match dotenvy::from_path_iter(&self.path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => return Ok(None),
            Err(e) => return Err(io::Error::other(e)),
        };
        for item in iter {
            let (k, v) = item.map_err(io::Error::other)?;
            if k == key {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// Sets `key` to `value`, replacing an existing assignment in place or appending a new one.
    pub fn upsert(&self, key: &str, value: &str) -> io::Result<()> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };

        let assignment = format!("{key}={value}");
        let mut replaced = false;
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| {
                if !replaced && assigns(line, key) {
                    replaced = true;
                    assignment.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();
        if !replaced {
            lines.push(assignment);
        }

        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(&self.path, contents)
    }
}

/// Whether `line` is a dotenv assignment to `key`, with or without a leading `export`.
fn assigns(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

impl CredentialStore for EnvFileStore {
    fn load_token(&self) -> io::Result<Option<String>> {
        if let Some(token) = self.get(&self.key)? {
            return Ok(Some(token));
        }
        // the token may also have been provided directly in the environment
        Ok(std::env::var(&self.key).ok())
    }

    fn save_token(&self, token: &str) -> io::Result<()> {
        self.upsert(&self.key, token)
    }
}

/// Keeps the token in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryStore {
    fn load_token(&self) -> io::Result<Option<String>> {
        Ok(self.token())
    }

    fn save_token(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn upsert_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "CLIENT_ID=abc\nACCESS_TOKEN=old\n# comment\nCLIENT_SECRET=shh\n",
        )
        .unwrap();

        let store = EnvFileStore::new(&path, "ACCESS_TOKEN");
        store.save_token("new").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "CLIENT_ID=abc\nACCESS_TOKEN=new\n# comment\nCLIENT_SECRET=shh\n"
        );
        assert_eq!(store.get("ACCESS_TOKEN").unwrap().as_deref(), Some("new"));
        assert_eq!(store.get("CLIENT_ID").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn upsert_appends_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "CLIENT_ID=abc").unwrap();

        let store = EnvFileStore::new(&path, "ACCESS_TOKEN");
        store.save_token("fresh").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "CLIENT_ID=abc\nACCESS_TOKEN=fresh\n"
        );
    }

    #[test]
    fn upsert_handles_export_and_similar_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "ACCESS_TOKEN_OLD=x\nexport ACCESS_TOKEN = 'y'\n").unwrap();

        let store = EnvFileStore::new(&path, "ACCESS_TOKEN");
        store.upsert("ACCESS_TOKEN", "z").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ACCESS_TOKEN_OLD=x\nACCESS_TOKEN=z\n"
        );
    }

    #[test]
    fn missing_file_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let store = EnvFileStore::new(&path, "SCOUT_TEST_TOKEN_UNSET");
        assert_eq!(store.get("SCOUT_TEST_TOKEN_UNSET").unwrap(), None);
        assert_eq!(store.load_token().unwrap(), None);

        store.save_token("abc").unwrap();
        assert_eq!(store.load_token().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::default();
        assert_eq!(store.load_token().unwrap(), None);
        store.save_token("t").unwrap();
        assert_eq!(store.token().as_deref(), Some("t"));
    }
}
