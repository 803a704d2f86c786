//! Durable storage backend
//!
//! Log format is one operation per line, whitespace separated:
//!
//! ```text
//! PUT <key> <value>
//! DEL <key>
//! ```
//!
//! Replay applies records in file order. Lines that do not parse as one of
//! the two operations are skipped.
//!
//! A record reaches the file in a single write. If that write fails the file
//! is cut back to its previous length, so a mutation that was reported failed
//! never shows up on a later replay.

use crate::error::ClusterError;
use crate::storage::Storage;
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Store backed by an append-only operation log
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    data: HashMap<String, String>,
    log: File,
    /// Bytes of the log known to hold complete records
    committed_len: u64,
}

impl LogStore {
    /// Replay the log at `path` (if any) and open it for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = replay(&path)?;
        let log = OpenOptions::new().create(true).append(true).open(&path)?;
        let committed_len = log.metadata()?.len();

        info!(path = %path.display(), keys = data.len(), "opened log store");
        Ok(Self {
            path,
            data,
            log,
            committed_len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: Record<'_>) -> Result<()> {
        let line = format!("{}\n", record);
        let written = self
            .log
            .write_all(line.as_bytes())
            .and_then(|()| self.log.flush());

        if let Err(e) = written {
            // drop any partial record so it cannot be replayed later
            if let Err(truncate) = self.log.set_len(self.committed_len) {
                warn!(path = %self.path.display(), error = %truncate, "could not truncate log");
            }
            warn!(path = %self.path.display(), error = %e, "append failed");
            return Err(e.into());
        }
        self.committed_len += line.len() as u64;
        Ok(())
    }
}

impl Storage for LogStore {
    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        check_token(key)?;
        check_token(value)?;
        self.append(Record::Put(key, value))?;
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        check_token(key)?;
        self.append(Record::Del(key))?;
        self.data.remove(key);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

fn check_token(token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(ClusterError::InvalidToken(token.to_string()));
    }
    Ok(())
}

fn replay(path: &Path) -> Result<HashMap<String, String>> {
    let mut data = HashMap::new();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(data),
        Err(e) => return Err(e.into()),
    };

    let mut skipped = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some("PUT"), Some(key), Some(value)) => {
                data.insert(key.to_string(), value.to_string());
            }
            (Some("DEL"), Some(key), _) => {
                data.remove(key);
            }
            (None, _, _) => {}
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "ignored unrecognized log lines");
    }
    Ok(data)
}

enum Record<'a> {
    Put(&'a str, &'a str),
    Del(&'a str),
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Put(key, value) => write!(f, "PUT {} {}", key, value),
            Record::Del(key) => write!(f, "DEL {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LogStore::open(dir.path().join("Node0.log")).unwrap();

        store.put("a", "1").unwrap();
        assert_eq!(store.get("a"), Some("1".to_string()));

        store.delete("a").unwrap();
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_every_mutation_appends_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node0.log");
        let mut store = LogStore::open(&path).unwrap();

        store.put("a", "1").unwrap();
        store.put("b", "2").unwrap();
        store.delete("a").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "PUT a 1\nPUT b 2\nDEL a\n");
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node1.log");
        {
            let mut store = LogStore::open(&path).unwrap();
            store.put("a", "1").unwrap();
            store.put("a", "2").unwrap();
            store.put("b", "3").unwrap();
            store.delete("b").unwrap();
        }

        let store = LogStore::open(&path).unwrap();
        assert_eq!(store.get("a"), Some("2".to_string()));
        assert_eq!(store.get("b"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replay_ignores_unrecognized_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node2.log");
        fs::write(&path, "PUT a 1\nGARBAGE x y\nPUT b\n\nDEL zz\nPUT  c   3 \n").unwrap();

        let store = LogStore::open(&path).unwrap();
        assert_eq!(store.get("a"), Some("1".to_string()));
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("c"), Some("3".to_string()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reopen_appends_after_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node0.log");
        LogStore::open(&path).unwrap().put("a", "1").unwrap();
        LogStore::open(&path).unwrap().put("b", "2").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "PUT a 1\nPUT b 2\n");
    }

    #[test]
    fn test_failed_append_never_becomes_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node0.log");
        let mut store = LogStore::open(&path).unwrap();
        store.put("a", "1").unwrap();

        // a read-only handle makes the next write fail
        let writable = std::mem::replace(&mut store.log, File::open(&path).unwrap());
        assert!(matches!(store.put("b", "2"), Err(ClusterError::Storage(_))));
        assert_eq!(store.get("b"), None);

        store.log = writable;
        store.put("c", "3").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "PUT a 1\nPUT c 3\n");

        let reopened = LogStore::open(&path).unwrap();
        assert_eq!(reopened.get("b"), None);
        assert_eq!(reopened.get("c"), Some("3".to_string()));
    }

    #[test]
    fn test_rejects_tokens_with_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node0.log");
        let mut store = LogStore::open(&path).unwrap();

        assert!(matches!(
            store.put("a", "two words"),
            Err(ClusterError::InvalidToken(_))
        ));
        assert!(store.put("", "v").is_err());
        assert_eq!(store.get("a"), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
