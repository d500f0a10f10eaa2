//! Input history: append-only stores with newest-first loading.
//!
//! A history is consumed two ways: interactive recall wants entries
//! newest-first and wants them as soon as possible (hence the threaded
//! variant that streams while a slow backing store loads), while the
//! buffer's working-line navigation wants the full list oldest-first.
//!
//! Design invariants:
//! * `load()` yields newest-first and caches, so a second call never
//!   touches the backing store again.
//! * `append_string` updates the cache and the store; the cache stays
//!   oldest-first internally.
//! * File I/O failures are logged and degrade to an empty history; they
//!   never propagate to interactive paths.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

// -------------------------------------------------------------------------------------------------
// Trait
// -------------------------------------------------------------------------------------------------

pub trait History: Send + Sync {
    /// All entries, newest first. The first call reads the backing store;
    /// later calls serve from the cache.
    fn load(&self) -> Vec<String>;

    /// All entries, oldest first.
    fn get_strings(&self) -> Vec<String> {
        let mut entries = self.load();
        entries.reverse();
        entries
    }

    fn append_string(&self, entry: &str);
}

// -------------------------------------------------------------------------------------------------
// Shared cache plumbing
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
struct HistoryCache {
    /// Oldest-first. `None` until the first load.
    entries: Option<Vec<String>>,
}

impl HistoryCache {
    fn new() -> Mutex<Self> {
        Mutex::new(Self { entries: None })
    }
}

// -------------------------------------------------------------------------------------------------
// In-memory / dummy
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryHistory {
    cache: Mutex<HistoryCache>,
    seed: Vec<String>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History pre-populated with entries, oldest first.
    pub fn with_entries(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cache: HistoryCache::new(),
            seed: entries.into_iter().map(Into::into).collect(),
        }
    }
}

impl History for InMemoryHistory {
    fn load(&self) -> Vec<String> {
        let mut cache = self.cache.lock().unwrap();
        let entries = cache.entries.get_or_insert_with(|| self.seed.clone());
        let mut newest_first = entries.clone();
        newest_first.reverse();
        newest_first
    }

    fn append_string(&self, entry: &str) {
        let mut cache = self.cache.lock().unwrap();
        cache
            .entries
            .get_or_insert_with(|| self.seed.clone())
            .push(entry.to_string());
    }
}

/// History that remembers nothing.
#[derive(Default)]
pub struct DummyHistory;

impl History for DummyHistory {
    fn load(&self) -> Vec<String> {
        Vec::new()
    }

    fn append_string(&self, _entry: &str) {}
}

// -------------------------------------------------------------------------------------------------
// File-backed
// -------------------------------------------------------------------------------------------------

/// Append-only text file. Each entry is one or more lines prefixed with `+`;
/// a blank separator line terminates an entry. Newest entries sit at the end
/// of the file.
pub struct FileHistory {
    path: PathBuf,
    cache: Mutex<HistoryCache>,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: HistoryCache::new(),
        }
    }

    fn load_from_disk(&self) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .with_context(|| format!("open history file {}", self.path.display()))?;
        let mut entries = Vec::new();
        let mut lines_of_current: Vec<String> = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line.context("read history line")?;
            if let Some(content) = line.strip_prefix('+') {
                lines_of_current.push(content.to_string());
            } else if !lines_of_current.is_empty() {
                entries.push(std::mem::take(&mut lines_of_current).join("\n"));
            }
        }
        if !lines_of_current.is_empty() {
            entries.push(lines_of_current.join("\n"));
        }
        Ok(entries)
    }

    fn store_to_disk(&self, entry: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open history file {}", self.path.display()))?;
        let mut block = String::new();
        block.push('\n');
        for line in entry.split('\n') {
            block.push('+');
            block.push_str(line);
            block.push('\n');
        }
        file.write_all(block.as_bytes()).context("append history entry")?;
        Ok(())
    }
}

impl History for FileHistory {
    fn load(&self) -> Vec<String> {
        let mut cache = self.cache.lock().unwrap();
        let entries = cache.entries.get_or_insert_with(|| {
            match self.load_from_disk() {
                Ok(entries) => entries,
                Err(err) => {
                    // Missing file is the common first-run case; anything else
                    // degrades to empty as well.
                    warn!(target: "history.file", error = %err, "history load failed");
                    Vec::new()
                }
            }
        });
        let mut newest_first = entries.clone();
        newest_first.reverse();
        newest_first
    }

    fn append_string(&self, entry: &str) {
        let mut cache = self.cache.lock().unwrap();
        if let Some(entries) = cache.entries.as_mut() {
            entries.push(entry.to_string());
        }
        if let Err(err) = self.store_to_disk(entry) {
            warn!(target: "history.file", error = %err, "history store failed");
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Threaded wrapper
// -------------------------------------------------------------------------------------------------

/// Wraps a history whose `load` may block on I/O. The first `stream_load`
/// spawns a worker that pushes entries (newest first) over a bounded channel;
/// the consumer can render entries as they trickle in.
pub struct ThreadedHistory<H: History + 'static> {
    inner: Arc<H>,
}

impl<H: History + 'static> ThreadedHistory<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start a background load. Dropping the receiver stops the worker at
    /// its next send.
    pub fn stream_load(&self) -> crossbeam_channel::Receiver<String> {
        let (tx, rx) = crossbeam_channel::bounded::<String>(64);
        let inner = self.inner.clone();
        std::thread::Builder::new()
            .name("stroke-history-load".into())
            .spawn(move || {
                for entry in inner.load() {
                    if tx.send(entry).is_err() {
                        return;
                    }
                }
            })
            .expect("spawn history load thread");
        rx
    }
}

impl<H: History + 'static> History for ThreadedHistory<H> {
    fn load(&self) -> Vec<String> {
        self.inner.load()
    }

    fn append_string(&self, entry: &str) {
        self.inner.append_string(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn in_memory_newest_first() {
        let h = InMemoryHistory::with_entries(["first", "second"]);
        h.append_string("third");
        assert_eq!(h.load(), vec!["third", "second", "first"]);
        assert_eq!(h.get_strings(), vec!["first", "second", "third"]);
    }

    #[test]
    fn dummy_stays_empty() {
        let h = DummyHistory;
        h.append_string("ignored");
        assert!(h.load().is_empty());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        {
            let h = FileHistory::new(&path);
            h.append_string("ls -la");
            h.append_string("line one\nline two");
        }
        let h = FileHistory::new(&path);
        assert_eq!(h.load(), vec!["line one\nline two", "ls -la"]);
    }

    #[test]
    fn file_format_uses_plus_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let h = FileHistory::new(&path);
        h.append_string("a\nb");
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "\n+a\n+b\n");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let h = FileHistory::new(dir.path().join("nope"));
        assert!(h.load().is_empty());
    }

    #[test]
    fn threaded_streams_newest_first() {
        let h = ThreadedHistory::new(InMemoryHistory::with_entries(["a", "b", "c"]));
        let rx = h.stream_load();
        let got: Vec<String> = rx.iter().collect();
        assert_eq!(got, vec!["c", "b", "a"]);
    }

    #[test]
    fn threaded_worker_stops_when_receiver_dropped() {
        let h = ThreadedHistory::new(InMemoryHistory::with_entries(vec!["x"; 1000]));
        let rx = h.stream_load();
        drop(rx); // worker must exit on its next send
    }
}
