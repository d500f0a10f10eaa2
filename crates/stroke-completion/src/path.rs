//! Filesystem path completion.

use crate::{CompleteEvent, Completer, Completion};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stroke_text::Document;

type PathsProvider = Arc<dyn Fn() -> Vec<PathBuf> + Send + Sync>;
type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Completes directory entries for the path fragment before the cursor.
/// Directories gain a trailing `/`; entries come back alphabetically; any
/// I/O failure yields an empty result.
pub struct PathCompleter {
    only_directories: bool,
    get_paths: PathsProvider,
    file_filter: Option<FileFilter>,
    min_input_len: usize,
    expand_user: bool,
}

impl Default for PathCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCompleter {
    pub fn new() -> Self {
        Self {
            only_directories: false,
            get_paths: Arc::new(|| vec![PathBuf::from(".")]),
            file_filter: None,
            min_input_len: 0,
            expand_user: false,
        }
    }

    pub fn only_directories(mut self, only_directories: bool) -> Self {
        self.only_directories = only_directories;
        self
    }

    /// Base directories relative paths complete against.
    pub fn get_paths(mut self, get_paths: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static) -> Self {
        self.get_paths = Arc::new(get_paths);
        self
    }

    pub fn file_filter(mut self, filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.file_filter = Some(Arc::new(filter));
        self
    }

    /// Suppress completion until the typed fragment reaches this length.
    pub fn min_input_len(mut self, min_input_len: usize) -> Self {
        self.min_input_len = min_input_len;
        self
    }

    pub fn expand_user(mut self, expand_user: bool) -> Self {
        self.expand_user = expand_user;
        self
    }
}

impl Completer for PathCompleter {
    fn get_completions(&self, document: &Document, _event: &CompleteEvent) -> Vec<Completion> {
        let mut text = document.text_before_cursor().to_string();
        if text.chars().count() < self.min_input_len {
            return Vec::new();
        }
        if self.expand_user
            && let Some(rest) = text.strip_prefix("~/")
            && let Some(home) = std::env::var_os("HOME")
        {
            text = format!("{}/{}", home.to_string_lossy(), rest);
        }

        // Split into the directory walked so far and the fragment typed.
        let (dirname, prefix) = match text.rfind('/') {
            Some(idx) => (text[..=idx].to_string(), text[idx + 1..].to_string()),
            None => (String::new(), text.clone()),
        };

        let directories: Vec<PathBuf> = if dirname.is_empty() {
            (self.get_paths)()
        } else if dirname.starts_with('/') {
            vec![PathBuf::from(&dirname)]
        } else {
            (self.get_paths)()
                .into_iter()
                .map(|p| p.join(&dirname))
                .collect()
        };

        let mut entries: Vec<(PathBuf, String)> = Vec::new();
        for directory in directories {
            let Ok(read_dir) = std::fs::read_dir(&directory) else {
                continue;
            };
            for entry in read_dir.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(&prefix) {
                    entries.push((directory.join(&name), name));
                }
            }
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        let start_position = -(prefix.chars().count() as isize);
        let mut out = Vec::new();
        for (full_path, mut name) in entries {
            let is_dir = full_path.is_dir();
            if self.only_directories && !is_dir {
                continue;
            }
            if !is_dir
                && let Some(filter) = &self.file_filter
                && !filter(&full_path)
            {
                continue;
            }
            if is_dir {
                name.push('/');
            }
            out.push(Completion::new(name).with_start_position(start_position));
        }
        out
    }
}

/// Executables reachable through `PATH`.
pub struct ExecutableCompleter {
    inner: PathCompleter,
}

impl Default for ExecutableCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutableCompleter {
    pub fn new() -> Self {
        Self {
            inner: PathCompleter::new()
                .min_input_len(1)
                .expand_user(true)
                .get_paths(|| {
                    std::env::var("PATH")
                        .unwrap_or_default()
                        .split(':')
                        .filter(|p| !p.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .file_filter(is_executable),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

impl Completer for ExecutableCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        self.inner.get_completions(document, event)
    }
}
