//! In-memory port fakes shared by unit tests.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::context::ServiceContext;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// In-memory filesystem for testing without touching disk.
pub struct MemFs {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self { files: Mutex::new(HashMap::new()) }
    }

    /// Seeds a file into the fake filesystem.
    pub fn seed(self, path: &str, contents: &str) -> Self {
        self.files.lock().unwrap().insert(PathBuf::from(path), contents.to_string());
        self
    }
}

impl FileSystem for MemFs {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .cloned()
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut files = self.files.lock().unwrap();
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
            || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        !files.contains_key(path) && files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let files = self.files.lock().unwrap();
        let mut names = BTreeSet::new();
        for key in files.keys() {
            let Ok(rest) = key.strip_prefix(path) else { continue };
            if let Some(Component::Normal(first)) = rest.components().next() {
                names.insert(first.to_string_lossy().into_owned());
            }
        }
        Ok(names.into_iter().collect())
    }
}

/// Clock that always returns the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The instant returned by contexts built with [`test_context`].
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()
}

/// Builds a context over the given fake filesystem and a fixed clock.
pub fn test_context(fs: MemFs) -> ServiceContext {
    ServiceContext { clock: Box::new(FixedClock(fixed_time())), fs: Box::new(fs) }
}
