//! File-based printer output
//!
//! Every print job becomes one artifact file named
//! `{prefix}_{YYYYmmdd_HHMMSS_mmm}.txt` inside the output directory.
//! Jobs landing in the same millisecond get a `_N` suffix instead of
//! overwriting each other.

use crate::error::{PrintError, PrintResult};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Max same-timestamp suffixes tried before giving up
const MAX_COLLISIONS: u32 = 1000;

/// File output (artifact writer)
#[derive(Debug, Clone)]
pub struct FileOutput {
    dir: PathBuf,
    prefix: String,
}

impl FileOutput {
    /// Create a new file output
    ///
    /// Nothing is touched on disk until [`ensure_dir`](Self::ensure_dir) or
    /// [`write`](Self::write) is called.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Get the output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory (idempotent)
    pub fn ensure_dir(&self) -> PrintResult<()> {
        if self.prefix.is_empty() {
            return Err(PrintError::InvalidConfig(
                "artifact prefix must not be empty".to_string(),
            ));
        }
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.dir.is_dir()
    }

    /// Write one artifact with exactly `content`, returning its path
    #[instrument(skip(self, content), fields(dir = %self.dir.display(), prefix = %self.prefix, len = content.len()))]
    pub fn write(&self, content: &str) -> PrintResult<PathBuf> {
        if !self.is_online() {
            return Err(PrintError::Offline(format!(
                "output directory missing: {}",
                self.dir.display()
            )));
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();

        for attempt in 0..MAX_COLLISIONS {
            let name = if attempt == 0 {
                format!("{}_{}.txt", self.prefix, stamp)
            } else {
                format!("{}_{}_{}.txt", self.prefix, stamp, attempt)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())?;
                    file.flush()?;
                    debug!(path = %path.display(), "Artifact written");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(PrintError::Io(e)),
            }
        }

        Err(PrintError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("too many artifacts for timestamp {}", stamp),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FileOutput::new(tmp.path().join("missing"), "receipt");
        assert!(!output.is_online());
        assert!(matches!(output.write("x"), Err(PrintError::Offline(_))));
    }

    #[test]
    fn test_write_content_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FileOutput::new(tmp.path().join("out"), "receipt");
        output.ensure_dir().unwrap();

        let path = output.write("*** RECEIPT ***\nTotal: 9.90").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("receipt_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "*** RECEIPT ***\nTotal: 9.90"
        );
    }

    #[test]
    fn test_burst_writes_never_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FileOutput::new(tmp.path(), "kitchen");
        output.ensure_dir().unwrap();

        for i in 0..20 {
            output.write(&format!("ticket {}", i)).unwrap();
        }
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 20);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FileOutput::new(tmp.path(), "");
        assert!(matches!(
            output.ensure_dir(),
            Err(PrintError::InvalidConfig(_))
        ));
    }
}
