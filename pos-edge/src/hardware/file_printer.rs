//! File-backed printer core shared by the receipt and kitchen printers
//!
//! Every print job becomes one timestamped text file in the output
//! directory; `connect()` creates the directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use pos_printer::FileOutput;

use super::{HardwareError, HardwareResult};

pub(crate) struct FilePrinter {
    name: String,
    output: FileOutput,
    connected: AtomicBool,
}

impl FilePrinter {
    pub fn new(name: String, output_dir: PathBuf, prefix: &str) -> Self {
        Self {
            name,
            output: FileOutput::new(output_dir, prefix),
            connected: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_dir(&self) -> &Path {
        self.output.dir()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn connect(&self) -> HardwareResult<()> {
        self.output
            .ensure_dir()
            .map_err(|e| HardwareError::Connection {
                device: self.name.clone(),
                reason: e.to_string(),
            })?;
        self.connected.store(true, Ordering::Release);
        tracing::info!(
            printer = %self.name,
            output_dir = %self.output.dir().display(),
            "Printer connected"
        );
        Ok(())
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        tracing::info!(printer = %self.name, "Printer disconnected");
    }

    pub fn print(&self, content: &str) -> HardwareResult<PathBuf> {
        if !self.is_connected() {
            tracing::warn!(printer = %self.name, "Printer not connected");
            return Err(HardwareError::NotConnected(self.name.clone()));
        }
        let path = self.output.write(content)?;
        tracing::info!(printer = %self.name, path = %path.display(), "Print job saved");
        Ok(path)
    }
}
