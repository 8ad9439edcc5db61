//! Per-trial scratch stores
//!
//! Every trial gets a directory of its own that disappears when the trial
//! is done, whether it succeeded, failed or panicked.

use std::io;
use std::path::Path;
use tempfile::TempDir;

/// Environment variable that tells a process subject where its store lives
pub const SCRATCH_DIR_ENV: &str = "SWEEPBENCH_SCRATCH_DIR";

/// Disposable directory owned by one trial (or one configuration)
#[derive(Debug)]
pub struct TrialScratch {
    dir: TempDir,
}

impl TrialScratch {
    /// Create a store under the system temp directory
    pub fn create(label: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&Self::prefix(label))
            .tempdir()?;
        Ok(Self { dir })
    }

    /// Create a store under `root` (`runner.scratch_root`)
    pub fn create_in(root: &Path, label: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&Self::prefix(label))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    fn prefix(label: &str) -> String {
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("sweepbench-{safe}-")
    }

    /// Location of the store
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
