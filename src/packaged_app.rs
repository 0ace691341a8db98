//! # `packaged_app`
//!
//! Extracts a packaged command-line application from a `.tar.gz` assembly
//! and hands out [`AppExecutor`]s for the launch scripts it contains.
//!
//! The archive is extracted with the system `tar` into a temporary
//! directory, which is removed again when the [`PackagedApp`] is dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use crate::AppExecutor;

/// Represents an error raised while extracting a packaged application.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum PackagedAppError {
    #[error("Assembly archive {0} does not exist or is not a readable file")]
    ArchiveNotFound(PathBuf),
    #[error("Failed to create a temporary extraction directory: {0}")]
    UnableToCreateTempDir(io::Error),
    #[error("Failed to run tar: {0}")]
    UnableToRunTar(io::Error),
    #[error("tar exited with status {0} while extracting {1}")]
    ExtractionFailed(i32, PathBuf),
}

use PackagedAppError::{
    ArchiveNotFound, ExtractionFailed, UnableToCreateTempDir, UnableToRunTar,
};

/// A command-line application extracted from a `.tar.gz` assembly.
///
/// The assembly is expected to contain a single root directory with a `bin/`
/// subdirectory holding the launch scripts, the common layout of application
/// assemblies.
#[derive(Debug)]
pub struct PackagedApp {
    extraction_dir: TempDir,
    root_dir_name: String,
}

impl PackagedApp {
    /// Extract the given assembly archive.
    ///
    /// `root_dir_name` is the name of the single directory inside the
    /// archive, usually `<name>-<version>`.
    pub fn extract(
        archive: impl AsRef<Path>,
        root_dir_name: impl Into<String>,
    ) -> Result<Self, PackagedAppError> {
        let archive = archive.as_ref();
        if !archive.is_file() {
            return Err(ArchiveNotFound(archive.to_path_buf()));
        }

        let extraction_dir = TempDir::new().map_err(UnableToCreateTempDir)?;
        debug!(
            "extracting {} into {}",
            archive.display(),
            extraction_dir.path().display()
        );

        let status = Command::new("tar")
            .arg("-C")
            .arg(extraction_dir.path())
            .arg("-xzf")
            .arg(archive)
            .status()
            .map_err(UnableToRunTar)?;
        if !status.success() {
            return Err(ExtractionFailed(
                status.code().unwrap_or(-1),
                archive.to_path_buf(),
            ));
        }

        Ok(Self {
            extraction_dir,
            root_dir_name: root_dir_name.into(),
        })
    }

    /// Directory the assembly was extracted into.
    pub fn extraction_dir(&self) -> &Path {
        self.extraction_dir.path()
    }

    /// Path of the launch script for the given application name.
    pub fn command_path(&self, app_name: &str) -> PathBuf {
        self.extraction_dir
            .path()
            .join(&self.root_dir_name)
            .join("bin")
            .join(app_name)
    }

    /// Create an executor for the given application of this assembly.
    pub fn executor(&self, app_name: &str) -> AppExecutor {
        AppExecutor::new(self.command_path(app_name).to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_archive_is_reported() {
        let result = PackagedApp::extract("/nonexistent/app-1.0.tar.gz", "app-1.0");
        assert!(matches!(result, Err(ArchiveNotFound(_))));
    }

    #[test]
    fn command_path_points_into_bin() {
        let dir = TempDir::new().unwrap();
        let app = PackagedApp {
            extraction_dir: dir,
            root_dir_name: "app-1.0".to_string(),
        };
        let path = app.command_path("app");
        assert!(path.ends_with("app-1.0/bin/app"));
    }
}
