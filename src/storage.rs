use crate::domain::user::driven_ports::ImageStore;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// URL prefix under which stored profile images are served
pub const PROFILE_IMAGE_URL_PREFIX: &str = "/uploads/profiles";

/// Keeps profile images as plain files in a single directory
pub struct DiskImageStore {
    directory: PathBuf,
}

impl DiskImageStore {
    pub fn new(directory: impl Into<PathBuf>) -> DiskImageStore {
        DiskImageStore {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolves a public path to a file in the image directory. Only the final path segment is
    /// used, so a stored reference can never point outside the directory.
    fn file_for(&self, public_path: &str) -> Option<PathBuf> {
        let file_name = Path::new(public_path).file_name()?;
        Some(self.directory.join(file_name))
    }
}

impl ImageStore for DiskImageStore {
    async fn store_image(&self, file_name: &str, contents: &[u8]) -> Result<String, anyhow::Error> {
        let public_path = format!("{PROFILE_IMAGE_URL_PREFIX}/{file_name}");
        let destination = self
            .file_for(&public_path)
            .context("profile image file name is empty")?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .context("creating profile image directory")?;
        tokio::fs::write(&destination, contents)
            .await
            .with_context(|| format!("writing profile image to {}", destination.display()))?;
        debug!(path = %destination.display(), "stored profile image");

        Ok(public_path)
    }

    async fn remove_image(&self, public_path: &str) -> Result<(), anyhow::Error> {
        let Some(target) = self.file_for(public_path) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("removing profile image {}", target.display())),
        }
    }
}
