//! Round-tripping uploaded files through the wizard store.
//!
//! Binary content never goes into the stored document. An upload is copied
//! to a temporary folder and the document keeps a `Temp` path reference that
//! can be turned back into an `UploadedFile` on a later step.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TemporaryConfig;
use crate::error::Result;

/// Path reference to a stashed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temp {
    /// Path relative to the storage root
    pub path: String,
    #[serde(rename = "fullPath")]
    pub full_path: PathBuf,
}

impl Temp {
    pub fn new(path: impl Into<String>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            full_path: full_path.into(),
        }
    }
}

/// A file received with a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub original_name: String,
    pub path: PathBuf,
}

pub trait TempSerializer: Send + Sync {
    fn serialize(&self, file: &UploadedFile) -> Result<Temp>;
    fn unserialize(&self, temp: &Temp) -> Result<UploadedFile>;
}

/// Stores uploads under `{root}/{folder}` on the local disk.
pub struct FilesystemTempSerializer {
    root: PathBuf,
    folder: String,
}

impl FilesystemTempSerializer {
    pub fn new(root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            folder: folder.into(),
        }
    }

    pub fn from_config(config: &TemporaryConfig) -> Self {
        Self::new(config.root_path(), config.folder.clone())
    }

    fn stored_name(file: &UploadedFile) -> String {
        let id = Uuid::new_v4();
        match Path::new(&file.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }
}

impl TempSerializer for FilesystemTempSerializer {
    fn serialize(&self, file: &UploadedFile) -> Result<Temp> {
        let dir = self.root.join(&self.folder);
        fs::create_dir_all(&dir)?;

        let name = Self::stored_name(file);
        let full_path = dir.join(&name);
        fs::copy(&file.path, &full_path)?;

        tracing::debug!(path = %full_path.display(), "stashed wizard upload");
        Ok(Temp::new(format!("{}/{}", self.folder, name), full_path))
    }

    fn unserialize(&self, temp: &Temp) -> Result<UploadedFile> {
        let original_name = Path::new(&temp.path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| temp.path.clone());

        if !temp.full_path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("temporary upload {} is gone", temp.full_path.display()),
            )
            .into());
        }

        Ok(UploadedFile {
            original_name,
            path: temp.full_path.clone(),
        })
    }
}
