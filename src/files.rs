//! Filesystem collaborators: storing uploads and serving them back.
//!
//! Both operate under one webroot directory. Uploads land in
//! `<webroot>/uploads/` under a random name and are served by the
//! `GET /uploads/{file}` route through [`Webroot`].

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use uuid::Uuid;

use crate::error::Error;
use crate::response::ContentType;

const UPLOADS_DIR: &str = "uploads";

/// Writes uploaded files under `<root>/uploads`.
#[derive(Clone, Debug)]
pub struct Uploader {
    root: PathBuf,
}

impl Uploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Stores `contents` and returns its public path (`uploads/<name>.<ext>`).
    /// Only the extension of `filename` is kept.
    pub async fn store(&self, filename: &str, contents: &[u8]) -> Result<String, Error> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .ok_or_else(|| Error::validation(format!("upload `{filename}` needs a file extension")))?
            .to_ascii_lowercase();

        let dir = self.root.join(UPLOADS_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let name = format!("{}.{ext}", Uuid::new_v4().simple());
        let target = dir.join(&name);
        tokio::fs::write(&target, contents)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        tracing::debug!(path = %target.display(), bytes = contents.len(), "stored upload");
        Ok(format!("{UPLOADS_DIR}/{name}"))
    }
}

/// Read-only view of the webroot.
#[derive(Clone, Debug)]
pub struct Webroot {
    root: PathBuf,
}

impl Webroot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads a file by its path relative to the webroot.
    ///
    /// Paths that would escape the webroot (`..`, absolute paths) are
    /// reported as not found, like any other missing file.
    pub async fn read(&self, relative: &str) -> Result<(Vec<u8>, ContentType), Error> {
        let rel = Path::new(relative);
        if relative.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::not_found(format!("file {relative}")));
        }

        let path = self.root.join(rel);
        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                return Err(Error::not_found(format!("file {relative}")));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("reading {}", path.display())).into());
            }
        };
        let content_type = rel
            .extension()
            .and_then(|e| e.to_str())
            .map_or(ContentType::OctetStream, ContentType::from_extension);
        Ok((contents, content_type))
    }
}
