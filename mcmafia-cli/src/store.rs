//! File-backed member source
//!
//! The whole store is one JSON or YAML array of member records. It is read
//! fresh on every call and rewritten through a temporary file in the same
//! directory, then renamed over the original.

use crate::config::StoreFormat;
use async_trait::async_trait;
use mcmafia::{
    group_of, organization_members, upsert, MemberId, MemberRecord, MemberSource, ServiceError,
    ServiceResult,
};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Member source persisted as a single file
#[derive(Debug)]
pub struct FileMemberSource {
    path: PathBuf,
    format: StoreFormat,
    write_lock: Mutex<()>,
}

impl FileMemberSource {
    pub fn new(path: impl Into<PathBuf>, format: StoreFormat) -> Self {
        Self {
            path: path.into(),
            format,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored record; a missing file is an empty store
    pub async fn load_all(&self) -> ServiceResult<Vec<MemberRecord>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Store file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ServiceError::source_error(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<MemberRecord> = match self.format {
            StoreFormat::Json => serde_json::from_str(&text).map_err(|e| self.parse_error(e))?,
            StoreFormat::Yaml => serde_yaml_ng::from_str(&text).map_err(|e| self.parse_error(e))?,
        };
        debug!(path = %self.path.display(), count = records.len(), "Loaded member store");
        Ok(records)
    }

    /// Replace the store contents
    pub async fn store_all(&self, records: &[MemberRecord]) -> ServiceResult<()> {
        let text = match self.format {
            StoreFormat::Json => serde_json::to_string_pretty(records)
                .map_err(|e| ServiceError::source_error(e.to_string()))?,
            StoreFormat::Yaml => serde_yaml_ng::to_string(records)
                .map_err(|e| ServiceError::source_error(e.to_string()))?,
        };

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, text.as_bytes()))
            .await
            .map_err(|e| ServiceError::source_error(e.to_string()))?
            .map_err(|e| {
                ServiceError::source_error(format!(
                    "failed to write {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        debug!(path = %self.path.display(), count = records.len(), "Wrote member store");
        Ok(())
    }

    fn parse_error(&self, err: impl std::fmt::Display) -> ServiceError {
        ServiceError::source_error(format!(
            "failed to parse {} as {}: {}",
            self.path.display(),
            self.format,
            err
        ))
    }
}

/// A standalone member file: a bare record list or a `members` document
#[derive(Deserialize)]
#[serde(untagged)]
enum MemberDocument {
    List(Vec<MemberRecord>),
    Wrapped { members: Vec<MemberRecord> },
}

impl From<MemberDocument> for Vec<MemberRecord> {
    fn from(document: MemberDocument) -> Self {
        match document {
            MemberDocument::List(records) | MemberDocument::Wrapped { members: records } => {
                records
            }
        }
    }
}

/// Read records from a file outside the store
///
/// The format follows the file extension, falling back to `fallback`.
pub async fn read_member_file(
    path: &Path,
    fallback: StoreFormat,
) -> ServiceResult<Vec<MemberRecord>> {
    let format = StoreFormat::from_path(path).unwrap_or(fallback);
    let text = fs::read_to_string(path).await.map_err(|e| {
        ServiceError::source_error(format!("failed to read {}: {}", path.display(), e))
    })?;
    let document: MemberDocument = match format {
        StoreFormat::Json => {
            serde_json::from_str::<MemberDocument>(&text).map_err(|e| e.to_string())
        }
        StoreFormat::Yaml => {
            serde_yaml_ng::from_str::<MemberDocument>(&text).map_err(|e| e.to_string())
        }
    }
    .map_err(|e| {
        ServiceError::source_error(format!(
            "failed to parse {} as {}: {}",
            path.display(),
            format,
            e
        ))
    })?;
    let records: Vec<MemberRecord> = document.into();
    debug!(path = %path.display(), count = records.len(), "Read member file");
    Ok(records)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl MemberSource for FileMemberSource {
    async fn find_member(&self, id: &MemberId) -> ServiceResult<Option<MemberRecord>> {
        Ok(self.load_all().await?.into_iter().find(|r| &r.id == id))
    }

    async fn fetch_group(&self, id: &MemberId) -> ServiceResult<Vec<MemberRecord>> {
        group_of(self.load_all().await?, id)
    }

    async fn fetch_organization(
        &self,
        organization: Option<&str>,
    ) -> ServiceResult<Vec<MemberRecord>> {
        Ok(organization_members(self.load_all().await?, organization))
    }

    async fn save_group(&self, records: Vec<MemberRecord>) -> ServiceResult<Vec<MemberRecord>> {
        let _lock = self.write_lock.lock().await;
        let mut stored = self.load_all().await?;
        upsert(&mut stored, &records);
        self.store_all(&stored).await?;
        Ok(records)
    }
}
