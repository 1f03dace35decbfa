use std::fs;
use std::io::{self, Read, Write};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::codec;
use crate::domain::{ModelRecord, decimal};
use crate::error::M4dbError;

pub const ARCHIVE_FILE_NAME: &str = "data.zip";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// The sharded tree holding one `data.zip` per model.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: Utf8PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_dir(&self, unique_id: &str) -> Result<Utf8PathBuf, M4dbError> {
        Ok(self.root.join(codec::uid_to_dir(unique_id)?))
    }

    pub fn archive_path(&self, unique_id: &str) -> Result<Utf8PathBuf, M4dbError> {
        Ok(self.model_dir(unique_id)?.join(ARCHIVE_FILE_NAME))
    }
}

/// Retrieved archives laid out as
/// `<root>/<user>/<project>/<material>/<geometry>/<size>/<temperature>/<uid>.zip`.
#[derive(Debug, Clone)]
pub struct DestinationTree {
    root: Utf8PathBuf,
}

impl DestinationTree {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_dir(&self, record: &ModelRecord) -> Result<Utf8PathBuf, M4dbError> {
        let components = [
            record.db_user.clone(),
            record.project_name.clone(),
            record.material.clone(),
            record.geometry.clone(),
            decimal(record.size),
            decimal(record.temperature),
        ];
        let mut dir = self.root.clone();
        for component in &components {
            dir.push(single_component(component)?);
        }
        Ok(dir)
    }

    pub fn archive_path(&self, record: &ModelRecord) -> Result<Utf8PathBuf, M4dbError> {
        let file_name = format!("{}.zip", record.unique_id);
        Ok(self.model_dir(record)?.join(single_component(&file_name)?))
    }
}

pub fn ensure_dir(path: &Utf8Path) -> Result<(), M4dbError> {
    fs::create_dir_all(path.as_std_path()).map_err(|err| M4dbError::OutputWriteFailed {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// Copies `source` over `dest`, keeping the source's permission bits. The
/// destination is replaced by a single rename, so a partial copy is never
/// visible under the final name.
pub fn copy_archive(
    unique_id: &str,
    source: &Utf8Path,
    dest: &Utf8Path,
) -> Result<u64, M4dbError> {
    let missing = || M4dbError::SourceArchiveMissing {
        uid: unique_id.to_string(),
        path: source.to_string(),
    };
    let mut reader = fs::File::open(source.as_std_path()).map_err(|_| missing())?;
    let metadata = reader.metadata().map_err(|_| missing())?;
    if !metadata.is_file() {
        return Err(missing());
    }

    let write_failed = |message: String| M4dbError::OutputWriteFailed {
        path: dest.to_string(),
        message,
    };
    let parent = dest
        .parent()
        .ok_or_else(|| write_failed("invalid destination path".to_string()))?;
    ensure_dir(parent)?;
    let mut temp = Builder::new()
        .prefix(".m4db-copy")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| write_failed(err.to_string()))?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(M4dbError::SourceReadFailed {
                    path: source.to_string(),
                    message: err.to_string(),
                });
            }
        };
        temp.write_all(&buffer[..read])
            .map_err(|err| write_failed(err.to_string()))?;
        bytes += read as u64;
    }

    temp.as_file()
        .set_permissions(metadata.permissions())
        .map_err(|err| write_failed(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| write_failed(err.error.to_string()))?;
    Ok(bytes)
}

fn single_component(value: &str) -> Result<&str, M4dbError> {
    let mut components = Utf8Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(name)), None) if name == value => Ok(value),
        _ => Err(M4dbError::InvalidPathComponent(value.to_string())),
    }
}
