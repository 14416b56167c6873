use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A result object exactly as the API returned it.
///
/// The exporter does not enforce a schema on users, archives, folders or
/// organizations; fields pass through verbatim.
pub type Record = Map<String, Value>;

/// Key of the asset field naming the directory every capture file lives in.
pub const STORAGE_PATH_FIELD: &str = "base_storage_path";

/// Value the service stores in a capture field when that format failed.
pub const FAILED_CAPTURE: &str = "failed";

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("archive field 'assets' is not a list")]
    AssetsNotAList,

    #[error("asset is not a mapping")]
    AssetNotAMapping,

    #[error("asset has no 'base_storage_path'")]
    MissingStoragePath,

    #[error("asset 'base_storage_path' is not a string")]
    StoragePathNotAString,

    #[error("unsafe storage path '{0}': must be relative and stay inside the output directory")]
    UnsafeStoragePath(String),
}

/// How a single capture field of an asset should be treated.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureValue<'a> {
    /// A filename to download.
    File(&'a str),
    /// Null or empty string: this format was never captured.
    Empty,
    /// The sentinel `"failed"`: the capture attempt produced nothing.
    Failed,
    /// Numbers, booleans, nested values. Not a filename.
    Other,
}

impl<'a> CaptureValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Null => CaptureValue::Empty,
            Value::String(s) if s.is_empty() => CaptureValue::Empty,
            Value::String(s) if s == FAILED_CAPTURE => CaptureValue::Failed,
            Value::String(s) => CaptureValue::File(s),
            _ => CaptureValue::Other,
        }
    }
}

/// One capture file referenced by an asset.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFile<'a> {
    /// Asset field the filename came from (e.g. `image_capture`).
    pub field: &'a str,
    pub filename: &'a str,
}

/// Borrowed view over the first asset of an archive record.
#[derive(Debug, Clone)]
pub struct Asset<'a> {
    fields: &'a Record,
    storage_path: &'a str,
}

impl<'a> Asset<'a> {
    /// Locate the primary (first) asset of an archive.
    ///
    /// Returns `Ok(None)` when the archive has no `assets` field or an
    /// empty list.
    pub fn primary(archive: &'a Record) -> Result<Option<Self>, RecordError> {
        let assets = match archive.get("assets") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(assets)) => assets,
            Some(_) => return Err(RecordError::AssetsNotAList),
        };
        match assets.first() {
            None => Ok(None),
            Some(Value::Object(fields)) => Self::from_fields(fields).map(Some),
            Some(_) => Err(RecordError::AssetNotAMapping),
        }
    }

    pub fn from_fields(fields: &'a Record) -> Result<Self, RecordError> {
        let storage_path = match fields.get(STORAGE_PATH_FIELD) {
            None | Some(Value::Null) => return Err(RecordError::MissingStoragePath),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(RecordError::StoragePathNotAString),
        };
        Ok(Self {
            fields,
            storage_path,
        })
    }

    /// The storage path exactly as the server sent it (used for media URLs).
    pub fn storage_path(&self) -> &'a str {
        self.storage_path
    }

    /// The storage path as a relative local directory.
    ///
    /// Rejects absolute paths and `..` so downloads cannot escape the
    /// output root.
    pub fn local_dir(&self) -> Result<PathBuf, RecordError> {
        safe_relative_path(self.storage_path)
    }

    /// Every field other than the storage path, with its classification,
    /// in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, CaptureValue<'a>)> + 'a {
        self.fields
            .iter()
            .filter(|(key, _)| key.as_str() != STORAGE_PATH_FIELD)
            .map(|(key, value)| (key.as_str(), CaptureValue::classify(value)))
    }

    /// Capture files that should be downloaded: non-empty, non-failed strings.
    pub fn capture_files(&self) -> impl Iterator<Item = CaptureFile<'a>> + 'a {
        self.fields().filter_map(|(field, value)| match value {
            CaptureValue::File(filename) => Some(CaptureFile { field, filename }),
            _ => None,
        })
    }
}

/// Convert a server-supplied relative path into a local one, refusing
/// anything that would resolve outside the directory it is joined to.
pub fn safe_relative_path(raw: &str) -> Result<PathBuf, RecordError> {
    let mut out = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(RecordError::UnsafeStoragePath(raw.to_string()));
            }
        }
    }
    Ok(out)
}
