use crate::client::ApiClient;
use anyhow::{Context, Result};
use perma_model::{Asset, CaptureFile, CaptureValue, Record};
use std::fs;
use std::path::Path;

/// What happened to one archive's capture files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetOutcome {
    /// The archive had no asset to download.
    pub missing_asset: bool,
    pub downloaded: usize,
    pub skipped: usize,
}

/// Download every captured file of an archive's primary asset.
///
/// Files land under `output_dir/<base_storage_path>/<filename>`, overwriting
/// whatever is there. Empty and `"failed"` fields are skipped. Any fetch or
/// write error aborts the whole call.
pub async fn download_assets(
    client: &ApiClient,
    archive: &Record,
    output_dir: &Path,
) -> Result<AssetOutcome> {
    let guid = archive.get("guid").and_then(|g| g.as_str()).unwrap_or("?");

    let primary = Asset::primary(archive).with_context(|| format!("Archive {guid}"))?;
    let Some(asset) = primary else {
        tracing::warn!(guid, "Archive has no assets, skipping capture download");
        return Ok(AssetOutcome {
            missing_asset: true,
            ..AssetOutcome::default()
        });
    };

    let local_dir = asset.local_dir().with_context(|| format!("Archive {guid}"))?;
    let dir = output_dir.join(local_dir);
    let mut outcome = AssetOutcome::default();

    for (field, value) in asset.fields() {
        let reason = match value {
            CaptureValue::File(_) => continue,
            CaptureValue::Empty => "empty",
            CaptureValue::Failed => "capture failed",
            CaptureValue::Other => "not a filename",
        };
        tracing::debug!(guid, field, reason, "Skipping capture field");
        outcome.skipped += 1;
    }

    for CaptureFile { field, filename } in asset.capture_files() {
        let target = dir.join(perma_model::safe_relative_path(filename)?);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let bytes = client.fetch_media(asset.storage_path(), filename).await?;
        fs::write(&target, &bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        tracing::info!(
            guid,
            field,
            path = %target.display(),
            bytes = bytes.len(),
            "Downloaded capture"
        );
        outcome.downloaded += 1;
    }

    Ok(outcome)
}
