use crate::assets::download_assets;
use crate::client::ApiClient;
use crate::fixture::{fixture_path, FixtureWriter};
use crate::progress::ProgressSink;
use anyhow::{Context, Result};
use perma_model::{Page, ResourceKind};
use std::fs;
use std::path::Path;

/// Counts gathered over one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub users: usize,
    pub archives: usize,
    pub folders: usize,
    pub vesting_orgs: usize,
    pub assets_downloaded: usize,
    pub archives_without_assets: usize,
}

/// Export the user profile, archives (with capture files), folders and
/// vesting organizations into `output_dir`.
///
/// Creates the directory if needed. Every resource is fetched in full, in
/// that order; the first error stops the run and leaves whatever was
/// already written on disk.
pub async fn export(
    client: &ApiClient,
    output_dir: &Path,
    progress: &dyn ProgressSink,
) -> Result<ExportSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut summary = ExportSummary::default();

    summary.users = export_user(client, output_dir).await?;
    export_archives(client, output_dir, progress, &mut summary).await?;
    summary.folders = export_list(client, output_dir, ResourceKind::Folders).await?;
    summary.vesting_orgs = export_list(client, output_dir, ResourceKind::VestingOrgs).await?;

    tracing::info!(
        users = summary.users,
        archives = summary.archives,
        folders = summary.folders,
        vesting_orgs = summary.vesting_orgs,
        assets = summary.assets_downloaded,
        archives_without_assets = summary.archives_without_assets,
        path = %output_dir.display(),
        "Export complete"
    );
    Ok(summary)
}

async fn export_user(client: &ApiClient, output_dir: &Path) -> Result<usize> {
    let kind = ResourceKind::Users;
    let path = fixture_path(output_dir, &kind.fixture_file());
    tracing::info!(resource = %kind, "Downloading user profile");

    let user = client.fetch_record(kind.endpoint()).await?;
    let page = Page::single(user);

    let mut fixture = FixtureWriter::create(&path)?;
    fixture.write_page(&page.objects)?;
    let count = fixture.finish()?;
    tracing::info!(path = %path.display(), objects = count, "Wrote fixture");
    Ok(count)
}

async fn export_archives(
    client: &ApiClient,
    output_dir: &Path,
    progress: &dyn ProgressSink,
    summary: &mut ExportSummary,
) -> Result<()> {
    let kind = ResourceKind::Archives;
    let path = fixture_path(output_dir, &kind.fixture_file());
    tracing::info!(resource = %kind, "Downloading archives and captures");

    let mut fixture = FixtureWriter::create(&path)?;
    let mut pages = client.paginate(kind.endpoint());

    while let Some(page) = pages.next_page().await? {
        fixture.write_page(&page.objects)?;
        tracing::debug!(
            objects = page.objects.len(),
            offset = page.meta.offset,
            total = page.meta.total_count,
            "Wrote archives page"
        );

        if page.meta.total_count == 0 {
            progress.update(1.0);
        }
        for (i, archive) in page.objects.iter().enumerate() {
            let outcome = download_assets(client, archive, output_dir).await?;
            summary.assets_downloaded += outcome.downloaded;
            if outcome.missing_asset {
                summary.archives_without_assets += 1;
            }
            progress.update(page.meta.fraction_after(i));
        }
    }

    summary.archives = fixture.finish()?;
    tracing::info!(
        path = %path.display(),
        objects = summary.archives,
        pages = pages.pages_fetched(),
        "Wrote fixture"
    );
    Ok(())
}

async fn export_list(client: &ApiClient, output_dir: &Path, kind: ResourceKind) -> Result<usize> {
    let path = fixture_path(output_dir, &kind.fixture_file());
    tracing::info!(resource = %kind, "Downloading");

    let mut fixture = FixtureWriter::create(&path)?;
    let mut pages = client.paginate(kind.endpoint());
    while let Some(page) = pages.next_page().await? {
        fixture.write_page(&page.objects)?;
    }

    let count = fixture.finish()?;
    tracing::info!(
        path = %path.display(),
        objects = count,
        pages = pages.pages_fetched(),
        "Wrote fixture"
    );
    Ok(count)
}
