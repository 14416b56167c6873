use anyhow::{Context, Result};
use perma_model::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends pages of records to a YAML fixture as one top-level sequence.
///
/// Each page is serialized and flushed on its own, so memory use is bounded
/// by a single page. Block style sequences concatenate cleanly, which keeps
/// the file a single valid document across pages.
pub struct FixtureWriter<W: Write> {
    out: W,
    objects: usize,
}

impl FixtureWriter<BufWriter<File>> {
    /// Create (or truncate) a fixture file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create fixture {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FixtureWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, objects: 0 }
    }

    /// Append one page's objects. Empty pages write nothing.
    pub fn write_page(&mut self, objects: &[Record]) -> Result<()> {
        if objects.is_empty() {
            return Ok(());
        }
        let yaml = serde_yaml::to_string(objects).context("Failed to encode records as YAML")?;
        self.out.write_all(yaml.as_bytes())?;
        self.out.flush()?;
        self.objects += objects.len();
        Ok(())
    }

    /// Flush and close the fixture, returning how many objects it holds.
    ///
    /// A fixture that never received an object is written as `[]`.
    pub fn finish(mut self) -> Result<usize> {
        if self.objects == 0 {
            self.out.write_all(b"[]\n")?;
        }
        self.out.flush()?;
        Ok(self.objects)
    }
}

/// Path of a fixture inside the output directory.
pub fn fixture_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(file_name)
}
