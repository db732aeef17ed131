use crate::error::Result;
use crate::models::PropertyRecord;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Stem of export files for a run finished at `finished_at`
pub fn dataset_stem(finished_at: &DateTime<Local>) -> String {
    format!("dataset_{}", finished_at.format("%Y%m%d_%H%M%S"))
}

/// Write `records` as CSV into `dir`, returning the file path.
/// An empty record list still produces a file with the header row.
pub fn write_csv(dir: &Path, records: &[PropertyRecord], finished_at: &DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", dataset_stem(finished_at)));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(PropertyRecord::header())?;
    for record in records {
        writer.write_record(record.row())?;
    }
    writer.flush()?;

    info!("💾 Saved {} properties to {}", records.len(), path.display());
    Ok(path)
}

pub fn write_json(dir: &Path, records: &[PropertyRecord], finished_at: &DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", dataset_stem(finished_at)));

    let json = serde_json::to_string_pretty(records)?;
    fs::write(&path, json)?;

    info!("💾 Saved JSON copy to {}", path.display());
    Ok(path)
}

/// Writes rendered listing pages and screenshots for offline troubleshooting.
/// Failures are logged and never interrupt the run.
pub struct DebugArtifacts {
    dir: Option<PathBuf>,
}

impl DebugArtifacts {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn save_markup(&self, page: u32, markup: &str) {
        self.save(&format!("listing_page_{}.html", page), markup.as_bytes());
    }

    pub fn save_screenshot(&self, page: u32, attempt: u32, png: &[u8]) {
        self.save(&format!("listing_page_{}_attempt{}.png", page, attempt), png);
    }

    fn save(&self, name: &str, contents: &[u8]) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(name);
        let written = fs::create_dir_all(dir).and_then(|_| fs::write(&path, contents));
        match written {
            Ok(()) => info!("Saved {} ({} bytes)", path.display(), contents.len()),
            Err(e) => warn!("Could not write {}: {}", path.display(), e),
        }
    }
}
