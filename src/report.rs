use crate::sized_stream::Skipped;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct SkipRecord {
    pub product: String,
    pub stage: String,
    pub error: String,
}

impl From<&Skipped> for SkipRecord {
    fn from(skipped: &Skipped) -> Self {
        Self {
            product: skipped.product.clone(),
            stage: skipped.reason.stage().to_string(),
            error: skipped.reason.to_string(),
        }
    }
}

/// Outcome of a download run, written next to the downloaded files.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Report {
    pub products: usize,
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkipRecord>,
}

impl Report {
    pub fn new(products: usize, files: Vec<PathBuf>, skipped: &[Skipped]) -> Self {
        Self {
            products,
            files,
            skipped: skipped.iter().map(SkipRecord::from).collect(),
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let report: Self = serde_json::from_str(&content)?;
        Ok(report)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
