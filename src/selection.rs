use crate::asset::{Asset, TCI_MARKER};
use crate::catalog::SearchQuery;
use crate::locate::ProductRef;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn default_max_in_flight() -> usize {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

fn default_asset_marker() -> String {
    TCI_MARKER.to_string()
}

/// Run configuration: where to look, what to retrieve and how hard to push
/// the archive.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Selection {
    pub id: String,
    pub api_url: String,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_asset_marker")]
    pub asset_marker: String,
    /// File names that must not be fetched again.
    #[serde(default)]
    pub skip: Vec<String>,
    /// Catalog search, used when no explicit products are listed.
    #[serde(default)]
    pub query: Option<SearchQuery>,
    #[serde(default)]
    pub products: Vec<ProductRef>,
}

impl Selection {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let selection: Self = toml::from_str(&content)?;
        Ok(selection)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let selection: Self = toml::from_str(&table.to_string())?;
        Ok(selection)
    }

    pub fn asset(&self) -> Asset {
        Asset::new(&self.asset_marker)
    }

    pub fn skip_set(&self) -> HashSet<String> {
        self.skip.iter().cloned().collect()
    }
}

/// Starting point for a new selection file.
pub fn selection_toml() -> toml::Table {
    toml::toml! {
        id = "sentinel2.l1c.tci"

        api_url = "https://scihub.copernicus.eu/dhus"

        max_in_flight = 2

        output_dir = "./outputs"

        asset_marker = "_TCI.jp2"

        skip = []

        [query]
        area = "POLYGON((10.0 55.0,11.0 55.0,11.0 56.0,10.0 56.0,10.0 55.0))"
        platform_name = "Sentinel-2"
        product_type = "S2MSI1C"
        cloud_max = 20.0

        [query.extra]
        beginposition = "[NOW-30DAYS TO NOW]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template() {
        let selection = Selection::from_template(&selection_toml()).unwrap();
        assert_eq!(selection.id, "sentinel2.l1c.tci");
        assert_eq!(selection.max_in_flight, 2);
        assert_eq!(selection.asset().marker(), "_TCI.jp2");
        let query = selection.query.unwrap();
        assert_eq!(query.cloud_max, Some(20.0));
        assert_eq!(query.extra.len(), 1);
        assert!(selection.products.is_empty());
    }

    #[test]
    fn test_defaults() {
        let selection: Selection = toml::from_str(
            r#"
            id = "explicit"
            api_url = "https://scihub.example/dhus"

            [[products]]
            title = "S2A_MSIL1C_20190101T103421_N0207_R108_T32UNG_20190101T123456"
            url = "https://scihub.example/dhus/odata/v1/Products('a1')"
            "#,
        )
        .unwrap();
        assert_eq!(selection.max_in_flight, 2);
        assert_eq!(selection.output_dir, PathBuf::from("./outputs"));
        assert_eq!(selection.asset_marker, TCI_MARKER);
        assert!(selection.query.is_none());
        assert_eq!(selection.products.len(), 1);
        assert!(selection.skip_set().is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.toml");
        let mut selection = Selection::from_template(&selection_toml()).unwrap();
        selection.skip = vec!["T32UNG_20190101T103421_TCI.jp2".to_string()];
        selection.write(&path).unwrap();

        let selection = Selection::read(&path).unwrap();
        assert_eq!(selection.id, "sentinel2.l1c.tci");
        assert!(selection
            .skip_set()
            .contains("T32UNG_20190101T103421_TCI.jp2"));
    }
}
