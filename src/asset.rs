use crate::error::NamingError;
use regex::Regex;

/// File name suffix of the Level-1C true colour image.
pub const TCI_MARKER: &str = "_TCI.jp2";

/// The file to look for inside a granule's `IMG_DATA` folder, identified by a
/// case-sensitive suffix marker such as `_TCI.jp2`.
#[derive(Debug, Clone)]
pub struct Asset {
    marker: String,
    file_name: Regex,
}

impl Asset {
    pub fn new(marker: &str) -> Self {
        let pattern = format!(r"(\w*?{})", regex::escape(marker));
        let file_name = Regex::new(&pattern).expect("Regex pattern should always compile");
        Self {
            marker: marker.to_owned(),
            file_name,
        }
    }

    pub fn true_color() -> Self {
        Self::new(TCI_MARKER)
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether a file link refers to this asset.
    pub fn matches(&self, href: &str) -> bool {
        href.contains(&self.marker)
    }

    /// Derive the on-disk file name from a resolved asset URL.
    pub fn file_name(&self, url: &str) -> Result<String, NamingError> {
        self.file_name
            .captures(url)
            .map(|c| c[1].to_string())
            .ok_or_else(|| NamingError {
                url: url.to_owned(),
            })
    }
}

impl Default for Asset {
    fn default() -> Self {
        Self::true_color()
    }
}
