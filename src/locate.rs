//! Resolve the download URL of an asset by walking a product's node tree:
//! product → `GRANULE` → each granule → `IMG_DATA` → file.
use crate::asset::Asset;
use crate::error::LocateError;
use crate::nodes::{join_url, parent_url, NodeTree};
use crate::session::Session;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum AssetLocation {
    Resolved(String),
    NotFound,
    Error(LocateError),
}

/// A product as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProductRef {
    /// Product title, the name of the `.SAFE` folder without its extension.
    pub title: String,
    /// Browsable product URL, e.g. `.../odata/v1/Products('<uuid>')`.
    pub url: String,
}

impl ProductRef {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_owned(),
            url: url.to_owned(),
        }
    }
}

pub fn granules_url(product_url: &str, product_title: &str) -> String {
    let safe = format!("Nodes('{product_title}.SAFE')");
    join_url(product_url, &[safe.as_str(), "Nodes('GRANULE')", "Nodes"])
}

pub async fn locate(
    session: &Session,
    asset: &Asset,
    product_url: &str,
    product_title: &str,
) -> AssetLocation {
    match try_locate(session, asset, product_url, product_title).await {
        Ok(Some(url)) => AssetLocation::Resolved(url),
        Ok(None) => AssetLocation::NotFound,
        Err(e) => AssetLocation::Error(e),
    }
}

async fn try_locate(
    session: &Session,
    asset: &Asset,
    product_url: &str,
    product_title: &str,
) -> Result<Option<String>, LocateError> {
    let granules_url = granules_url(product_url, product_title);
    let content = session.get_text(&granules_url).await?;
    let granules = NodeTree::parse(&content)?.node_refs();
    debug!(product = product_title, granules = granules.len(), "listed granules");

    // The asset is not always under the first granule, so every one is tried.
    for granule in granules {
        let imgdata_url = join_url(
            parent_url(&granules_url),
            &[granule.as_str(), "Nodes('IMG_DATA')", "Nodes"],
        );
        match find_in_imgdata(session, asset, &imgdata_url).await {
            Ok(Some(href)) => {
                return Ok(Some(join_url(parent_url(&imgdata_url), &[href.as_str()])));
            }
            Ok(None) => {
                debug!(product = product_title, granule, "asset not in granule");
            }
            Err(e) => {
                warn!(product = product_title, granule, error = %e, "unable to list IMG_DATA");
            }
        }
    }
    Ok(None)
}

async fn find_in_imgdata(
    session: &Session,
    asset: &Asset,
    imgdata_url: &str,
) -> Result<Option<String>, LocateError> {
    let content = session.get_text(imgdata_url).await?;
    let href = NodeTree::parse(&content)?
        .octet_stream_refs()
        .into_iter()
        .find(|href| asset.matches(href));
    Ok(href)
}
