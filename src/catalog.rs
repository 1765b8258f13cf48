//! Product search against the archive's OpenSearch endpoint.
use crate::locate::ProductRef;
use crate::nodes::{join_url, parent_url};
use crate::session::Session;
use anyhow::{anyhow, Result};
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

const ROWS: usize = 100;

fn default_platform_name() -> String {
    "Sentinel-2".to_string()
}

fn default_product_type() -> String {
    "S2MSI1C".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SearchQuery {
    /// Area of interest as WKT, e.g. `POLYGON((...))`.
    pub area: String,
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    /// Maximum cloud cover over the whole scene, in percent.
    #[serde(default)]
    pub cloud_max: Option<f64>,
    /// Additional `keyword:value` terms, e.g. `beginposition`.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl SearchQuery {
    pub fn new(area_wkt: &str) -> Self {
        Self {
            area: area_wkt.to_owned(),
            platform_name: default_platform_name(),
            product_type: default_product_type(),
            cloud_max: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn format(&self) -> String {
        let mut terms = vec![
            format!("platformname:{}", self.platform_name),
            format!("producttype:{}", self.product_type),
            format!("footprint:\"Intersects({})\"", self.area),
        ];
        if let Some(cloud_max) = self.cloud_max {
            terms.push(format!("cloudcoverpercentage:[0 TO {cloud_max}]"));
        }
        for (key, value) in &self.extra {
            terms.push(format!("{key}:{value}"));
        }
        terms.join(" AND ")
    }
}

/// Run `query` against `api_url`, reading every result page.
pub async fn search(session: &Session, api_url: &str, query: &SearchQuery) -> Result<Vec<ProductRef>> {
    let q = query.format();
    debug!(query = %q, "searching catalog");

    let mut products = vec![];
    let mut start = 0;
    loop {
        let mut url = Url::parse(&join_url(api_url, &["search"]))?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("rows", &ROWS.to_string())
            .append_pair("start", &start.to_string());

        let content = session.get_text(url.as_str()).await?;
        let page = SearchPage::parse(&content)?;
        let page_len = page.products.len();
        products.extend(page.products);

        let done = match page.total {
            Some(total) => products.len() >= total,
            None => page_len < ROWS,
        };
        if done || page_len == 0 {
            break;
        }
        start += ROWS;
    }

    info!(products = products.len(), "catalog search complete");
    Ok(products)
}

struct SearchPage {
    total: Option<usize>,
    products: Vec<ProductRef>,
}

impl SearchPage {
    fn parse(content: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(content)?;
        let feed = doc.root_element();
        if !feed.has_tag_name("feed") {
            return Err(anyhow!("Search response is not a feed"));
        }

        let total = feed
            .children()
            .find(|n| n.has_tag_name("totalResults"))
            .and_then(|n| n.text())
            .and_then(|t| t.trim().parse().ok());

        let products = feed
            .children()
            .filter(|n| n.has_tag_name("entry"))
            .filter_map(extract_product)
            .collect();

        Ok(Self { total, products })
    }
}

fn extract_product(entry: Node) -> Option<ProductRef> {
    let title = entry
        .children()
        .find(|n| n.has_tag_name("title"))?
        .text()?
        .trim()
        .to_string();
    // The link without a `rel` points at the product content (`.../$value`).
    let link = entry
        .children()
        .filter(|n| n.has_tag_name("link"))
        .find(|n| n.attribute("rel").is_none())?
        .attribute("href")?;
    Some(ProductRef {
        title,
        url: parent_url(link).to_string(),
    })
}
