use crate::catalog::search;
use crate::locate::ProductRef;
use crate::pipeline::Pipeline;
use crate::retriever::{AssetRetriever, Mode};
use crate::selection::Selection;
use crate::session::Session;
use crate::sized_stream::SizedStream;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

/// Find the products of `selection` and start retrieving their assets.
///
/// Catalog failures and an unusable configuration abort here, before any task
/// is scheduled. Everything after that is per product: see [`SizedStream`].
pub async fn get_tci(session: Arc<Session>, selection: &Selection, mode: Mode) -> Result<SizedStream> {
    if let Mode::Download { output_dir, .. } = &mode {
        fs::create_dir_all(output_dir).await?;
    }

    let products = find_products(&session, selection).await?;
    info!(products = products.len(), "found products");

    let retriever = AssetRetriever::new(session, selection.asset(), mode);
    let pipeline = Pipeline::new(products, selection.max_in_flight, Arc::new(retriever))?;
    Ok(pipeline.run())
}

async fn find_products(session: &Session, selection: &Selection) -> Result<Vec<ProductRef>> {
    if !selection.products.is_empty() {
        return Ok(selection.products.clone());
    }
    let query = selection
        .query
        .as_ref()
        .ok_or_else(|| anyhow!("Selection lists no products and has no query"))?;
    info!(api_url = %selection.api_url, "querying catalog");
    search(session, &selection.api_url, query).await
}
