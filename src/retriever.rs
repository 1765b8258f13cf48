use crate::asset::Asset;
use crate::error::SkipReason;
use crate::fetch::{fetch_to_disk, fetch_to_memory};
use crate::locate::{locate, AssetLocation, ProductRef};
use crate::session::Session;
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// One item of the output sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Bytes(Vec<u8>),
    FilePath(PathBuf),
}

#[derive(Debug, Clone)]
pub enum Mode {
    Download {
        output_dir: PathBuf,
        skip: HashSet<String>,
    },
    Stream,
}

/// The unit of work run for every product of a pipeline.
pub trait Retrieve: Send + Sync + 'static {
    fn retrieve(
        &self,
        product: &ProductRef,
    ) -> impl Future<Output = Result<FetchResult, SkipReason>> + Send;
}

/// Locates an asset inside a product and then fetches it.
pub struct AssetRetriever {
    session: Arc<Session>,
    asset: Asset,
    mode: Mode,
}

impl AssetRetriever {
    pub fn new(session: Arc<Session>, asset: Asset, mode: Mode) -> Self {
        Self {
            session,
            asset,
            mode,
        }
    }
}

impl Retrieve for AssetRetriever {
    async fn retrieve(&self, product: &ProductRef) -> Result<FetchResult, SkipReason> {
        let url = match locate(&self.session, &self.asset, &product.url, &product.title).await {
            AssetLocation::Resolved(url) => url,
            AssetLocation::NotFound => return Err(SkipReason::NotFound),
            AssetLocation::Error(e) => return Err(SkipReason::Locate(e)),
        };

        match &self.mode {
            Mode::Download { output_dir, skip } => {
                let path = fetch_to_disk(&self.session, &self.asset, &url, output_dir, skip).await?;
                Ok(FetchResult::FilePath(path))
            }
            Mode::Stream => {
                let bytes = fetch_to_memory(&self.session, &url).await?;
                Ok(FetchResult::Bytes(bytes))
            }
        }
    }
}
