pub mod asset;
pub mod catalog;
pub mod error;
pub mod fetch;
pub mod locate;
mod nodes;
pub mod pipeline;
pub mod report;
pub mod retriever;
pub mod selection;
pub mod session;
pub mod sized_stream;
pub mod tci;

pub use locate::ProductRef;
pub use retriever::{FetchResult, Mode};
pub use sized_stream::SizedStream;
