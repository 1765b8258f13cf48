//! Bounded task pipeline: runs one [`Retrieve`] task per product with at most
//! `max_in_flight` tasks running at once, and hands results to a
//! [`SizedStream`] in completion order.
use crate::error::{PipelineError, SkipReason};
use crate::locate::ProductRef;
use crate::retriever::{FetchResult, Retrieve};
use crate::sized_stream::{Outcome, SizedStream, Skipped};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

pub struct Pipeline<W: Retrieve> {
    products: Vec<ProductRef>,
    max_in_flight: usize,
    worker: Arc<W>,
}

impl<W: Retrieve> Pipeline<W> {
    pub fn new(
        products: Vec<ProductRef>,
        max_in_flight: usize,
        worker: Arc<W>,
    ) -> Result<Self, PipelineError> {
        if max_in_flight == 0 {
            return Err(PipelineError::ZeroConcurrency);
        }
        Ok(Self {
            products,
            max_in_flight,
            worker,
        })
    }

    /// Start scheduling tasks and return the stream of their results.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(self) -> SizedStream {
        let len = self.products.len();
        info!(products = len, max_in_flight = self.max_in_flight, "starting pipeline");

        let gate = Arc::new(Semaphore::new(self.max_in_flight));
        let (tx, rx) = mpsc::channel(self.max_in_flight);
        let driver = tokio::spawn(drive(self.products, self.worker, gate, tx));

        SizedStream::new(len, rx, driver.abort_handle())
    }
}

type TaskOutput = Result<FetchResult, SkipReason>;

async fn drive<W: Retrieve>(
    products: Vec<ProductRef>,
    worker: Arc<W>,
    gate: Arc<Semaphore>,
    results: mpsc::Sender<Outcome>,
) {
    let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
    let mut titles: HashMap<task::Id, String> = HashMap::new();

    for product in products {
        // Waiting here only holds back submission; finished results already
        // sent on `results` stay available to the consumer.
        let permit = match Arc::clone(&gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "admission gate closed");
                return;
            }
        };

        let worker = Arc::clone(&worker);
        let title = product.title.clone();
        let handle = tasks.spawn(async move {
            // Returned to the gate when the task ends, however it ends.
            let _permit = permit;
            worker.retrieve(&product).await
        });
        titles.insert(handle.id(), title);

        while let Some(joined) = tasks.try_join_next_with_id() {
            if results.send(settle(joined, &mut titles)).await.is_err() {
                return;
            }
        }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        if results.send(settle(joined, &mut titles)).await.is_err() {
            return;
        }
    }
    debug!("all tasks settled");
}

fn settle(
    joined: Result<(task::Id, TaskOutput), JoinError>,
    titles: &mut HashMap<task::Id, String>,
) -> Outcome {
    let (id, output) = match joined {
        Ok((id, output)) => (id, output),
        Err(e) => (e.id(), Err(SkipReason::Aborted(e.to_string()))),
    };
    let product = titles.remove(&id).unwrap_or_default();

    match output {
        Ok(result) => {
            debug!(product = %product, "retrieved");
            Ok(result)
        }
        Err(reason) => {
            warn!(product = %product, stage = reason.stage(), error = %reason, "skipping product");
            Err(Skipped { product, reason })
        }
    }
}
