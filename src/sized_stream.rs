use crate::error::SkipReason;
use crate::retriever::FetchResult;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// A product that contributed nothing to the output.
#[derive(Debug)]
pub struct Skipped {
    pub product: String,
    pub reason: SkipReason,
}

pub(crate) type Outcome = Result<FetchResult, Skipped>;

/// Forward-only stream of results whose total length is known up front.
///
/// `len()` is the number of products submitted, fixed before any work is
/// scheduled. Only successful results are yielded; skipped products are kept
/// aside so that, once the stream is exhausted,
/// `yielded() + skipped().len() == len()`.
///
/// Dropping the stream stops the pipeline behind it: the driver is aborted,
/// which cancels outstanding tasks and releases the shared session.
pub struct SizedStream {
    len: usize,
    yielded: usize,
    skipped: Vec<Skipped>,
    results: mpsc::Receiver<Outcome>,
    driver: AbortHandle,
}

impl SizedStream {
    pub(crate) fn new(len: usize, results: mpsc::Receiver<Outcome>, driver: AbortHandle) -> Self {
        Self {
            len,
            yielded: 0,
            skipped: vec![],
            results,
            driver,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    fn remaining(&self) -> usize {
        self.len
            .saturating_sub(self.yielded)
            .saturating_sub(self.skipped.len())
    }
}

impl Stream for SizedStream {
    type Item = FetchResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FetchResult>> {
        loop {
            match ready!(self.results.poll_recv(cx)) {
                Some(Ok(result)) => {
                    self.yielded += 1;
                    return Poll::Ready(Some(result));
                }
                Some(Err(skipped)) => self.skipped.push(skipped),
                None => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl Drop for SizedStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_len_known_before_consumption() {
        let (tx, rx) = mpsc::channel(4);
        let driver = tokio::spawn(async move {
            tx.send(Ok(FetchResult::Bytes(vec![1]))).await.unwrap();
            tx.send(Err(Skipped {
                product: "S2B_MISSING".to_string(),
                reason: SkipReason::NotFound,
            }))
            .await
            .unwrap();
            tx.send(Ok(FetchResult::Bytes(vec![2]))).await.unwrap();
        });
        let mut stream = SizedStream::new(3, rx, driver.abort_handle());

        assert_eq!(stream.len(), 3);
        assert_eq!(stream.size_hint(), (0, Some(3)));

        let results: Vec<_> = stream.by_ref().collect().await;
        assert_eq!(
            results,
            vec![FetchResult::Bytes(vec![1]), FetchResult::Bytes(vec![2])]
        );
        assert_eq!(stream.yielded(), 2);
        assert_eq!(stream.skipped().len(), 1);
        assert_eq!(stream.skipped()[0].product, "S2B_MISSING");
        assert_eq!(stream.size_hint(), (0, Some(0)));
        assert_eq!(stream.len(), 3);

        // Exhausted streams stay exhausted.
        assert!(stream.next().await.is_none());
    }
}
