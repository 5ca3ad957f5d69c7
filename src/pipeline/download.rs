//! Asynchronous page download.
//!
//! The only suspending node in a run: it awaits the network response
//! while racing its cancellation token, so a deadline arriving
//! mid-flight aborts the request promptly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::operation::{OpStatus, Operation};
use super::slot::Slot;
use crate::feed::{FeedError, FeedPage, RemoteFeed};

/// Downloads one page from the remote feed.
///
/// State machine: idle → executing → finished with
/// `Ok(page)` or `Err(cancelled | invalid request | empty response |
/// network)`. Finishing goes through the guarded [`OpStatus::finish`]
/// transition, so cancellation racing the network completion cannot
/// double-complete.
pub struct DownloadOperation {
    feed: Arc<dyn RemoteFeed>,
    input: Arc<Slot<u32>>,
    output: Arc<Slot<Result<FeedPage, FeedError>>>,
    default_page: Option<u32>,
    status: Arc<OpStatus>,
}

impl DownloadOperation {
    /// Create the operation reading its page number from `input` and
    /// writing the fetch result into `output`.
    pub fn new(
        feed: Arc<dyn RemoteFeed>,
        input: Arc<Slot<u32>>,
        output: Arc<Slot<Result<FeedPage, FeedError>>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            feed,
            input,
            output,
            default_page: None,
            status: OpStatus::new("download", cancel),
        }
    }

    /// Page number used when no upstream relay fills the input slot.
    pub fn with_default_page(mut self, page: u32) -> Self {
        self.default_page = Some(page);
        self
    }
}

#[async_trait]
impl Operation for DownloadOperation {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        let page = self.input.take().or(self.default_page);

        // No page number means the upstream frontier/relay failed:
        // finish cancelled without issuing any network call.
        let Some(page) = page else {
            debug!("no page number wired in, finishing cancelled");
            self.output.put(Err(FeedError::Cancelled));
            self.status.finish();
            return;
        };

        if self.status.is_cancelled() {
            self.output.put(Err(FeedError::Cancelled));
            self.status.finish();
            return;
        }

        let result = tokio::select! {
            () = self.status.cancelled() => {
                // Dropping the fetch future aborts the in-flight request.
                debug!(page, "download cancelled mid-flight");
                Err(FeedError::Cancelled)
            }
            result = self.feed.fetch_page(page) => result,
        };

        match &result {
            Ok(p) => debug!(page = p.page_number, entries = p.entries.len(), "page downloaded"),
            Err(e) => debug!(page, error = %e, "download failed"),
        }

        self.output.put(result);
        self.status.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::spawn_serial;
    use crate::test_utils::ScriptedFeed;

    fn slots() -> (Arc<Slot<u32>>, Arc<Slot<Result<FeedPage, FeedError>>>) {
        (Arc::new(Slot::new()), Arc::new(Slot::new()))
    }

    #[tokio::test]
    async fn downloads_the_requested_page() {
        let feed = ScriptedFeed::with_results(vec![Ok(ScriptedFeed::page(5, &[10, 11]))]);
        let (input, output) = slots();
        input.put(5);

        let op = DownloadOperation::new(
            feed.clone(),
            input,
            Arc::clone(&output),
            CancellationToken::new(),
        );
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        let page = output.take().expect("result").expect("page");
        assert_eq!(page.page_number, 5);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(feed.requested_pages(), vec![5]);
    }

    #[tokio::test]
    async fn missing_page_number_finishes_cancelled_without_network() {
        let feed = ScriptedFeed::with_results(vec![Ok(ScriptedFeed::page(1, &[1]))]);
        let (input, output) = slots();

        let op = DownloadOperation::new(
            feed.clone(),
            input,
            Arc::clone(&output),
            CancellationToken::new(),
        );
        let status = op.status();
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(output.take(), Some(Err(FeedError::Cancelled)));
        assert_eq!(feed.call_count(), 0);
        assert!(status.is_finished());
    }

    #[tokio::test]
    async fn pre_cancelled_download_skips_the_network() {
        let feed = ScriptedFeed::with_results(vec![Ok(ScriptedFeed::page(1, &[1]))]);
        let (input, output) = slots();
        input.put(1);
        let token = CancellationToken::new();
        token.cancel();

        let op = DownloadOperation::new(feed.clone(), input, Arc::clone(&output), token);
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(output.take(), Some(Err(FeedError::Cancelled)));
        assert_eq!(feed.call_count(), 0);
    }

    #[tokio::test]
    async fn mid_flight_cancel_aborts_the_request() {
        let feed = ScriptedFeed::holding();
        let (input, output) = slots();
        input.put(2);

        let op = DownloadOperation::new(
            feed.clone(),
            input,
            Arc::clone(&output),
            CancellationToken::new(),
        );
        let status = op.status();
        let executor = spawn_serial(vec![Box::new(op)]);

        // Let the request get in flight, then fire the cancellation.
        while feed.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(status.is_executing());
        status.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), executor)
            .await
            .expect("cancel must unblock the executor")
            .expect("executor task");

        assert_eq!(output.take(), Some(Err(FeedError::Cancelled)));
        assert!(status.is_finished());
        assert!(status.is_cancelled());
    }

    #[tokio::test]
    async fn feed_errors_become_the_finish_result() {
        let feed = ScriptedFeed::with_results(vec![Err(FeedError::EmptyResponse)]);
        let (input, output) = slots();
        input.put(1);

        let op = DownloadOperation::new(
            feed.clone(),
            input,
            Arc::clone(&output),
            CancellationToken::new(),
        );
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(output.take(), Some(Err(FeedError::EmptyResponse)));
    }

    #[tokio::test]
    async fn default_page_applies_when_slot_is_empty() {
        let feed = ScriptedFeed::with_results(vec![Ok(ScriptedFeed::page(1, &[1]))]);
        let (input, output) = slots();

        let op = DownloadOperation::new(
            feed.clone(),
            input,
            Arc::clone(&output),
            CancellationToken::new(),
        )
        .with_default_page(1);
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert!(output.take().expect("result").is_ok());
        assert_eq!(feed.requested_pages(), vec![1]);
    }
}
