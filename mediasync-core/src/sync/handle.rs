use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use mediasync_model::SyncStatus;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

/// Caller's view of a running sync: a stream of [`SyncStatus`] that ends
/// after the terminal status.
///
/// Dropping the handle cancels the run. The run still performs its final
/// flush before it stops.
pub struct SyncRunHandle {
    run_id: Uuid,
    source: String,
    statuses: UnboundedReceiverStream<SyncStatus>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for SyncRunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRunHandle")
            .field("run_id", &self.run_id)
            .field("source", &self.source)
            .field("cancelled", &self.cancel.is_cancelled())
            .field(
                "finished",
                &self.task.as_ref().is_none_or(JoinHandle::is_finished),
            )
            .finish()
    }
}

impl SyncRunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        source: &str,
        statuses: mpsc::UnboundedReceiver<SyncStatus>,
        cancel: CancellationToken,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            run_id,
            source: source.to_string(),
            statuses: UnboundedReceiverStream::new(statuses),
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Request cancellation. Statuses keep flowing until `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the stream and return the terminal status.
    pub async fn wait(mut self) -> Option<SyncStatus> {
        let mut terminal = None;
        while let Some(status) = self.next().await {
            if status.is_terminal() {
                terminal = Some(status);
            }
        }
        self.join().await;
        terminal
    }

    /// Drain the stream, keeping every status.
    pub async fn collect_all(mut self) -> Vec<SyncStatus> {
        let mut statuses = Vec::new();
        while let Some(status) = self.next().await {
            statuses.push(status);
        }
        self.join().await;
        statuses
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::error!(
                target: "sync::run",
                run_id = %self.run_id,
                source = %self.source,
                error = %err,
                "sync task ended abnormally"
            );
        }
    }
}

impl Stream for SyncRunHandle {
    type Item = SyncStatus;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.statuses).poll_next(cx)
    }
}
