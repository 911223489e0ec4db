use std::future::Future;

use futures::{channel::oneshot, pin_mut, select_biased, FutureExt, StreamExt};
use tokio::sync::watch;

use crate::api::{store::SnapshotFeed, Snapshot};

/// Handle on a live subscription. Stopping it (explicitly or by dropping it)
/// ends snapshot processing, including side effects still in flight.
#[derive(Debug)]
pub struct Feed {
    cancel: Option<oneshot::Sender<()>>,
}

impl Feed {
    /// Runs `on_snapshot` for every snapshot, one at a time, until the store
    /// closes the feed or `stop` is called
    pub(crate) fn spawn<F, Fut>(
        name: &'static str,
        snapshots: SnapshotFeed,
        mut on_snapshot: F,
    ) -> Feed
    where
        F: 'static + Send + FnMut(Snapshot) -> Fut,
        Fut: 'static + Send + Future<Output = ()>,
    {
        let (cancel, cancellation) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let mut snapshots = snapshots;
            let mut cancellation = cancellation.fuse();
            loop {
                // biased so that nothing is processed once stopped
                select_biased! {
                    _ = cancellation => {
                        tracing::debug!(feed = name, "feed stopped");
                        return;
                    }
                    snapshot = snapshots.next() => match snapshot {
                        None => {
                            tracing::info!(feed = name, "store closed the feed");
                            return;
                        }
                        Some(snapshot) => {
                            let handling = on_snapshot(snapshot).fuse();
                            pin_mut!(handling);
                            select_biased! {
                                _ = cancellation => {
                                    tracing::debug!(feed = name, "feed stopped mid-snapshot");
                                    return;
                                }
                                () = handling => (),
                            }
                        }
                    },
                }
            }
        });
        Feed {
            cancel: Some(cancel),
        }
    }

    /// Idempotent
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.is_canceled())
            .unwrap_or(true)
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.stop()
    }
}

/// Waits until the published value satisfies `pred`, returning it. Returns
/// `None` if the publisher went away first.
pub(crate) async fn wait_until<T, P>(rx: &mut watch::Receiver<T>, mut pred: P) -> Option<T>
where
    T: Clone,
    P: FnMut(&T) -> bool,
{
    loop {
        {
            let current = rx.borrow_and_update();
            if pred(&*current) {
                return Some((*current).clone());
            }
        }
        if rx.changed().await.is_err() {
            // one last look, the final value may be the one we wanted
            let current = rx.borrow();
            return pred(&*current).then(|| (*current).clone());
        }
    }
}
