use crate::db::{Store, StoreError, Subscription};
use crate::models::{SessionId, Snapshot};
use crate::voting::gauge::Gauge;
use crate::voting::NpsStats;
use log::info;
use serde::Serialize;
use std::future::Future;

/// Everything the display screen draws for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub session: SessionId,
    pub stats: NpsStats,
    pub gauge: Gauge,
}

impl Frame {
    pub fn from_snapshot(session: &SessionId, snapshot: &Snapshot) -> Self {
        let stats = NpsStats::from_snapshot(snapshot);
        Self {
            session: session.clone(),
            gauge: Gauge::from_stats(&stats),
            stats,
        }
    }
}

/// Display side of a session: one live subscription, stats recomputed from
/// the full vote set on every push.
pub struct LiveView {
    subscription: Subscription,
}

impl LiveView {
    pub async fn attach(store: &dyn Store, session: &SessionId) -> Result<Self, StoreError> {
        let subscription = store.subscribe(session).await?;
        info!("Live view attached to session {}", session);
        Ok(Self { subscription })
    }

    pub fn session(&self) -> &SessionId {
        self.subscription.session()
    }

    /// Waits for the next snapshot. `None` once the feed is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        let snapshot = self.subscription.next().await?;
        Some(Frame::from_snapshot(self.subscription.session(), &snapshot))
    }

    /// Renders frames until the feed ends or `shutdown` resolves, then
    /// releases the subscription. Returns the number of frames rendered.
    pub async fn run<F, R>(mut self, shutdown: F, mut render: R) -> usize
    where
        F: Future<Output = ()>,
        R: FnMut(&Frame),
    {
        tokio::pin!(shutdown);
        let mut rendered = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Live view of session {} shutting down", self.session());
                    break;
                }
                frame = self.next_frame() => match frame {
                    Some(frame) => {
                        render(&frame);
                        rendered += 1;
                    }
                    None => {
                        info!("Vote feed for session {} closed", self.session());
                        break;
                    }
                },
            }
        }

        self.close();
        rendered
    }

    pub fn close(self) {
        self.subscription.unsubscribe();
    }
}
