//! Background aggregation of per-round win deltas into the ranking store.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;

use crate::services::{RankingRow, Store};

const QUEUE_CAPACITY: usize = 20480;

/// Single-producer-many, single-consumer funnel from round resolution into
/// the ranking store. Submission never blocks gameplay: a full queue drops
/// the delta and logs it.
pub struct StatisticsManager {
    sender: mpsc::Sender<RankingRow>,
}

impl StatisticsManager {
    /// Spawns the consumer task that drains deltas into `store`.
    pub fn spawn(store: Arc<dyn Store>) -> Arc<Self> {
        let (sender, mut receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(delta) = receiver.recv().await {
                if let Err(err) = store.upsert_ranking(delta).await {
                    error!(error = %err, "ranking upsert failed");
                }
            }
        });
        Arc::new(Self { sender })
    }

    /// Enqueue a win-amount delta. Drops and logs on a full queue rather
    /// than ever blocking the caller.
    pub fn submit(&self, delta: RankingRow) {
        if let Err(err) = self.sender.try_send(delta) {
            error!(error = %err, "statistics queue full, dropping result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    #[tokio::test]
    async fn submitted_deltas_eventually_land_in_store() {
        let store = Arc::new(MemoryStore::new());
        let stats = StatisticsManager::spawn(store.clone());
        stats.submit(RankingRow {
            uid: 1,
            avatar: "a".into(),
            win_amount: 5.0,
            nickname: "n".into(),
            time_updated: 1,
        });
        // Let the consumer task drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let top = store.top_ranking(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].uid, 1);
    }
}
