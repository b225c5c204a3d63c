//! Persistence for the bonus pool and the ranking table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};

use crate::errors::StoreError;

/// One row of the ranking table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RankingRow {
    pub uid: i64,
    pub avatar: String,
    pub win_amount: f64,
    pub nickname: String,
    pub time_updated: i64,
}

/// Persistence contract used by the statistics worker and the risk controller.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read_bonus_pool(&self) -> Result<f64, StoreError>;
    async fn write_bonus_pool(&self, value: f64) -> Result<(), StoreError>;
    async fn upsert_ranking(&self, delta: RankingRow) -> Result<(), StoreError>;
    async fn top_ranking(&self, limit: usize) -> Result<Vec<RankingRow>, StoreError>;
}

/// In-memory double used by tests and as a zero-infrastructure fallback.
pub struct MemoryStore {
    bonus_pool: Mutex<f64>,
    ranking: Mutex<HashMap<i64, RankingRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bonus_pool: Mutex::new(0.0),
            ranking: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed_bonus_pool(&self, value: f64) {
        *self.bonus_pool.lock().expect("bonus pool mutex poisoned") = value;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_bonus_pool(&self) -> Result<f64, StoreError> {
        Ok(*self.bonus_pool.lock().expect("bonus pool mutex poisoned"))
    }

    async fn write_bonus_pool(&self, value: f64) -> Result<(), StoreError> {
        *self.bonus_pool.lock().expect("bonus pool mutex poisoned") = value;
        Ok(())
    }

    async fn upsert_ranking(&self, delta: RankingRow) -> Result<(), StoreError> {
        let mut ranking = self.ranking.lock().expect("ranking mutex poisoned");
        ranking
            .entry(delta.uid)
            .and_modify(|row| {
                row.win_amount += delta.win_amount;
                row.time_updated = delta.time_updated;
            })
            .or_insert(delta);
        Ok(())
    }

    async fn top_ranking(&self, limit: usize) -> Result<Vec<RankingRow>, StoreError> {
        let ranking = self.ranking.lock().expect("ranking mutex poisoned");
        let mut rows: Vec<RankingRow> = ranking.values().filter(|r| r.win_amount > 0.0).cloned().collect();
        rows.sort_by(|a, b| b.win_amount.partial_cmp(&a.win_amount).unwrap());
        rows.truncate(limit);
        Ok(rows)
    }
}

/// MongoDB-backed store, mirroring the original `risk_control` single
/// document and per-uid `ranking` collection.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    fn risk_control(&self) -> Collection<mongodb::bson::Document> {
        self.db.collection("risk_control")
    }

    fn ranking(&self) -> Collection<RankingRow> {
        self.db.collection("ranking")
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn read_bonus_pool(&self) -> Result<f64, StoreError> {
        let doc = self
            .risk_control()
            .find_one(doc! {}, None)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))?;
        Ok(doc.and_then(|d| d.get_f64("bonus_pool").ok()).unwrap_or(0.0))
    }

    async fn write_bonus_pool(&self, value: f64) -> Result<(), StoreError> {
        self.risk_control()
            .update_one(
                doc! {},
                doc! { "$set": { "bonus_pool": value } },
                mongodb::options::UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn upsert_ranking(&self, delta: RankingRow) -> Result<(), StoreError> {
        let existing = self
            .ranking()
            .find_one(doc! { "uid": delta.uid }, None)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))?;

        match existing {
            Some(row) => {
                self.ranking()
                    .update_one(
                        doc! { "uid": delta.uid },
                        doc! { "$set": {
                            "win_amount": row.win_amount + delta.win_amount,
                            "time_updated": delta.time_updated,
                        } },
                        None,
                    )
                    .await
                    .map_err(|e| StoreError::Operation(e.to_string()))?;
            }
            None => {
                self.ranking()
                    .insert_one(&delta, None)
                    .await
                    .map_err(|e| StoreError::Operation(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn top_ranking(&self, limit: usize) -> Result<Vec<RankingRow>, StoreError> {
        use futures_util::TryStreamExt;

        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "win_amount": -1 })
            .limit(limit as i64)
            .build();
        let mut cursor = self
            .ranking()
            .find(doc! { "win_amount": { "$gt": 0 } }, options)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = cursor.try_next().await.map_err(|e| StoreError::Operation(e.to_string()))? {
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bonus_pool_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.read_bonus_pool().await.unwrap(), 0.0);
        store.write_bonus_pool(42.0).await.unwrap();
        assert_eq!(store.read_bonus_pool().await.unwrap(), 42.0);
    }

    #[tokio::test]
    async fn ranking_upsert_sums_and_filters_nonpositive() {
        let store = MemoryStore::new();
        store
            .upsert_ranking(RankingRow {
                uid: 1,
                avatar: "a".into(),
                win_amount: 10.0,
                nickname: "n".into(),
                time_updated: 1,
            })
            .await
            .unwrap();
        store
            .upsert_ranking(RankingRow {
                uid: 1,
                avatar: "a".into(),
                win_amount: 5.0,
                nickname: "n".into(),
                time_updated: 2,
            })
            .await
            .unwrap();
        store
            .upsert_ranking(RankingRow {
                uid: 2,
                avatar: "b".into(),
                win_amount: -3.0,
                nickname: "m".into(),
                time_updated: 1,
            })
            .await
            .unwrap();

        let top = store.top_ranking(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].uid, 1);
        assert_eq!(top[0].win_amount, 15.0);
    }
}
