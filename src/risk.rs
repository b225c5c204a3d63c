//! The risk-controlled judge: decides robot-vs-human outcomes against a
//! persisted bonus pool instead of scoring the actual moves honestly.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::domain::{Move, Outcome};
use crate::services::store::Store;

/// Steers robot-involved rounds to target a long-run house margin.
///
/// The pool read-modify-write is serialized through `lock` so concurrent
/// robot-involved rounds can't race each other into a lost update.
pub struct RiskController {
    store: Arc<dyn Store>,
    lock: Mutex<()>,
}

/// Which seat (in a two-competitor array) is the robot.
#[derive(Debug, Clone, Copy)]
pub enum RobotSeat {
    A,
    B,
}

/// Result of judging one round, from competitor A's perspective, plus the
/// moves to actually record (which may have been rewritten for a forced
/// outcome).
pub struct Verdict {
    pub outcome_a: Outcome,
    pub recorded_move_a: Move,
    pub recorded_move_b: Move,
}

impl RiskController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Judge a round between a human and a robot. `robot_seat` identifies
    /// which of (move_a, move_b) belongs to the robot.
    pub async fn judge_robot_round(
        &self,
        level: i64,
        robot_seat: RobotSeat,
        move_a: Move,
        move_b: Move,
    ) -> Verdict {
        let _guard = self.lock.lock().await;

        let pool = match self.store.read_bonus_pool().await {
            Ok(pool) => pool,
            Err(err) => {
                error!(error = %err, "bonus pool read failed, forcing human win");
                return self.force_human_win(robot_seat, move_a, move_b);
            }
        };

        if pool < level as f64 {
            let verdict = self.force_robot_win(robot_seat, move_a, move_b);
            self.persist_pool(pool + level as f64).await;
            return verdict;
        }

        let outcome_a = move_a.judge(move_b);
        let robot_won = match robot_seat {
            RobotSeat::A => outcome_a == Outcome::Won,
            RobotSeat::B => outcome_a.invert() == Outcome::Won,
        };
        let robot_lost = match robot_seat {
            RobotSeat::A => outcome_a == Outcome::Lost,
            RobotSeat::B => outcome_a.invert() == Outcome::Lost,
        };
        let mut new_pool = pool;
        if robot_won {
            new_pool += level as f64;
        } else if robot_lost {
            new_pool -= level as f64;
        }
        if new_pool != pool {
            self.persist_pool(new_pool).await;
        }

        Verdict {
            outcome_a,
            recorded_move_a: move_a,
            recorded_move_b: move_b,
        }
    }

    fn force_robot_win(&self, robot_seat: RobotSeat, move_a: Move, move_b: Move) -> Verdict {
        match robot_seat {
            RobotSeat::A => {
                let recorded_b = move_a.losing_move_for();
                Verdict {
                    outcome_a: Outcome::Won,
                    recorded_move_a: move_a,
                    recorded_move_b: recorded_b,
                }
            }
            RobotSeat::B => {
                let recorded_a = move_b.losing_move_for();
                Verdict {
                    outcome_a: Outcome::Lost,
                    recorded_move_a: recorded_a,
                    recorded_move_b: move_b,
                }
            }
        }
    }

    fn force_human_win(&self, robot_seat: RobotSeat, move_a: Move, move_b: Move) -> Verdict {
        match robot_seat {
            RobotSeat::A => {
                let recorded_a = move_b.losing_move_for();
                Verdict {
                    outcome_a: Outcome::Lost,
                    recorded_move_a: recorded_a,
                    recorded_move_b: move_b,
                }
            }
            RobotSeat::B => {
                let recorded_b = move_a.losing_move_for();
                Verdict {
                    outcome_a: Outcome::Won,
                    recorded_move_a: move_a,
                    recorded_move_b: recorded_b,
                }
            }
        }
    }

    async fn persist_pool(&self, value: f64) {
        if let Err(err) = self.store.write_bonus_pool(value).await {
            warn!(error = %err, "bonus pool write failed, continuing with in-memory decision only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    fn controller(initial_pool: f64) -> RiskController {
        let store = Arc::new(MemoryStore::new());
        store.seed_bonus_pool(initial_pool);
        RiskController::new(store)
    }

    #[tokio::test]
    async fn pool_below_threshold_forces_robot_win() {
        let rc = controller(0.0);
        let verdict = rc.judge_robot_round(10, RobotSeat::B, Move::Stone, Move::Paper).await;
        assert_eq!(verdict.outcome_a, Outcome::Lost);
        assert_eq!(verdict.recorded_move_a, Move::Scissors);
        assert_eq!(verdict.recorded_move_b, Move::Paper);
    }

    #[tokio::test]
    async fn pool_above_threshold_scores_honestly() {
        let rc = controller(1000.0);
        let verdict = rc.judge_robot_round(10, RobotSeat::B, Move::Stone, Move::Scissors).await;
        assert_eq!(verdict.outcome_a, Outcome::Won);
        assert_eq!(verdict.recorded_move_a, Move::Stone);
        assert_eq!(verdict.recorded_move_b, Move::Scissors);
    }

    #[tokio::test]
    async fn pool_increments_when_robot_wins_above_threshold() {
        let store = Arc::new(MemoryStore::new());
        store.seed_bonus_pool(1000.0);
        let rc = RiskController::new(store.clone());
        rc.judge_robot_round(10, RobotSeat::A, Move::Stone, Move::Scissors).await;
        assert_eq!(store.read_bonus_pool().await.unwrap(), 1010.0);
    }

    #[tokio::test]
    async fn pool_decrements_when_robot_loses_above_threshold() {
        let store = Arc::new(MemoryStore::new());
        store.seed_bonus_pool(1000.0);
        let rc = RiskController::new(store.clone());
        rc.judge_robot_round(10, RobotSeat::A, Move::Stone, Move::Paper).await;
        assert_eq!(store.read_bonus_pool().await.unwrap(), 990.0);
    }
}
