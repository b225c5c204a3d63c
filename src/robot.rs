//! Synthetic opponents: roster bookkeeping and the self-driving player loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::{Clock, RandomSource};
use crate::matchmaker::Matchmaker;
use crate::services::AccountService;

/// A round-robin roster of avatar/nickname pairs assigned to robots as they
/// enter a match, independent of the per-login fake-balance synthesis.
pub struct RobotRoster {
    avatars: Vec<String>,
    nicknames: Vec<String>,
    next: AtomicUsize,
}

impl RobotRoster {
    pub fn new(avatars: Vec<String>, nicknames: Vec<String>) -> Self {
        Self {
            avatars,
            nicknames,
            next: AtomicUsize::new(0),
        }
    }

    /// The next (avatar, nickname) pair, advancing the roster pointer.
    pub fn next_identity(&self) -> (String, String) {
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        let avatar = self
            .avatars
            .get(idx % self.avatars.len().max(1))
            .cloned()
            .unwrap_or_default();
        let nickname = self
            .nicknames
            .get(idx % self.nicknames.len().max(1))
            .cloned()
            .unwrap_or_default();
        (avatar, nickname)
    }
}

/// Spins up self-driving robot clients on demand.
pub struct RobotManager {
    matchmaker: Arc<Matchmaker>,
    accounts: Arc<dyn AccountService>,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    robot_uid: i64,
    lifetime_second: i64,
}

impl RobotManager {
    pub fn new(
        matchmaker: Arc<Matchmaker>,
        accounts: Arc<dyn AccountService>,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
        robot_uid: i64,
        lifetime_second: i64,
    ) -> Self {
        Self {
            matchmaker,
            accounts,
            rng,
            clock,
            robot_uid,
            lifetime_second,
        }
    }

    /// Spawn one robot for `level`, seeded with `human_balance` so its
    /// synthesized balance roughly matches its opponent's stake. Runs to
    /// completion on its own background task.
    pub fn spawn(&self, level: i64, human_balance: f64) {
        let matchmaker = self.matchmaker.clone();
        let accounts = self.accounts.clone();
        let rng = self.rng.clone();
        let clock = self.clock.clone();
        let robot_uid = self.robot_uid;
        let lifetime_second = self.lifetime_second;

        tokio::spawn(async move {
            if let Err(err) = run_robot(matchmaker.clone(), accounts, rng, clock, robot_uid, human_balance, level, lifetime_second).await {
                warn!(level, error = %err, "robot session ended with an error");
            }
            matchmaker.clear_robot_inflight(level);
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("login failed: {0}")]
    Login(#[from] crate::errors::AccountError),
    #[error("matchmaker error: {0}")]
    Matchmaker(#[from] crate::errors::MatchmakerError),
}

async fn run_robot(
    matchmaker: Arc<Matchmaker>,
    accounts: Arc<dyn AccountService>,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    robot_uid: i64,
    balance: f64,
    level: i64,
    lifetime_second: i64,
) -> Result<(), RobotError> {
    let token = accounts.login_ai(robot_uid, balance, level, rng.as_ref()).await?;
    info!(level, access_token = %token, "robot logging in");

    let match_response = matchmaker.clone().match_request(level, token.clone()).await?;
    let deadline = clock.now_secs() + lifetime_second;
    let mut round = match_response.round;
    let match_id = match_response.match_id.clone();

    loop {
        if clock.now_secs() >= deadline {
            debug!(match_id = %match_id, "robot lifetime elapsed");
            break;
        }
        let sleep_secs = rng.uniform_range(4, 8);
        tokio::time::sleep(Duration::from_secs(sleep_secs as u64)).await;

        let operate = rng.random_move();
        match matchmaker.ready(match_id.clone(), round, token.clone(), operate).await {
            Ok(result) => {
                round = result.round;
            }
            Err(_) => break,
        }
    }

    let _ = accounts.logout_ai(&token).await;
    let _ = matchmaker.leave(match_id, token).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_cycles_through_entries() {
        let roster = RobotRoster::new(vec!["a1".into(), "a2".into()], vec!["n1".into(), "n2".into(), "n3".into()]);
        let (a1, n1) = roster.next_identity();
        let (a2, n2) = roster.next_identity();
        let (a3, _n3) = roster.next_identity();
        assert_eq!(a1, "a1");
        assert_eq!(a2, "a2");
        assert_eq!(a3, "a1");
        assert_ne!(n1, n2);
    }
}
