//! The two-player round-resolution state machine.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use super::competitor::{Competitor, CompetitorStatus, ReadyOutcome};
use super::mv::{Move, Outcome};
use crate::errors::SessionError;

/// One side's view of a resolved round, handed back through the reply channel.
#[derive(Debug, Clone)]
pub struct CompetitorRoundResult {
    pub access_token: String,
    pub operate: Move,
    pub status: Outcome,
    pub balance: f64,
    pub win: f64,
}

/// The full symmetric payload delivered to both competitors once a round
/// resolves (or empty `results` if the round advanced despite a transfer
/// failure).
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub round: i64,
    pub results: Vec<CompetitorRoundResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    Ok = 0,
    Disposed = 1,
}

/// A live match between exactly two competitors.
pub struct MatchSession {
    pub match_id: String,
    pub level: i64,
    pub timeout_second: i64,
    status: AtomicU8,
    round: AsyncMutex<i64>,
    /// Serializes the "both sides ready -> resolve" transition so exactly
    /// one caller ever commits a given round.
    resolution: AsyncMutex<()>,
    pub competitors: [Competitor; 2],
}

impl MatchSession {
    pub fn new(match_id: String, level: i64, timeout_second: i64, competitors: [Competitor; 2]) -> Self {
        Self {
            match_id,
            level,
            timeout_second,
            status: AtomicU8::new(SessionStatus::Ok as u8),
            round: AsyncMutex::new(0),
            resolution: AsyncMutex::new(()),
            competitors,
        }
    }

    /// Acquire the resolution lock and, if both competitors are ready,
    /// return a guard the caller must hold until it finishes committing the
    /// round. Returns `None` (dropping the lock immediately) if the other
    /// side hasn't submitted yet.
    pub async fn begin_resolution(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        let guard = self.resolution.lock().await;
        if self.both_ready() {
            Some(guard)
        } else {
            None
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.status.load(Ordering::SeqCst) {
            0 => SessionStatus::Ok,
            _ => SessionStatus::Disposed,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.status() == SessionStatus::Disposed
    }

    pub async fn round(&self) -> i64 {
        *self.round.lock().await
    }

    /// Locate the competitor matching `access_token`, if any.
    pub fn find(&self, access_token: &str) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.access_token == access_token)
    }

    /// The other seat relative to `access_token`.
    pub fn opponent_of(&self, access_token: &str) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.access_token != access_token)
    }

    pub fn validate_round(&self, expected: i64, got: i64) -> Result<(), SessionError> {
        if expected != got {
            return Err(SessionError::BadRound { expected, got });
        }
        Ok(())
    }

    /// True once both competitors have submitted a move for the current round.
    pub fn both_ready(&self) -> bool {
        self.competitors
            .iter()
            .all(|c| c.status() == CompetitorStatus::Ready)
    }

    /// Resolve the round if both sides are ready, running `judge` (which may
    /// mutate balances and persist risk-control state) and delivering a
    /// symmetric [`RoundResult`] to both competitors. Called with the
    /// session's round lock held by the caller via [`Self::resolve_round`].
    async fn resolve_locked(
        &self,
        now_millis: i64,
        judged: JudgedRound,
    ) {
        let mut round = self.round.lock().await;
        *round += 1;
        let next_round = *round;
        drop(round);

        let expire = now_millis + self.timeout_second * 1000;

        if judged.transfer_failed {
            let payload = RoundResult {
                server_timestamp: now_millis,
                expire_timestamp: expire,
                round: next_round,
                results: Vec::new(),
            };
            for c in &self.competitors {
                c.resolve(ReadyOutcome::Resolved(payload.clone()));
            }
            return;
        }

        let mut results = Vec::with_capacity(2);
        for (c, outcome, win, operate) in [
            (&self.competitors[0], judged.outcome_a, judged.win_a, judged.operate_a),
            (&self.competitors[1], judged.outcome_a.invert(), judged.win_b, judged.operate_b),
        ] {
            c.adjust_balance(win);
            results.push(CompetitorRoundResult {
                access_token: c.access_token.clone(),
                operate,
                status: outcome,
                balance: c.balance(),
                win,
            });
        }

        let payload = RoundResult {
            server_timestamp: now_millis,
            expire_timestamp: expire,
            round: next_round,
            results,
        };
        for c in &self.competitors {
            c.resolve(ReadyOutcome::Resolved(payload.clone()));
        }
    }

    /// Dispose the session, idempotently. Any competitor still `Ready` gets a
    /// `WaitReadyTimeout`; any competitor `Idle` just has its (already empty)
    /// reply channel dropped.
    pub fn dispose(&self) {
        if self
            .status
            .compare_exchange(
                SessionStatus::Ok as u8,
                SessionStatus::Disposed as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }
        for c in &self.competitors {
            c.dispose();
        }
    }

    pub fn is_stale(&self, now: i64) -> bool {
        self.competitors
            .iter()
            .any(|c| c.is_stale(now, self.timeout_second + 3))
    }
}

/// The inputs a `checkReady` resolution needs, built by the judge before the
/// session mutates any shared state.
pub struct JudgedRound {
    pub outcome_a: Outcome,
    pub win_a: f64,
    pub win_b: f64,
    pub operate_a: Move,
    pub operate_b: Move,
    pub transfer_failed: bool,
}

impl MatchSession {
    /// Entry point used by the matchmaker once both competitors are ready:
    /// build the judged round (via the risk controller / plain RPS table)
    /// and commit it.
    pub async fn commit_round(&self, now_millis: i64, judged: JudgedRound) {
        if self.is_disposed() {
            warn!(match_id = %self.match_id, "commit_round called on disposed session");
            return;
        }
        self.resolve_locked(now_millis, judged).await;
    }
}
