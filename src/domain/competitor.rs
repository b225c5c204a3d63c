//! A player seated inside an active [`crate::domain::session::MatchSession`].

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use super::mv::Move;

/// Lifecycle of a seated competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompetitorStatus {
    Idle = 0,
    Ready = 1,
    Disposed = 2,
}

impl CompetitorStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => CompetitorStatus::Idle,
            1 => CompetitorStatus::Ready,
            _ => CompetitorStatus::Disposed,
        }
    }
}

/// One of the two players in a match session.
///
/// `status` and `keep_alive_ts` are atomics so the matcher's clean tick can
/// read them without taking the session lock; `operate` is only meaningful
/// while `status == Ready`, and is only ever written by whichever caller won
/// the Idle -> Ready compare-and-swap.
pub struct Competitor {
    pub uid: i64,
    pub access_token: String,
    pub nickname: String,
    pub avatar: String,
    pub balance: Mutex<f64>,
    status: AtomicU8,
    keep_alive_ts: AtomicI64,
    operate: Mutex<Option<Move>>,
    reply: Mutex<Option<oneshot::Sender<ReadyOutcome>>>,
}

/// What a blocked `Ready` call eventually receives.
#[derive(Debug, Clone)]
pub enum ReadyOutcome {
    Resolved(super::session::RoundResult),
    Timeout,
}

impl Competitor {
    pub fn new(uid: i64, access_token: String, nickname: String, avatar: String, balance: f64, now: i64) -> Self {
        Self {
            uid,
            access_token,
            nickname,
            avatar,
            balance: Mutex::new(balance),
            status: AtomicU8::new(CompetitorStatus::Idle as u8),
            keep_alive_ts: AtomicI64::new(now),
            operate: Mutex::new(None),
            reply: Mutex::new(None),
        }
    }

    pub fn is_human(&self, max_robot_uid: i64) -> bool {
        self.uid > max_robot_uid
    }

    pub fn status(&self) -> CompetitorStatus {
        CompetitorStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn touch_keep_alive(&self, now: i64) {
        self.keep_alive_ts.store(now, Ordering::SeqCst);
    }

    pub fn zero_keep_alive(&self) {
        self.keep_alive_ts.store(0, Ordering::SeqCst);
    }

    pub fn keep_alive_ts(&self) -> i64 {
        self.keep_alive_ts.load(Ordering::SeqCst)
    }

    pub fn is_stale(&self, now: i64, timeout_secs: i64) -> bool {
        now - self.keep_alive_ts() > timeout_secs
    }

    /// Attempt the Idle -> Ready transition, recording `operate` and a
    /// one-shot reply sender. Fails if the competitor wasn't Idle.
    ///
    /// `operate`/`reply` are written while holding both their locks, and the
    /// Ready status is only published (via the final atomic store) once that
    /// write has landed, so a concurrent reader can never observe `Ready`
    /// with `operate` still empty.
    pub fn try_become_ready(&self, operate: Move, reply: oneshot::Sender<ReadyOutcome>) -> bool {
        let mut operate_guard = self.operate.lock().expect("operate mutex poisoned");
        let mut reply_guard = self.reply.lock().expect("reply mutex poisoned");

        if self.status.load(Ordering::SeqCst) != CompetitorStatus::Idle as u8 {
            return false;
        }

        *operate_guard = Some(operate);
        *reply_guard = Some(reply);
        self.status.store(CompetitorStatus::Ready as u8, Ordering::SeqCst);
        true
    }

    pub fn operate(&self) -> Option<Move> {
        *self.operate.lock().expect("operate mutex poisoned")
    }

    pub fn overwrite_operate(&self, m: Move) {
        *self.operate.lock().expect("operate mutex poisoned") = Some(m);
    }

    /// Deliver `outcome` to the pending Ready call, if any, and return to Idle.
    pub fn resolve(&self, outcome: ReadyOutcome) {
        let sender = self.reply.lock().expect("reply mutex poisoned").take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
        self.status.store(CompetitorStatus::Idle as u8, Ordering::SeqCst);
        *self.operate.lock().expect("operate mutex poisoned") = None;
    }

    pub fn dispose(&self) {
        let sender = self.reply.lock().expect("reply mutex poisoned").take();
        if let Some(sender) = sender {
            let _ = sender.send(ReadyOutcome::Timeout);
        }
        self.status.store(CompetitorStatus::Disposed as u8, Ordering::SeqCst);
    }

    pub fn balance(&self) -> f64 {
        *self.balance.lock().expect("balance mutex poisoned")
    }

    pub fn adjust_balance(&self, delta: f64) {
        *self.balance.lock().expect("balance mutex poisoned") += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitor() -> Competitor {
        Competitor::new(1, "tok".into(), "nick".into(), "avatar".into(), 100.0, 0)
    }

    #[test]
    fn idle_to_ready_transition_succeeds_once() {
        let c = competitor();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert!(c.try_become_ready(Move::Stone, tx1));
        assert_eq!(c.status(), CompetitorStatus::Ready);
        assert!(!c.try_become_ready(Move::Paper, tx2));
    }

    #[test]
    fn resolve_returns_to_idle_and_clears_operate() {
        let c = competitor();
        let (tx, mut rx) = oneshot::channel();
        c.try_become_ready(Move::Scissors, tx);
        c.resolve(ReadyOutcome::Timeout);
        assert_eq!(c.status(), CompetitorStatus::Idle);
        assert!(c.operate().is_none());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn stale_detection_honors_timeout() {
        let c = competitor();
        c.touch_keep_alive(100);
        assert!(!c.is_stale(105, 10));
        assert!(c.is_stale(120, 10));
    }

    #[test]
    fn human_check_uses_max_robot_uid() {
        let human = Competitor::new(2001, "t".into(), "n".into(), "a".into(), 0.0, 0);
        let robot = Competitor::new(50, "t".into(), "n".into(), "a".into(), 0.0, 0);
        assert!(human.is_human(2000));
        assert!(!robot.is_human(2000));
    }
}
