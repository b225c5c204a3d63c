//! The per-level FIFO of players waiting to be paired.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

/// What a blocked `Match` call eventually receives.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Paired(PairedMatch),
    KickOut,
    WaitMatchTimeout,
}

/// The session-facing half of a freshly formed pairing, handed back to each
/// waiter's reply channel. `own_access_token` is this entry's own token
/// (echoed back); the opponent's token is never exposed to the peer.
#[derive(Debug, Clone)]
pub struct PairedMatch {
    pub match_id: String,
    pub level: i64,
    pub round: i64,
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub timeout_second: i64,
    pub own_access_token: String,
    pub own_balance: f64,
    pub own_nickname: String,
    pub own_avatar: String,
    pub opponent_nickname: String,
    pub opponent_avatar: String,
    pub opponent_balance: f64,
}

/// One player parked in a waiting list, blocked on `reply`.
pub struct WaitingEntry {
    pub uid: i64,
    pub access_token: String,
    pub balance: f64,
    pub nickname: String,
    pub fb_open_id: String,
    pub enqueued_at: i64,
    reply: Option<oneshot::Sender<MatchOutcome>>,
}

impl WaitingEntry {
    pub fn new(
        uid: i64,
        access_token: String,
        balance: f64,
        nickname: String,
        fb_open_id: String,
        enqueued_at: i64,
        reply: oneshot::Sender<MatchOutcome>,
    ) -> Self {
        Self {
            uid,
            access_token,
            balance,
            nickname,
            fb_open_id,
            enqueued_at,
            reply: Some(reply),
        }
    }

    pub fn is_human(&self, human_uid_floor: i64) -> bool {
        self.uid > human_uid_floor
    }

    pub fn resolve(mut self, outcome: MatchOutcome) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(outcome);
        }
    }
}

/// Outcome of kicking the head(s) of the queue during one pairing step.
pub enum PairOutcome {
    /// Two distinct waiters were paired; caller builds the session.
    Paired(WaitingEntry, WaitingEntry),
    /// Same uid reconnected; the later entry was kicked, the earlier stays
    /// queued at the front.
    SameUidKicked,
    /// Two robots met; both were dropped.
    RobotsDropped,
}

/// FIFO queue of waiters for one wager level.
pub struct WaitingList {
    pub level: i64,
    queue: Mutex<VecDeque<WaitingEntry>>,
    robot_inflight: AtomicBool,
}

/// Threshold used across the original implementation: any uid at or below
/// this value identifies a robot rather than a human.
pub const HUMAN_UID_FLOOR: i64 = 2000;

/// Seconds a lone waiter is kept before being evicted with `WaitMatchTimeout`.
pub const SOLO_WAIT_TIMEOUT_SECS: i64 = 30;

impl WaitingList {
    pub fn new(level: i64) -> Self {
        Self {
            level,
            queue: Mutex::new(VecDeque::new()),
            robot_inflight: AtomicBool::new(false),
        }
    }

    pub fn enqueue(&self, entry: WaitingEntry) {
        self.queue.lock().expect("waiting list mutex poisoned").push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("waiting list mutex poisoned").len()
    }

    /// Pop the two head entries and classify them, per the pairing rules:
    /// same uid reconnecting kicks the later arrival and keeps the earlier
    /// one queued; two robots never play each other.
    pub fn try_pair_heads(&self) -> Option<PairOutcome> {
        let mut queue = self.queue.lock().expect("waiting list mutex poisoned");
        if queue.len() < 2 {
            return None;
        }
        let a = queue.pop_front().unwrap();
        let b = queue.pop_front().unwrap();

        if a.uid == b.uid {
            let (earlier, later) = if a.enqueued_at <= b.enqueued_at { (a, b) } else { (b, a) };
            queue.push_front(earlier);
            drop(queue);
            later.resolve(MatchOutcome::KickOut);
            return Some(PairOutcome::SameUidKicked);
        }

        if !a.is_human(HUMAN_UID_FLOOR) && !b.is_human(HUMAN_UID_FLOOR) {
            drop(queue);
            a.resolve(MatchOutcome::KickOut);
            b.resolve(MatchOutcome::KickOut);
            return Some(PairOutcome::RobotsDropped);
        }

        Some(PairOutcome::Paired(a, b))
    }

    /// Evict a lone waiter who has been queued past [`SOLO_WAIT_TIMEOUT_SECS`].
    pub fn evict_stale_solo(&self, now: i64) {
        let mut queue = self.queue.lock().expect("waiting list mutex poisoned");
        if queue.len() != 1 {
            return;
        }
        let stale = queue
            .front()
            .map(|e| now - e.enqueued_at > SOLO_WAIT_TIMEOUT_SECS)
            .unwrap_or(false);
        if stale {
            let entry = queue.pop_front().unwrap();
            drop(queue);
            entry.resolve(MatchOutcome::WaitMatchTimeout);
        }
    }

    /// If a lone human has waited past the jittered threshold and no robot
    /// spawn is already in flight, claim the spawn slot and return the
    /// human's level/balance so the caller can spin up a robot.
    pub fn claim_robot_injection(&self, now: i64, jittered_wait_secs: i64) -> Option<(i64, f64)> {
        let queue = self.queue.lock().expect("waiting list mutex poisoned");
        if queue.len() != 1 {
            return None;
        }
        let entry = queue.front().unwrap();
        if !entry.is_human(HUMAN_UID_FLOOR) {
            return None;
        }
        if now - entry.enqueued_at <= jittered_wait_secs {
            return None;
        }
        if self
            .robot_inflight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some((self.level, entry.balance))
    }

    /// Called once the spawned robot has entered (or failed to enter) the
    /// queue, freeing the next tick to consider spawning again.
    pub fn clear_robot_inflight(&self) {
        self.robot_inflight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(uid: i64, enqueued_at: i64) -> (WaitingEntry, oneshot::Receiver<MatchOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            WaitingEntry::new(uid, format!("tok{uid}"), 100.0, "nick".into(), "fb".into(), enqueued_at, tx),
            rx,
        )
    }

    #[test]
    fn same_uid_kicks_the_later_entry() {
        let list = WaitingList::new(10);
        let (e1, _rx1) = entry(5000, 0);
        let (e2, mut rx2) = entry(5000, 5);
        list.enqueue(e1);
        list.enqueue(e2);
        match list.try_pair_heads() {
            Some(PairOutcome::SameUidKicked) => {}
            _ => panic!("expected same-uid kickout"),
        }
        assert_eq!(list.len(), 1);
        assert!(matches!(rx2.try_recv().unwrap(), MatchOutcome::KickOut));
    }

    #[test]
    fn two_robots_are_dropped() {
        let list = WaitingList::new(10);
        let (e1, mut rx1) = entry(1, 0);
        let (e2, mut rx2) = entry(2, 1);
        list.enqueue(e1);
        list.enqueue(e2);
        match list.try_pair_heads() {
            Some(PairOutcome::RobotsDropped) => {}
            _ => panic!("expected robots dropped"),
        }
        assert!(matches!(rx1.try_recv().unwrap(), MatchOutcome::KickOut));
        assert!(matches!(rx2.try_recv().unwrap(), MatchOutcome::KickOut));
    }

    #[test]
    fn distinct_humans_pair() {
        let list = WaitingList::new(10);
        let (e1, _rx1) = entry(5001, 0);
        let (e2, _rx2) = entry(5002, 1);
        list.enqueue(e1);
        list.enqueue(e2);
        match list.try_pair_heads() {
            Some(PairOutcome::Paired(a, b)) => {
                assert_eq!(a.uid, 5001);
                assert_eq!(b.uid, 5002);
            }
            _ => panic!("expected a pairing"),
        }
    }

    #[test]
    fn solo_waiter_evicted_after_timeout() {
        let list = WaitingList::new(10);
        let (e, mut rx) = entry(5001, 0);
        list.enqueue(e);
        list.evict_stale_solo(10);
        assert_eq!(list.len(), 1);
        list.evict_stale_solo(31);
        assert_eq!(list.len(), 0);
        assert!(matches!(rx.try_recv().unwrap(), MatchOutcome::WaitMatchTimeout));
    }

    #[test]
    fn robot_injection_claims_once_until_cleared() {
        let list = WaitingList::new(10);
        let (e, _rx) = entry(5001, 0);
        list.enqueue(e);
        assert!(list.claim_robot_injection(100, 50).is_some());
        assert!(list.claim_robot_injection(100, 50).is_none());
        list.clear_robot_inflight();
        assert!(list.claim_robot_injection(100, 50).is_some());
    }
}
