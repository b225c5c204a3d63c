//! The orchestrator: owns the waiting lists and active sessions, exposes the
//! public matchmaking operations, and runs the background ticks.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::{new_guid, Clock, RandomSource};
use crate::domain::{
    Competitor, CompetitorStatus, JudgedRound, MatchOutcome, MatchSession, Move, Outcome, PairOutcome, ReadyOutcome,
    WaitingEntry, WaitingList, HUMAN_UID_FLOOR,
};
use crate::errors::MatchmakerError;
use crate::risk::{RiskController, RobotSeat};
use crate::robot::{RobotManager, RobotRoster};
use crate::services::{AccountService, RankingRow, Store};
use crate::statistics::StatisticsManager;

/// One competitor's view returned from the matchmaker's public operations.
#[derive(Debug, Clone)]
pub struct CompetitorView {
    pub access_token: String,
    pub balance: f64,
    pub nickname: String,
    pub avatar: String,
}

/// Result of a successful `Match` call.
#[derive(Debug, Clone)]
pub struct MatchResponse {
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub match_id: String,
    pub round: i64,
    pub timeout_second: i64,
    pub competitors: [CompetitorView; 2],
}

/// Result of a successful `Ready` call.
#[derive(Debug, Clone)]
pub struct ReadyResponse {
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub round: i64,
    pub results: Vec<crate::domain::CompetitorRoundResult>,
}

/// Synthetic per-room online numbers, ordered the same as `Config::levels`.
#[derive(Debug, Clone)]
pub struct OnlineNumberResponse {
    pub number: i64,
    pub rooms: Vec<(i64, i64)>,
}

pub struct Matchmaker {
    config: Arc<Config>,
    waiting_lists: HashMap<i64, Arc<WaitingList>>,
    sessions: RwLock<HashMap<String, Arc<MatchSession>>>,
    accounts: Arc<dyn AccountService>,
    store: Arc<dyn Store>,
    statistics: Arc<StatisticsManager>,
    risk: Arc<RiskController>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    roster: RobotRoster,
    robot_manager: OnceLock<Arc<RobotManager>>,
}

impl Matchmaker {
    pub fn new(
        config: Arc<Config>,
        accounts: Arc<dyn AccountService>,
        store: Arc<dyn Store>,
        statistics: Arc<StatisticsManager>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        let waiting_lists = config
            .levels
            .iter()
            .map(|&level| (level, Arc::new(WaitingList::new(level))))
            .collect();
        let roster = RobotRoster::new(config.robot_avatars.clone(), config.robot_nicknames.clone());
        Self {
            risk: Arc::new(RiskController::new(store.clone())),
            config,
            waiting_lists,
            sessions: RwLock::new(HashMap::new()),
            accounts,
            store,
            statistics,
            clock,
            rng,
            roster,
            robot_manager: OnceLock::new(),
        }
    }

    /// Wire in the robot manager after construction (it needs an `Arc` back
    /// to this matchmaker, so it can't be built before this one exists).
    pub fn attach_robot_manager(&self, robot_manager: Arc<RobotManager>) {
        let _ = self.robot_manager.set(robot_manager);
    }

    fn waiting_list(&self, level: i64) -> Result<&Arc<WaitingList>, MatchmakerError> {
        self.waiting_lists.get(&level).ok_or(MatchmakerError::BadLevel(level))
    }

    pub fn clear_robot_inflight(&self, level: i64) {
        if let Some(list) = self.waiting_lists.get(&level) {
            list.clear_robot_inflight();
        }
    }

    /// Block until this request is paired, evicted, or kicked.
    pub async fn match_request(self: Arc<Self>, level: i64, access_token: String) -> Result<MatchResponse, MatchmakerError> {
        if !self.config.is_known_level(level) {
            return Err(MatchmakerError::BadLevel(level));
        }
        let list = self.waiting_list(level)?.clone();

        let user = self.accounts.describe_user(&access_token).await?;
        if user.balance < level as f64 {
            return Err(MatchmakerError::InsufficientBalance);
        }

        let (tx, rx) = oneshot::channel();
        let now = self.clock.now_secs();
        let entry = WaitingEntry::new(user.uid, access_token, user.balance, user.nickname, user.fb_open_id, now, tx);
        list.enqueue(entry);

        match rx.await {
            Ok(MatchOutcome::Paired(paired)) => Ok(MatchResponse {
                server_timestamp: paired.server_timestamp,
                expire_timestamp: paired.expire_timestamp,
                match_id: paired.match_id,
                round: paired.round,
                timeout_second: paired.timeout_second,
                competitors: [
                    CompetitorView {
                        access_token: paired.own_access_token,
                        balance: paired.own_balance,
                        nickname: paired.own_nickname,
                        avatar: paired.own_avatar,
                    },
                    CompetitorView {
                        access_token: String::new(),
                        balance: paired.opponent_balance,
                        nickname: paired.opponent_nickname,
                        avatar: paired.opponent_avatar,
                    },
                ],
            }),
            Ok(MatchOutcome::KickOut) => Err(MatchmakerError::KickOut),
            Ok(MatchOutcome::WaitMatchTimeout) => Err(MatchmakerError::WaitMatchTimeout),
            Err(_) => Err(MatchmakerError::WaitMatchTimeout),
        }
    }

    pub async fn ready(&self, match_id: String, round: i64, access_token: String, operate: Move) -> Result<ReadyResponse, MatchmakerError> {
        let session = {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            sessions.get(&match_id).cloned()
        }
        .ok_or(MatchmakerError::BadMatchId)?;

        if session.is_disposed() {
            return Err(MatchmakerError::BadMatchId);
        }

        session.validate_round(session.round().await, round)?;

        let competitor = session.find(&access_token).ok_or(crate::errors::SessionError::BadAccessToken)?;
        competitor.touch_keep_alive(self.clock.now_secs());
        if competitor.balance() < session.level as f64 {
            return Err(MatchmakerError::InsufficientBalance);
        }

        let (tx, rx) = oneshot::channel();
        if !competitor.try_become_ready(operate, tx) {
            return Err(crate::errors::SessionError::BadReadyStatus.into());
        }

        if let Some(_guard) = session.begin_resolution().await {
            self.resolve_round(&session).await;
        }

        match rx.await {
            Ok(ReadyOutcome::Resolved(result)) => Ok(ReadyResponse {
                server_timestamp: result.server_timestamp,
                expire_timestamp: result.expire_timestamp,
                round: result.round,
                results: result.results,
            }),
            Ok(ReadyOutcome::Timeout) | Err(_) => Err(crate::errors::SessionError::Disposed.into()),
        }
    }

    pub async fn ready_status(&self, match_id: &str, access_token: &str) -> Result<CompetitorStatus, MatchmakerError> {
        let session = {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            sessions.get(match_id).cloned()
        }
        .ok_or(MatchmakerError::BadMatchId)?;

        if let Some(c) = session.find(access_token) {
            c.touch_keep_alive(self.clock.now_secs());
        }
        Ok(session
            .opponent_of(access_token)
            .map(|c| c.status())
            .unwrap_or(CompetitorStatus::Disposed))
    }

    pub async fn leave(&self, match_id: String, access_token: String) -> Result<(), MatchmakerError> {
        let session = {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            sessions.get(&match_id).cloned()
        };
        if let Some(session) = session {
            if let Some(c) = session.find(&access_token) {
                c.zero_keep_alive();
            }
        }
        Ok(())
    }

    pub async fn ranking(&self) -> Result<Vec<RankingRow>, MatchmakerError> {
        let mut rows = self
            .store
            .top_ranking(10)
            .await
            .map_err(|e| MatchmakerError::Session(crate::errors::SessionError::TransferFailed(e.to_string())))?;

        let now = self.clock.now_secs();
        for filler in self.config.fake_ranking.iter().take(10usize.saturating_sub(rows.len())) {
            rows.push(RankingRow {
                uid: 0,
                avatar: filler.avatar.clone(),
                win_amount: filler.win_amount,
                nickname: filler.nickname.clone(),
                time_updated: now,
            });
        }
        // Preserved from the original implementation: the display sort is
        // ascending by win_amount, not descending.
        rows.sort_by(|a, b| a.win_amount.partial_cmp(&b.win_amount).unwrap());
        Ok(rows)
    }

    pub fn online_number(&self) -> OnlineNumberResponse {
        let now = self.clock.now_secs();
        let hour = ((now / 3600) % 24) as usize;
        let base = *self.config.base_online_numbers.get(hour).unwrap_or(&0);
        let active: i64 = self.sessions.read().expect("sessions lock poisoned").len() as i64;
        let total = base + active;

        let fractions = [(1i64, 0.55), (10, 0.35), (100, 0.08)];
        let mut rooms = Vec::new();
        let mut allocated = 0i64;
        for (level, fraction) in fractions {
            if self.config.is_known_level(level) {
                let n = (total as f64 * fraction) as i64;
                allocated += n;
                rooms.push((level, n));
            }
        }
        if self.config.is_known_level(500) {
            rooms.push((500, (total - allocated).max(0)));
        }

        OnlineNumberResponse { number: total, rooms }
    }

    async fn resolve_round(&self, session: &Arc<MatchSession>) {
        let level = session.level;
        let a = &session.competitors[0];
        let b = &session.competitors[1];
        let move_a = a.operate().expect("competitor ready without operate");
        let move_b = b.operate().expect("competitor ready without operate");

        let human_a = a.is_human(self.config.max_robot_uid);
        let human_b = b.is_human(self.config.max_robot_uid);

        let (outcome_a, recorded_a, recorded_b) = if human_a && human_b {
            (move_a.judge(move_b), move_a, move_b)
        } else if !human_a {
            let verdict = self.risk.judge_robot_round(level, RobotSeat::A, move_a, move_b).await;
            (verdict.outcome_a, verdict.recorded_move_a, verdict.recorded_move_b)
        } else {
            let verdict = self.risk.judge_robot_round(level, RobotSeat::B, move_a, move_b).await;
            (verdict.outcome_a, verdict.recorded_move_a, verdict.recorded_move_b)
        };

        let now_millis = self.clock.now_millis();

        if outcome_a == Outcome::Draw {
            let judged = JudgedRound {
                outcome_a,
                win_a: 0.0,
                win_b: 0.0,
                operate_a: recorded_a,
                operate_b: recorded_b,
                transfer_failed: false,
            };
            session.commit_round(now_millis, judged).await;
            return;
        }

        let cost = self.config.cost_for_level(level);
        let (winner, loser) = if outcome_a == Outcome::Won { (a, b) } else { (b, a) };

        let transfer = self
            .accounts
            .transfer(crate::services::TransferRequest {
                from_uid: loser.uid,
                from_access_token: loser.access_token.clone(),
                to_uid: winner.uid,
                to_access_token: winner.access_token.clone(),
                amount: level as f64,
                from_cost: 0.0,
                to_cost: cost,
            })
            .await;

        let transfer_failed = transfer.is_err();
        if let Err(err) = &transfer {
            warn!(match_id = %session.match_id, error = %err, "transfer failed, round still advances");
        }

        let (win_a, win_b) = if transfer_failed {
            (0.0, 0.0)
        } else if outcome_a == Outcome::Won {
            (level as f64 - cost, -(level as f64))
        } else {
            (-(level as f64), level as f64 - cost)
        };

        let now_secs = self.clock.now_secs();
        self.statistics.submit(RankingRow {
            uid: a.uid,
            avatar: a.avatar.clone(),
            win_amount: win_a,
            nickname: a.nickname.clone(),
            time_updated: now_secs,
        });
        self.statistics.submit(RankingRow {
            uid: b.uid,
            avatar: b.avatar.clone(),
            win_amount: win_b,
            nickname: b.nickname.clone(),
            time_updated: now_secs,
        });

        let judged = JudgedRound {
            outcome_a,
            win_a,
            win_b,
            operate_a: recorded_a,
            operate_b: recorded_b,
            transfer_failed,
        };
        session.commit_round(now_millis, judged).await;
    }

    /// Pair waiters, evict stale solo entries, and inject robots. Intended to
    /// be driven by a 1s interval from the server's background task set.
    pub async fn match_tick(&self) {
        let now = self.clock.now_secs();
        for (&level, list) in &self.waiting_lists {
            loop {
                match list.try_pair_heads() {
                    Some(PairOutcome::Paired(a, b)) => self.form_session(level, a, b, now).await,
                    Some(_) => continue,
                    None => break,
                }
            }
            list.evict_stale_solo(now);

            let jittered_wait = (self.config.match_wait_second - self.rng.uniform_range(0, 6)).max(0);
            if let Some((level, balance)) = list.claim_robot_injection(now, jittered_wait) {
                if let Some(robot_manager) = self.robot_manager.get() {
                    robot_manager.spawn(level, balance);
                } else {
                    list.clear_robot_inflight();
                }
            }
        }
    }

    async fn form_session(&self, level: i64, a: WaitingEntry, b: WaitingEntry, now: i64) {
        let match_id = new_guid();
        let timeout_second = self.config.operate_timeout_second;
        let server_timestamp = now * 1000;
        let expire_timestamp = server_timestamp + timeout_second * 1000;

        let (a_nickname, a_avatar) = if a.is_human(HUMAN_UID_FLOOR) {
            (a.nickname.clone(), String::new())
        } else {
            let (avatar, nickname) = self.roster.next_identity();
            (nickname, avatar)
        };
        let (b_nickname, b_avatar) = if b.is_human(HUMAN_UID_FLOOR) {
            (b.nickname.clone(), String::new())
        } else {
            let (avatar, nickname) = self.roster.next_identity();
            (nickname, avatar)
        };

        let competitor_a = Competitor::new(a.uid, a.access_token.clone(), a_nickname.clone(), a_avatar.clone(), a.balance, now);
        let competitor_b = Competitor::new(b.uid, b.access_token.clone(), b_nickname.clone(), b_avatar.clone(), b.balance, now);
        let session = Arc::new(MatchSession::new(match_id.clone(), level, timeout_second, [competitor_a, competitor_b]));

        {
            let mut sessions = self.sessions.write().expect("sessions lock poisoned");
            if sessions.contains_key(&match_id) {
                drop(sessions);
                a.resolve(MatchOutcome::KickOut);
                b.resolve(MatchOutcome::KickOut);
                return;
            }
            sessions.insert(match_id.clone(), session);
        }

        info!(match_id = %match_id, level, "match formed");

        let a_balance = a.balance;
        let b_balance = b.balance;
        let a_access_token = a.access_token.clone();
        let b_access_token = b.access_token.clone();

        a.resolve(MatchOutcome::Paired(crate::domain::PairedMatch {
            match_id: match_id.clone(),
            level,
            round: 0,
            server_timestamp,
            expire_timestamp,
            timeout_second,
            own_access_token: a_access_token,
            own_balance: a_balance,
            own_nickname: a_nickname.clone(),
            own_avatar: a_avatar.clone(),
            opponent_nickname: b_nickname.clone(),
            opponent_avatar: b_avatar.clone(),
            opponent_balance: b_balance,
        }));
        b.resolve(MatchOutcome::Paired(crate::domain::PairedMatch {
            match_id,
            level,
            round: 0,
            server_timestamp,
            expire_timestamp,
            timeout_second,
            own_access_token: b_access_token,
            own_balance: b_balance,
            own_nickname: b_nickname,
            own_avatar: b_avatar,
            opponent_nickname: a_nickname,
            opponent_avatar: a_avatar,
            opponent_balance: a_balance,
        }));
    }

    /// Dispose sessions whose keep-alive has gone stale. Intended to be
    /// driven by a 1s interval from the server's background task set.
    pub async fn clean_tick(&self) {
        let now = self.clock.now_secs();
        let stale: Vec<String> = {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            sessions
                .iter()
                .filter(|(_, s)| s.is_stale(now))
                .map(|(id, _)| id.clone())
                .collect()
        };
        if stale.is_empty() {
            return;
        }
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        for id in stale {
            if let Some(session) = sessions.remove(&id) {
                session.dispose();
            }
        }
    }

    pub async fn run_ticks(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            self.match_tick().await;
            self.clean_tick().await;
        }
    }
}
