//! Outbound account lookups and balance transfers.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{new_guid, RandomSource};
use crate::errors::AccountError;

/// A resolved user profile.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub uid: i64,
    pub fb_open_id: String,
    pub nickname: String,
    pub balance: f64,
}

/// A one-sided balance move; `from` pays `amount + from_cost`, `to` receives
/// `amount - to_cost`.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_uid: i64,
    pub from_access_token: String,
    pub to_uid: i64,
    pub to_access_token: String,
    pub amount: f64,
    pub from_cost: f64,
    pub to_cost: f64,
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub from_balance: f64,
    pub to_balance: f64,
}

/// Outbound account operations: resolving a token to a profile, moving
/// balances between two tokens, and minting/retiring robot sessions.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn describe_user(&self, access_token: &str) -> Result<UserInfo, AccountError>;
    async fn transfer(&self, request: TransferRequest) -> Result<TransferResult, AccountError>;
    async fn login_ai(&self, uid: i64, balance: f64, level: i64, rng: &dyn RandomSource) -> Result<String, AccountError>;
    async fn logout_ai(&self, access_token: &str) -> Result<(), AccountError>;
}

/// A robot's synthesized fake balance, tracked purely in-process.
struct RobotSession {
    access_token: String,
    balance: f64,
}

/// Shared in-process robot-session bookkeeping used by both the fake and the
/// real account service (robots never touch the real account backend).
#[derive(Default)]
struct RobotSessions {
    idle: VecDeque<RobotSession>,
    active: HashMap<String, RobotSession>,
}

fn synthesize_login_balance(requested_balance: f64, level: i64, rng: &dyn RandomSource) -> f64 {
    let factor = 1.0 + (rng.uniform_range(0, 10) + 1) as f64 / 11.0;
    let base = requested_balance.max(level as f64);
    let mut balance = 0.0;
    while balance < level as f64 {
        balance = if rng.uniform_range(0, 4) >= 2 {
            (base * factor) as u64 as f64
        } else {
            (base / factor) as u64 as f64
        };
    }
    balance
}

fn robot_login(sessions: &Mutex<RobotSessions>, uid: i64, balance: f64, level: i64, rng: &dyn RandomSource) -> String {
    let mut guard = sessions.lock().expect("robot sessions mutex poisoned");
    let mut session = guard.idle.pop_front().unwrap_or_else(|| RobotSession {
        access_token: new_guid(),
        balance: 0.0,
    });
    session.balance = synthesize_login_balance(balance, level, rng);
    let token = session.access_token.clone();
    guard.active.insert(token.clone(), session);
    debug!(uid, access_token = %token, "robot logged in");
    token
}

fn robot_logout(sessions: &Mutex<RobotSessions>, access_token: &str) -> Result<(), AccountError> {
    let mut guard = sessions.lock().expect("robot sessions mutex poisoned");
    match guard.active.remove(access_token) {
        Some(session) => {
            guard.idle.push_back(session);
            Ok(())
        }
        None => Err(AccountError::BadAccessToken),
    }
}

/// Account service backed by the real HTTP account backend, with robot
/// sessions served entirely in-process (LoginAI/LogoutAI never hit the wire,
/// mirroring the original implementation).
pub struct HttpAccountService {
    client: reqwest::Client,
    endpoint_describe_user: String,
    endpoint_transfer: String,
    robot_uid: i64,
    robot_fb_open_id: String,
    sessions: Mutex<RobotSessions>,
}

impl HttpAccountService {
    pub fn new(endpoint_describe_user: String, endpoint_transfer: String, robot_uid: i64, robot_fb_open_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint_describe_user,
            endpoint_transfer,
            robot_uid,
            robot_fb_open_id,
            sessions: Mutex::new(RobotSessions::default()),
        }
    }

    fn robot_balance(&self, access_token: &str) -> Option<f64> {
        self.sessions
            .lock()
            .expect("robot sessions mutex poisoned")
            .active
            .get(access_token)
            .map(|s| s.balance)
    }

    fn adjust_robot_balance(&self, access_token: &str, delta: f64) -> Option<f64> {
        let mut guard = self.sessions.lock().expect("robot sessions mutex poisoned");
        guard.active.get_mut(access_token).map(|s| {
            s.balance += delta;
            s.balance
        })
    }
}

#[derive(Serialize)]
struct DescribeUserWire<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct DescribeUserWireResponse {
    code: i32,
    data: DescribeUserWireData,
}

#[derive(Deserialize)]
struct DescribeUserWireData {
    uid: i64,
    fb_open_id: String,
    nickname: String,
    balance: f64,
}

#[derive(Serialize)]
struct TransferWire {
    from_uid: i64,
    to_uid: i64,
    amount: f64,
    from_cost: f64,
    to_cost: f64,
}

#[derive(Deserialize)]
struct TransferWireResponse {
    code: i32,
    data: TransferWireData,
}

#[derive(Deserialize)]
struct TransferWireData {
    from_balance: f64,
    to_balance: f64,
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn describe_user(&self, access_token: &str) -> Result<UserInfo, AccountError> {
        if let Some(balance) = self.robot_balance(access_token) {
            return Ok(UserInfo {
                uid: self.robot_uid,
                fb_open_id: self.robot_fb_open_id.clone(),
                nickname: String::new(),
                balance,
            });
        }

        let wire: DescribeUserWireResponse = self
            .client
            .post(&self.endpoint_describe_user)
            .json(&DescribeUserWire { access_token })
            .send()
            .await
            .map_err(|e| AccountError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| AccountError::Transport(e.to_string()))?;

        if wire.code != 0 {
            return Err(AccountError::RemoteError(wire.code));
        }

        Ok(UserInfo {
            uid: wire.data.uid,
            fb_open_id: wire.data.fb_open_id,
            nickname: wire.data.nickname,
            balance: wire.data.balance,
        })
    }

    async fn transfer(&self, request: TransferRequest) -> Result<TransferResult, AccountError> {
        let wire: TransferWireResponse = self
            .client
            .post(&self.endpoint_transfer)
            .json(&TransferWire {
                from_uid: request.from_uid,
                to_uid: request.to_uid,
                amount: request.amount,
                from_cost: request.from_cost,
                to_cost: request.to_cost,
            })
            .send()
            .await
            .map_err(|e| AccountError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| AccountError::Transport(e.to_string()))?;

        if wire.code != 0 {
            return Err(AccountError::RemoteError(wire.code));
        }

        let from_balance = self
            .adjust_robot_balance(&request.from_access_token, -(request.amount + request.from_cost))
            .unwrap_or(wire.data.from_balance);
        let to_balance = self
            .adjust_robot_balance(&request.to_access_token, request.amount - request.to_cost)
            .unwrap_or(wire.data.to_balance);

        Ok(TransferResult { from_balance, to_balance })
    }

    async fn login_ai(&self, uid: i64, balance: f64, level: i64, rng: &dyn RandomSource) -> Result<String, AccountError> {
        Ok(robot_login(&self.sessions, uid, balance, level, rng))
    }

    async fn logout_ai(&self, access_token: &str) -> Result<(), AccountError> {
        robot_logout(&self.sessions, access_token)
    }
}

/// Account service with no real backend at all: every describe/transfer is
/// served from the in-process robot-session table. Used for tests and for
/// standalone robot-only demos.
#[derive(Default)]
pub struct FakeAccountService {
    sessions: Mutex<RobotSessions>,
    robot_uid: i64,
}

impl FakeAccountService {
    pub fn new(robot_uid: i64) -> Self {
        Self {
            sessions: Mutex::new(RobotSessions::default()),
            robot_uid,
        }
    }
}

#[async_trait]
impl AccountService for FakeAccountService {
    async fn describe_user(&self, access_token: &str) -> Result<UserInfo, AccountError> {
        let guard = self.sessions.lock().expect("robot sessions mutex poisoned");
        let session = guard.active.get(access_token).ok_or(AccountError::BadAccessToken)?;
        Ok(UserInfo {
            uid: self.robot_uid,
            fb_open_id: String::new(),
            nickname: String::new(),
            balance: session.balance,
        })
    }

    async fn transfer(&self, request: TransferRequest) -> Result<TransferResult, AccountError> {
        let mut guard = self.sessions.lock().expect("robot sessions mutex poisoned");
        let from_balance = guard
            .active
            .get_mut(&request.from_access_token)
            .map(|s| {
                s.balance -= request.amount + request.from_cost;
                s.balance
            })
            .unwrap_or(0.0);
        let to_balance = guard
            .active
            .get_mut(&request.to_access_token)
            .map(|s| {
                s.balance += request.amount - request.to_cost;
                s.balance
            })
            .unwrap_or(0.0);
        Ok(TransferResult { from_balance, to_balance })
    }

    async fn login_ai(&self, uid: i64, balance: f64, level: i64, rng: &dyn RandomSource) -> Result<String, AccountError> {
        Ok(robot_login(&self.sessions, uid, balance, level, rng))
    }

    async fn logout_ai(&self, access_token: &str) -> Result<(), AccountError> {
        robot_logout(&self.sessions, access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SharedRng;

    #[test]
    fn synthesized_balance_meets_level() {
        let rng = SharedRng::from_seed(3);
        for level in [1, 10, 100, 500] {
            let balance = synthesize_login_balance(5.0, level, &rng);
            assert!(balance >= level as f64);
        }
    }

    #[tokio::test]
    async fn login_then_logout_recycles_session() {
        let service = FakeAccountService::new(1999);
        let rng = SharedRng::from_seed(1);
        let token = service.login_ai(1999, 50.0, 10, &rng).await.unwrap();
        assert!(service.describe_user(&token).await.is_ok());
        service.logout_ai(&token).await.unwrap();
        assert!(service.describe_user(&token).await.is_err());
    }

    #[tokio::test]
    async fn logout_unknown_token_fails() {
        let service = FakeAccountService::new(1999);
        assert!(matches!(
            service.logout_ai("nonexistent").await,
            Err(AccountError::BadAccessToken)
        ));
    }
}
