//! The closed response-code taxonomy returned to clients, plus the internal
//! error enums that map onto it.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Wire-level response code. Negative values are failures; zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok = 0,
    WaitReadyTimeout = -1,
    WaitMatchTimeout = -2,
    BadMatchStatus = -3,
    BadAccessToken = -4,
    BadReadyStatus = -5,
    BadAccountStatus = -6,
    BadRequestFormat = -7,
    BadOperate = -8,
    BadMatchId = -9,
    BadRound = -10,
    BadLevel = -11,
    InternalError = -12,
    InsufficientBalance = -13,
    KickOut = -14,
}

impl ResponseCode {
    /// Human-readable description, mirroring the original `getCodeDescription`.
    pub fn description(self) -> &'static str {
        match self {
            ResponseCode::Ok => "ok",
            ResponseCode::WaitReadyTimeout => "wait ready timeout",
            ResponseCode::WaitMatchTimeout => "wait match timeout",
            ResponseCode::BadMatchStatus => "bad match status",
            ResponseCode::BadAccessToken => "bad access token",
            ResponseCode::BadReadyStatus => "bad ready status",
            ResponseCode::BadAccountStatus => "bad account status",
            ResponseCode::BadRequestFormat => "bad request format",
            ResponseCode::BadOperate => "bad operate",
            ResponseCode::BadMatchId => "bad match id",
            ResponseCode::BadRound => "bad round",
            ResponseCode::BadLevel => "bad level",
            ResponseCode::InternalError => "internal error",
            ResponseCode::InsufficientBalance => "insufficient balance",
            ResponseCode::KickOut => "kick out",
        }
    }

    /// Raw wire value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors raised while resolving a round inside a [`crate::domain::session::MatchSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("bad round: expected {expected}, got {got}")]
    BadRound { expected: i64, got: i64 },
    #[error("bad access token")]
    BadAccessToken,
    #[error("bad ready status")]
    BadReadyStatus,
    #[error("session disposed")]
    Disposed,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl From<&SessionError> for ResponseCode {
    fn from(e: &SessionError) -> Self {
        match e {
            SessionError::BadRound { .. } => ResponseCode::BadRound,
            SessionError::BadAccessToken => ResponseCode::BadAccessToken,
            SessionError::BadReadyStatus => ResponseCode::BadReadyStatus,
            SessionError::Disposed => ResponseCode::BadMatchId,
            SessionError::InsufficientBalance => ResponseCode::InsufficientBalance,
            SessionError::TransferFailed(_) => ResponseCode::InternalError,
        }
    }
}

/// Errors raised by the matchmaker's public operations.
#[derive(Debug, Error)]
pub enum MatchmakerError {
    #[error("bad level: {0}")]
    BadLevel(i64),
    #[error("bad match id")]
    BadMatchId,
    #[error("bad operate")]
    BadOperate,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("account lookup failed: {0}")]
    AccountLookupFailed(#[from] AccountError),
    #[error("wait match timeout")]
    WaitMatchTimeout,
    #[error("kicked out of queue")]
    KickOut,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<&MatchmakerError> for ResponseCode {
    fn from(e: &MatchmakerError) -> Self {
        match e {
            MatchmakerError::BadLevel(_) => ResponseCode::BadLevel,
            MatchmakerError::BadMatchId => ResponseCode::BadMatchId,
            MatchmakerError::BadOperate => ResponseCode::BadOperate,
            MatchmakerError::InsufficientBalance => ResponseCode::InsufficientBalance,
            MatchmakerError::AccountLookupFailed(_) => ResponseCode::InternalError,
            MatchmakerError::WaitMatchTimeout => ResponseCode::WaitMatchTimeout,
            MatchmakerError::KickOut => ResponseCode::KickOut,
            MatchmakerError::Session(inner) => inner.into(),
        }
    }
}

/// Errors raised talking to the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("operation failed: {0}")]
    Operation(String),
}

/// Errors raised talking to the account service.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("bad access token")]
    BadAccessToken,
    #[error("remote returned non-ok: code={0}")]
    RemoteError(i32),
}
