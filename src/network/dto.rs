//! Wire request/response shapes for the HTTP surface, and the envelope that
//! wraps every response.

use serde::{Deserialize, Serialize};

use crate::domain::{CompetitorRoundResult, Move};
use crate::errors::ResponseCode;
use crate::matchmaker::{CompetitorView, MatchResponse, OnlineNumberResponse, ReadyResponse};
use crate::services::RankingRow;

/// `{code, msg, data}` — every endpoint's response is wrapped in this shape.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: ResponseCode,
    pub msg: String,
    pub data: T,
}

impl<T: Serialize + Default> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ResponseCode::Ok,
            msg: ResponseCode::Ok.description().to_string(),
            data,
        }
    }

    pub fn err(code: ResponseCode) -> Self {
        Self {
            code,
            msg: code.description().to_string(),
            data: T::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub level: i64,
    pub access_token: String,
}

#[derive(Debug, Default, Serialize)]
pub struct MatchResponseData {
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub match_id: String,
    pub round: i64,
    pub timeout_second: i64,
    pub competitors: Vec<CompetitorWire>,
}

#[derive(Debug, Default, Serialize)]
pub struct CompetitorWire {
    pub access_token: String,
    pub balance: f64,
    pub nickname: String,
    pub avatar: String,
}

impl From<CompetitorView> for CompetitorWire {
    fn from(v: CompetitorView) -> Self {
        Self {
            access_token: v.access_token,
            balance: v.balance,
            nickname: v.nickname,
            avatar: v.avatar,
        }
    }
}

impl From<MatchResponse> for MatchResponseData {
    fn from(r: MatchResponse) -> Self {
        let [a, b] = r.competitors;
        Self {
            server_timestamp: r.server_timestamp,
            expire_timestamp: r.expire_timestamp,
            match_id: r.match_id,
            round: r.round,
            timeout_second: r.timeout_second,
            competitors: vec![a.into(), b.into()],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub operate: i32,
    pub match_id: String,
    pub round: i64,
    pub access_token: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ReadyResponseData {
    pub server_timestamp: i64,
    pub expire_timestamp: i64,
    pub round: i64,
    pub results: Vec<ResultWire>,
}

#[derive(Debug, Serialize)]
pub struct ResultWire {
    pub access_token: String,
    pub operate: Move,
    pub status: crate::domain::Outcome,
    pub balance: f64,
    pub win: f64,
}

impl From<CompetitorRoundResult> for ResultWire {
    fn from(r: CompetitorRoundResult) -> Self {
        Self {
            access_token: r.access_token,
            operate: r.operate,
            status: r.status,
            balance: r.balance,
            win: r.win,
        }
    }
}

impl From<ReadyResponse> for ReadyResponseData {
    fn from(r: ReadyResponse) -> Self {
        Self {
            server_timestamp: r.server_timestamp,
            expire_timestamp: r.expire_timestamp,
            round: r.round,
            results: r.results.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadyStatusRequest {
    pub access_token: String,
    pub match_id: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ReadyStatusResponseData {
    pub status: i32,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub access_token: String,
    pub match_id: String,
}

#[derive(Debug, Default, Serialize)]
pub struct LeaveResponseData {}

#[derive(Debug, Deserialize)]
pub struct RankingRequest {
    pub access_token: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RankingResponseData {
    pub results: Vec<RankingRowWire>,
}

#[derive(Debug, Serialize)]
pub struct RankingRowWire {
    pub avatar: String,
    pub win_amount: f64,
    pub nickname: String,
    pub time_updated: i64,
}

impl From<RankingRow> for RankingRowWire {
    fn from(r: RankingRow) -> Self {
        Self {
            avatar: r.avatar,
            win_amount: r.win_amount,
            nickname: r.nickname,
            time_updated: r.time_updated,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OnlineNumberRequest {}

#[derive(Debug, Default, Serialize)]
pub struct OnlineNumberResponseData {
    pub number: i64,
    pub rooms: Vec<RoomWire>,
}

#[derive(Debug, Serialize)]
pub struct RoomWire {
    pub level: i64,
    pub number: i64,
}

impl From<OnlineNumberResponse> for OnlineNumberResponseData {
    fn from(r: OnlineNumberResponse) -> Self {
        Self {
            number: r.number,
            rooms: r.rooms.into_iter().map(|(level, number)| RoomWire { level, number }).collect(),
        }
    }
}
