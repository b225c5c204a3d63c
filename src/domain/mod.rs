//! Core game domain: moves, competitors, waiting lists, and match sessions.

pub mod competitor;
pub mod mv;
pub mod session;
pub mod waiting;

pub use competitor::{Competitor, CompetitorStatus, ReadyOutcome};
pub use mv::{Move, Outcome};
pub use session::{CompetitorRoundResult, JudgedRound, MatchSession, RoundResult, SessionStatus};
pub use waiting::{MatchOutcome, PairOutcome, PairedMatch, WaitingEntry, WaitingList, HUMAN_UID_FLOOR};
