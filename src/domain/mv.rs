//! Moves and outcomes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ResponseCode;

/// A rock-paper-scissors move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Stone = 0,
    Paper = 1,
    Scissors = 2,
}

impl Serialize for Move {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i32::deserialize(deserializer)?;
        Move::from_i32(raw).map_err(|_| serde::de::Error::custom("invalid move"))
    }
}

impl Move {
    /// Parse a raw wire integer into a move, rejecting anything else.
    pub fn from_i32(raw: i32) -> Result<Self, ResponseCode> {
        match raw {
            0 => Ok(Move::Stone),
            1 => Ok(Move::Paper),
            2 => Ok(Move::Scissors),
            _ => Err(ResponseCode::BadOperate),
        }
    }

    /// Score `self` against `other` from `self`'s perspective.
    pub fn judge(self, other: Move) -> Outcome {
        use Move::*;
        if self == other {
            return Outcome::Draw;
        }
        match (self, other) {
            (Stone, Scissors) | (Paper, Stone) | (Scissors, Paper) => Outcome::Won,
            _ => Outcome::Lost,
        }
    }

    /// The unique move that loses to `self`.
    ///
    /// Used by the risk judge to rewrite a forced loser's recorded move so
    /// the round stays internally consistent.
    pub fn losing_move_for(self) -> Move {
        match self {
            Move::Stone => Move::Scissors,
            Move::Paper => Move::Stone,
            Move::Scissors => Move::Paper,
        }
    }
}

/// The result of a round from one competitor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Lost = 0,
    Won = 1,
    Draw = 2,
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

impl Outcome {
    /// The opponent's view of the same round.
    pub fn invert(self) -> Outcome {
        match self {
            Outcome::Won => Outcome::Lost,
            Outcome::Lost => Outcome::Won,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_moves_draw() {
        for m in [Move::Stone, Move::Paper, Move::Scissors] {
            assert_eq!(m.judge(m), Outcome::Draw);
        }
    }

    #[test]
    fn stone_beats_scissors() {
        assert_eq!(Move::Stone.judge(Move::Scissors), Outcome::Won);
        assert_eq!(Move::Scissors.judge(Move::Stone), Outcome::Lost);
    }

    #[test]
    fn paper_beats_stone() {
        assert_eq!(Move::Paper.judge(Move::Stone), Outcome::Won);
        assert_eq!(Move::Stone.judge(Move::Paper), Outcome::Lost);
    }

    #[test]
    fn scissors_beats_paper() {
        assert_eq!(Move::Scissors.judge(Move::Paper), Outcome::Won);
        assert_eq!(Move::Paper.judge(Move::Scissors), Outcome::Lost);
    }

    #[test]
    fn losing_move_is_consistent_with_judge() {
        for winner in [Move::Stone, Move::Paper, Move::Scissors] {
            let loser = winner.losing_move_for();
            assert_eq!(winner.judge(loser), Outcome::Won);
        }
    }

    #[test]
    fn outcome_invert_is_involution() {
        for o in [Outcome::Won, Outcome::Lost, Outcome::Draw] {
            assert_eq!(o.invert().invert(), o);
        }
    }

    #[test]
    fn from_i32_rejects_out_of_range() {
        assert!(Move::from_i32(3).is_err());
        assert!(Move::from_i32(-1).is_err());
        assert_eq!(Move::from_i32(1), Ok(Move::Paper));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_move() -> impl Strategy<Value = Move> {
        prop_oneof![Just(Move::Stone), Just(Move::Paper), Just(Move::Scissors)]
    }

    proptest! {
        #[test]
        fn judge_is_antisymmetric(a in arb_move(), b in arb_move()) {
            prop_assert_eq!(a.judge(b), b.judge(a).invert());
        }

        #[test]
        fn losing_move_for_always_loses(m in arb_move()) {
            let loser = m.losing_move_for();
            prop_assert_eq!(m.judge(loser), Outcome::Won);
        }
    }
}
