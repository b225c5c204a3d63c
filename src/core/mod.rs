//! Small ambient primitives shared across the matchmaking server.

pub mod clock;
pub mod guid;
pub mod rng;

pub use clock::{Clock, SystemClock, TestClock};
pub use guid::new_guid;
pub use rng::{RandomSource, SharedRng};
