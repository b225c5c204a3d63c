//! Outbound service boundaries: the account backend and the document store.

pub mod account;
pub mod store;

pub use account::{AccountService, FakeAccountService, HttpAccountService, TransferRequest, TransferResult, UserInfo};
pub use store::{MemoryStore, MongoStore, RankingRow, Store};
