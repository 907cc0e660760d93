//! Data models for the OKR tracker.
//!
//! Field names serialize as camelCase to match the web client.

mod invitation;
mod okr;
mod pagination;
mod review;
mod team;
mod user;

pub use invitation::*;
pub use okr::*;
pub use pagination::*;
pub use review::*;
pub use team::*;
pub use user::*;
