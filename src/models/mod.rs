//! Data models for the studio board.
//!
//! These models match the frontend TypeScript types so the same JSON flows
//! through the backend handlers and the client stores.

mod board;
mod hierarchy;

pub use board::*;
pub use hierarchy::*;
