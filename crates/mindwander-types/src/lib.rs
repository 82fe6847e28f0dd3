//! Shared types for the Mindwander counter.

mod session;
mod statistics;
mod ws;

pub use session::*;
pub use statistics::*;
pub use ws::*;
