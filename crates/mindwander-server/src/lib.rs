//! Mindwander server library - HTTP/WebSocket server for the shared distraction counter.
//!
//! Routes, WebSocket handling and application state live here, separate from
//! main.rs, so integration tests can build the same router.

pub mod config;
pub mod logging;
pub mod routes;
pub mod state;
pub mod websocket;
