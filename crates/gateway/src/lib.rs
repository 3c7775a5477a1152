//! The `birdcall` binary's library half: HTTP API, startup wiring, CLI
//! commands and the client-side orchestration runtime.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
