//! Types shared by every Birdcall crate: the error enum,
//! tool and conversation types, configuration, and structured trace events.

pub mod config;
pub mod error;
pub mod tool;
pub mod trace;
