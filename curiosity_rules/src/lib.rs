//! # Curiosity Rules
//!
//! The data crate of the curiosity engine: the four curiosity variants, their
//! lifecycle states, and the tunable numeric rules that govern decay and
//! cascades. This crate holds no event or storage logic.

pub mod config;
pub mod entities;
pub mod lifecycle;

pub use config::*;
pub use entities::*;
pub use lifecycle::*;
