//! # Curiosity Core
//!
//! The engine half of the curiosity system. This crate keeps a child's
//! curiosities in a lookup store, erodes their pull over time, propagates
//! belief changes through related curiosities, and records every change as an
//! immutable, reasoned event that can be traced and replayed.
//!
//! ## Core Components
//!
//! - **store**: Focus-indexed curiosity store with lineage tracing and snapshots
//! - **decay**: Time-based pull erosion and dormancy
//! - **cascade**: Side-effects of confirmations, refutations, dissolutions and contradictions
//! - **events**: Event types, the append-only log trait, its backends, and the recorder
//! - **session**: One child's store wired to the machinery above
//!
//! ## Design Philosophy
//!
//! - **Explainable**: No change without a reasoning string; cascades keep their cause
//! - **Append-Only**: Events are never rewritten, only linked to their side-effects
//! - **Data-Driven**: Every rate and threshold comes from `curiosity_rules` config

pub mod cascade;
pub mod decay;
pub mod error;
pub mod events;
pub mod session;
pub mod store;

pub use cascade::{CascadeHandler, CascadeResult, Provenance};
pub use decay::{DecayEngine, DecayEntry, DecayReport};
pub use error::*;
pub use events::*;
pub use session::{CascadeOutcome, CuriositySession, DecayTick};
pub use store::*;
