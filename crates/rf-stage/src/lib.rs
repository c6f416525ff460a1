//! # rf-stage — Slot Round Stage System
//!
//! Defines the canonical stages a slot round passes through and a trace
//! recorder for them. Hosts never need to understand engine internals,
//! only STAGES.
//!
//! ## Philosophy
//!
//! Every round passes through the same semantic phases:
//! - Round starts → Reels spin → Reels stop → Hits processed → Round completes
//!
//! This crate defines these stages, the round state enum and the trace type.

pub mod stage;
pub mod event;
pub mod trace;

pub use stage::*;
pub use event::*;
pub use trace::*;
