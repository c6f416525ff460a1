//! # rf-slot-engine — Tick-Driven Slot Round Engine
//!
//! Runs slot rounds frame by frame: reels accelerate, spin and stop,
//! hits are evaluated line by line and paid out one per tick, and every
//! asynchronous step (reel starts, animations, delays) flows through a
//! single FIFO event queue that suspends game logic while it runs.
//!
//! ## Features
//!
//! - **Symbols & Lines**: Parsed pay tables, wild/scatter matching, looping line paths
//! - **Hit Evaluation**: Chain walk with optional alternative-line (ways) dedup
//! - **Modes**: Default / FreeSpin / Bonus with per-mode strips, timing and cost
//! - **Generator**: Weighted strips with minimum counts and multi-row validation
//! - **Simulator**: Monte-Carlo RTP and hit statistics on the same evaluator
//! - **Stages**: Every round emits `rf_stage` events into a trace
//!
//! ## Architecture
//!
//! ```text
//! SlotDefinition (JSON / YAML)
//!     │
//!     v
//! Slot ── tick() ──┬── Reel × N (accelerate → spin → stop)
//!     │            ├── EventQueue (FIFO, locks state logic)
//!     │            └── RoundHits (one hit per tick)
//!     │
//!     ├── ModeManager (strip variants)
//!     ├── GameInfo (balance, credits)
//!     └── SlotServices (animation, render, persistence, observers)
//!           │
//!           v
//!     StageTrace
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod generator;
pub mod hit;
pub mod ledger;
pub mod line;
pub mod mode;
pub mod paytable;
pub mod reel;
pub mod services;
pub mod simulator;
pub mod slot;
pub mod symbols;
pub mod timing;

pub use config::*;
pub use error::*;
pub use event::*;
pub use generator::*;
pub use hit::*;
pub use ledger::*;
pub use line::*;
pub use mode::*;
pub use paytable::*;
pub use reel::*;
pub use services::*;
pub use simulator::*;
pub use slot::*;
pub use symbols::*;
pub use timing::*;
