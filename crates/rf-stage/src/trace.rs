//! StageTrace — A complete sequence of stage events for a slot session
//!
//! A trace captures the full timeline of one or more rounds.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::StageEvent;
use crate::stage::{Stage, StageCategory};

/// A complete trace of stage events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Unique identifier for this trace
    pub trace_id: String,

    /// Slot identifier (e.g., "classic_5x3")
    pub game_id: String,

    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// Events in chronological order, oldest dropped first when bounded
    pub events: VecDeque<StageEvent>,

    /// Maximum events kept; `None` keeps everything, `Some(0)` records nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_events: Option<usize>,

    /// Events discarded to honor `max_events`
    #[serde(default)]
    pub dropped_events: u64,

    /// When this trace was recorded
    pub recorded_at: DateTime<Utc>,

    /// Custom metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageTrace {
    /// Create a new empty trace
    pub fn new(trace_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            game_id: game_id.into(),
            session_id: None,
            events: VecDeque::new(),
            max_events: None,
            dropped_events: 0,
            recorded_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: StageEvent) {
        self.events.push_back(event);
        self.trim();
    }

    /// Bound the trace
    pub fn with_max_events(mut self, max_events: Option<usize>) -> Self {
        self.set_max_events(max_events);
        self
    }

    /// Change the bound, dropping the oldest events beyond it
    pub fn set_max_events(&mut self, max_events: Option<usize>) {
        self.max_events = max_events;
        self.trim();
    }

    fn trim(&mut self) {
        let Some(max) = self.max_events else {
            return;
        };
        while self.events.len() > max {
            self.events.pop_front();
            self.dropped_events += 1;
        }
    }

    /// Oldest events were discarded
    pub fn is_truncated(&self) -> bool {
        self.dropped_events > 0
    }

    /// Set session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all recorded events, keeping identity and metadata
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Ticks between the first and last event
    pub fn duration_ticks(&self) -> u64 {
        match (self.events.front(), self.events.back()) {
            (Some(first), Some(last)) => last.tick.saturating_sub(first.tick),
            _ => 0,
        }
    }

    /// Get events by category
    pub fn events_by_category(&self, category: StageCategory) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.category() == category)
            .collect()
    }

    /// Get events by stage type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    /// Find first event matching a predicate
    pub fn find_event<F>(&self, predicate: F) -> Option<&StageEvent>
    where
        F: Fn(&StageEvent) -> bool,
    {
        self.events.iter().find(|e| predicate(e))
    }

    /// Check if trace contains a specific stage type
    pub fn has_stage(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.stage.type_name() == type_name)
    }

    /// Get all reel stop events
    pub fn reel_stops(&self) -> Vec<&StageEvent> {
        self.events_by_type("reel_stop")
    }

    /// Type names in recorded order, without the verbose per-symbol stages
    pub fn stage_sequence(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .filter(|e| !e.stage.is_verbose())
            .map(|e| e.type_name())
            .collect()
    }

    /// Sum of all processed hit payouts
    pub fn total_payout(&self) -> u64 {
        self.events
            .iter()
            .filter_map(|e| match &e.stage {
                Stage::HitProcessed { payout, .. } => Some(*payout),
                _ => None,
            })
            .sum()
    }

    /// Number of completed rounds in the trace
    pub fn rounds_completed(&self) -> usize {
        self.events_by_type("round_complete").len()
    }

    /// Validate trace has required stages
    pub fn validate(&self) -> TraceValidation {
        let starts = self.events_by_type("round_start").len();
        let completes = self.rounds_completed();
        let first_start = self.events.iter().position(|e| e.type_name() == "round_start");
        // A truncated trace may open with the tail of a round
        let skip = if self.is_truncated() { first_start.unwrap_or(0) } else { 0 };
        let first_complete = self
            .events
            .iter()
            .skip(skip)
            .position(|e| e.type_name() == "round_complete")
            .map(|p| p + skip);

        TraceValidation {
            has_round_start: starts > 0,
            has_round_complete: completes > 0,
            reel_stop_count: self.reel_stops().len(),
            has_round_interval: self.has_stage("round_interval"),
            ordered: match (first_start, first_complete) {
                (Some(s), Some(c)) => s < c,
                (None, Some(_)) => false,
                _ => true,
            },
            unmatched_starts: starts.saturating_sub(completes),
        }
    }

    /// Get summary of trace
    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.trace_id.clone(),
            game_id: self.game_id.clone(),
            event_count: self.events.len(),
            duration_ticks: self.duration_ticks(),
            rounds_completed: self.rounds_completed(),
            hit_count: self.events_by_type("hit_processed").len(),
            total_payout: self.total_payout(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Validation result for a trace
#[derive(Debug, Clone, Default)]
pub struct TraceValidation {
    pub has_round_start: bool,
    pub has_round_complete: bool,
    pub has_round_interval: bool,
    pub reel_stop_count: usize,
    /// First round start precedes first round completion
    pub ordered: bool,
    /// Round starts without a matching completion (0 or 1 in a healthy trace)
    pub unmatched_starts: usize,
}

impl TraceValidation {
    /// Check if trace is valid (has all required elements)
    pub fn is_valid(&self) -> bool {
        self.has_round_start
            && self.has_round_complete
            && self.has_round_interval
            && self.ordered
            && self.unmatched_starts <= 1
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();

        if !self.has_round_start {
            warnings.push("Missing ROUND_START event");
        }
        if !self.has_round_complete {
            warnings.push("Missing ROUND_COMPLETE event");
        }
        if !self.has_round_interval {
            warnings.push("Missing ROUND_INTERVAL event");
        }
        if self.reel_stop_count == 0 {
            warnings.push("No reel stop events");
        }
        if !self.ordered {
            warnings.push("Round completed before it started");
        }
        if self.unmatched_starts > 1 {
            warnings.push("Multiple rounds started without completing");
        }

        warnings
    }
}

/// Summary of a trace for quick overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub game_id: String,
    pub event_count: usize,
    pub duration_ticks: u64,
    pub rounds_completed: usize,
    pub hit_count: usize,
    pub total_payout: u64,
}
