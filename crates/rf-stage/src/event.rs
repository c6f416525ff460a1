//! StageEvent — A stage occurrence with metadata
//!
//! Wraps a Stage with the engine tick it happened on and routing tags.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event with full metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Engine tick the stage occurred on (counted from slot initialization)
    pub tick: u64,

    /// Name of the mode that was current when the stage occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Custom tags for filtering/routing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StageEvent {
    pub fn new(stage: Stage, tick: u64) -> Self {
        Self {
            stage,
            tick,
            mode: None,
            tags: Vec::new(),
        }
    }

    /// Attach the current mode name
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }
}
