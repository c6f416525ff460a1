//! Paylines and the line set
//!
//! A line is a starting row plus a list of row deltas applied reel by reel.
//! Resolved paths are absolute holder rows (hidden top rows included).

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};

/// What happens when a line's delta list is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Continue flat (a single 0 delta)
    Stay,
    /// Repeat the last delta
    #[default]
    Continue,
    /// Restart from the first delta
    Loop,
    /// Walk the delta list backwards, then forwards again
    PingPong,
}

/// Parse a comma-separated delta list such as `"1,-1"`
pub fn parse_path(input: &str) -> SlotResult<Vec<i32>> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(SlotError::MalformedPath {
            input: input.to_string(),
            reason: "empty".into(),
        });
    }

    trimmed
        .split(',')
        .map(|token| {
            token.trim().parse::<i32>().map_err(|e| SlotError::MalformedPath {
                input: input.to_string(),
                reason: format!("'{}': {}", token.trim(), e),
            })
        })
        .collect()
}

/// A payline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Evaluation priority (ascending)
    pub order: i32,
    /// Starting visible row on the first reel
    row: usize,
    /// Row deltas between consecutive reels
    path: Vec<i32>,
    loop_mode: LoopMode,
    pub enabled: bool,
    /// (reel count, hidden top rows) the paths were resolved for
    #[serde(skip)]
    resolved_for: Option<(usize, usize)>,
    #[serde(skip)]
    paths: Vec<isize>,
}

impl Line {
    pub fn new(order: i32, row: usize, path: Vec<i32>, loop_mode: LoopMode) -> Self {
        let path = if path.is_empty() { vec![0] } else { path };
        Self {
            order,
            row,
            path,
            loop_mode,
            enabled: false,
            resolved_for: None,
            paths: Vec::new(),
        }
    }

    /// Straight line across `row`
    pub fn straight(order: i32, row: usize) -> Self {
        Self::new(order, row, vec![0], LoopMode::Stay)
    }

    /// Create a line from a delta string
    pub fn parse(order: i32, row: usize, path: &str, loop_mode: LoopMode) -> SlotResult<Self> {
        Ok(Self::new(order, row, parse_path(path)?, loop_mode))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn path(&self) -> &[i32] {
        &self.path
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_row(&mut self, row: usize) {
        self.row = row;
        self.refresh();
    }

    pub fn set_path(&mut self, path: Vec<i32>) {
        self.path = if path.is_empty() { vec![0] } else { path };
        self.refresh();
    }

    pub fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
        self.refresh();
    }

    /// One delta per reel, the loop policy applied on exhaustion
    pub fn deltas(&self, reel_count: usize) -> Vec<i32> {
        let mut list = self.path.clone();
        let mut x = 0;
        let mut out = Vec::with_capacity(reel_count);

        for _ in 0..reel_count {
            if x >= list.len() {
                match self.loop_mode {
                    LoopMode::Stay => {
                        list = vec![0];
                        x = 0;
                    }
                    LoopMode::Continue => x = list.len() - 1,
                    LoopMode::Loop => x = 0,
                    LoopMode::PingPong => {
                        list.reverse();
                        x = 0;
                    }
                }
            }
            out.push(list[x]);
            x += 1;
        }
        out
    }

    /// Absolute holder row per reel
    pub fn resolve_path(&self, reel_count: usize, hidden_top: usize) -> Vec<isize> {
        let mut current = (self.row + hidden_top) as isize;
        self.deltas(reel_count)
            .into_iter()
            .map(|delta| {
                let row = current;
                current += delta as isize;
                row
            })
            .collect()
    }

    /// Resolve and cache paths for a reel layout
    pub fn resolve(&mut self, reel_count: usize, hidden_top: usize) {
        self.resolved_for = Some((reel_count, hidden_top));
        self.refresh();
    }

    fn refresh(&mut self) {
        if let Some((reel_count, hidden_top)) = self.resolved_for {
            self.paths = self.resolve_path(reel_count, hidden_top);
        }
    }

    /// Cached absolute rows (empty until resolved)
    pub fn paths(&self) -> &[isize] {
        &self.paths
    }
}

/// Result of a successful line switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineToggle {
    pub index: usize,
    pub order: i32,
    pub enabled: bool,
    pub active_lines: usize,
}

/// All lines of a slot, sorted by order
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    lines: Vec<Line>,
    /// Lines enabled from the front, as toggled through this set
    current_index: usize,
    first_line_always_active: bool,
    always_max_lines: bool,
}

impl LineSet {
    /// Build a set; lines are stably sorted by order
    pub fn new(mut lines: Vec<Line>, first_line_always_active: bool) -> Self {
        lines.sort_by_key(|l| l.order);
        let current_index = lines.iter().take_while(|l| l.enabled).count();
        Self {
            lines,
            current_index,
            first_line_always_active,
            always_max_lines: false,
        }
    }

    /// Every path through a `rows × reel_count` grid, one line per path
    pub fn ways(rows: usize, reel_count: usize) -> Vec<Line> {
        let rows = rows.max(1);
        let columns = reel_count.saturating_sub(1);
        let max_path = rows.pow(columns as u32);
        let mut lines = Vec::with_capacity(rows * max_path);

        for row in 0..rows {
            for i in 0..max_path {
                let targets: Vec<usize> = (0..columns).map(|col| i / rows.pow(col as u32) % rows).collect();
                let mut previous = row;
                let path: Vec<i32> = targets
                    .iter()
                    .map(|&target| {
                        let delta = target as i32 - previous as i32;
                        previous = target;
                        delta
                    })
                    .collect();
                lines.push(
                    Line::new((i + row * max_path) as i32, row, path, LoopMode::Stay).with_enabled(true),
                );
            }
        }
        lines
    }

    pub fn set_always_max_lines(&mut self, always_max_lines: bool) {
        self.always_max_lines = always_max_lines;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Resolve every line for a reel layout
    pub fn resolve(&mut self, reel_count: usize, hidden_top: usize) {
        for line in &mut self.lines {
            line.resolve(reel_count, hidden_top);
        }
    }

    pub fn active_lines(&self) -> usize {
        self.current_index
    }

    /// Lines currently enabled
    pub fn enabled_count(&self) -> usize {
        self.lines.iter().filter(|l| l.enabled).count()
    }

    /// Switch one line. `allowed` carries the caller's state/lock gate.
    ///
    /// Returns `None` when the line could not be changed.
    pub fn switch_line(&mut self, index: usize, enable: bool, allowed: bool) -> Option<LineToggle> {
        let mut enable = enable || self.always_max_lines;
        if index >= self.lines.len() || !allowed {
            return None;
        }
        if self.first_line_always_active && index == 0 {
            if self.lines[0].enabled {
                return None;
            }
            enable = true;
        }

        self.lines[index].enabled = enable;
        self.current_index = index + usize::from(enable);
        log::debug!("Line {} {}", index, if enable { "enabled" } else { "disabled" });

        Some(LineToggle {
            index,
            order: self.lines[index].order,
            enabled: enable,
            active_lines: self.current_index,
        })
    }

    pub fn enable_next_line(&mut self, allowed: bool) -> Option<LineToggle> {
        self.switch_line(self.current_index, true, allowed)
    }

    pub fn disable_current_line(&mut self, allowed: bool) -> Option<LineToggle> {
        let index = self.current_index.checked_sub(1)?;
        self.switch_line(index, false, allowed)
    }

    /// Switch every line, returning the toggles that took effect
    pub fn switch_all_lines(&mut self, enable: bool, allowed: bool) -> Vec<LineToggle> {
        let indices: Vec<usize> = if enable {
            (0..self.lines.len()).collect()
        } else {
            (0..self.lines.len()).rev().collect()
        };
        let toggles: Vec<LineToggle> = indices
            .into_iter()
            .filter_map(|i| self.switch_line(i, enable, allowed))
            .collect();

        if allowed {
            self.current_index = if enable || self.always_max_lines {
                self.lines.len()
            } else if self.first_line_always_active {
                1.min(self.lines.len())
            } else {
                0
            };
        }
        toggles
    }
}
