//! Mouse subscription and hit testing.
//!
//! Mouse capture is enabled for exactly as long as a [`MouseCapture`] lives.
//! Click handling never captures state: every press is resolved against the
//! regions recorded by the most recent draw.

use std::io::stdout;

use anyhow::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::ExecutableCommand;
use ratatui::layout::Rect;
use tracing::{debug, warn};

/// Guard that keeps terminal mouse reporting on until dropped.
#[derive(Debug)]
pub struct MouseCapture {
    _private: (),
}

impl MouseCapture {
    pub fn subscribe() -> Result<Self> {
        stdout().execute(EnableMouseCapture)?;
        debug!("mouse capture enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for MouseCapture {
    fn drop(&mut self) {
        if let Err(err) = stdout().execute(DisableMouseCapture) {
            warn!("failed to disable mouse capture: {err}");
        } else {
            debug!("mouse capture disabled");
        }
    }
}

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// A suggestion row, by index into the suggestion list.
    Suggestion(usize),
    /// Inside the dropdown but not on a row (its border, or blank space).
    SuggestionList,
    SearchButton,
    Elsewhere,
}

/// Screen regions recorded while drawing.
#[derive(Debug, Clone, Default)]
pub struct HitRegions {
    /// Whole dropdown, borders included.
    pub suggestions: Option<Rect>,
    /// Area the suggestion rows are drawn into.
    pub suggestion_rows: Option<Rect>,
    /// Index of the first visible suggestion row.
    pub suggestion_offset: usize,
    pub suggestion_count: usize,
    pub search_button: Option<Rect>,
}

impl HitRegions {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn target(&self, column: u16, row: u16) -> PointerTarget {
        if let Some(container) = self.suggestions {
            if contains(container, column, row) {
                return self
                    .suggestion_at(column, row)
                    .map(PointerTarget::Suggestion)
                    .unwrap_or(PointerTarget::SuggestionList);
            }
        }
        if self
            .search_button
            .is_some_and(|button| contains(button, column, row))
        {
            return PointerTarget::SearchButton;
        }
        PointerTarget::Elsewhere
    }

    fn suggestion_at(&self, column: u16, row: u16) -> Option<usize> {
        let rows = self.suggestion_rows?;
        if !contains(rows, column, row) {
            return None;
        }
        let index = self.suggestion_offset + usize::from(row - rows.y);
        (index < self.suggestion_count).then_some(index)
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && row >= rect.y
        && u32::from(column) < u32::from(rect.x) + u32::from(rect.width)
        && u32::from(row) < u32::from(rect.y) + u32::from(rect.height)
}
