//! Window command implementation - split intervals into fixed-size windows.

use crate::bed::{BedError, Result};
use crate::interval::BedRecord;
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;

/// Window command configuration.
#[derive(Debug, Clone)]
pub struct WindowCommand {
    /// Window size in bases
    pub window_size: i64,
    /// Distance between window starts (defaults to the window size)
    pub step: Option<i64>,
}

impl WindowCommand {
    pub fn new(window_size: i64) -> Self {
        Self {
            window_size,
            step: None,
        }
    }

    /// Sliding windows: a step smaller than the size makes them overlap.
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    fn checked_sizes(&self) -> Result<(u64, u64)> {
        let step = self.step.unwrap_or(self.window_size);
        if self.window_size <= 0 {
            return Err(BedError::InvalidArgument(format!(
                "window size must be positive, got {}",
                self.window_size
            )));
        }
        if step <= 0 {
            return Err(BedError::InvalidArgument(format!(
                "window step must be positive, got {}",
                step
            )));
        }
        Ok((self.window_size as u64, step as u64))
    }

    /// Windows in parent order, then window id.
    ///
    /// Each window keeps its parent's attributes and strand and adds
    /// `.parent_id` (1-based position of the parent in the set) and
    /// `.win_id` (1-based within the parent). The last window of a parent
    /// may be shorter.
    pub fn windows(&self, set: &IntervalSet) -> Result<Vec<BedRecord>> {
        let (size, step) = self.checked_sizes()?;
        let mut out = Vec::new();

        for (parent_idx, parent) in set.records().iter().enumerate() {
            let mut start = parent.start();
            let mut win_id: u64 = 1;
            while start < parent.end() {
                let end = start.saturating_add(size).min(parent.end());
                let mut window = parent.clone();
                window.interval.start = start;
                window.interval.end = end;
                window.attrs.insert(".parent_id", parent_idx as u64 + 1);
                window.attrs.insert(".win_id", win_id);
                out.push(window);

                if end >= parent.end() {
                    break;
                }
                start = start.saturating_add(step);
                win_id += 1;
            }
        }

        info!("makewindows: {} intervals -> {} windows", set.len(), out.len());
        Ok(out)
    }

    /// The same windows as an [`IntervalSet`] grouped like the input.
    pub fn make_windows(&self, set: &IntervalSet) -> Result<IntervalSet> {
        let windows = self.windows(set)?;
        IntervalSet::from_records(windows, set.group_keys(), &SetOptions::default())
    }
}
