//! Point index to maneuver step lookup
//!
//! Directions services promise contiguous, non-overlapping step ranges that cover
//! the whole geometry. The index is built once per playback and resolves upstream
//! inconsistencies deterministically:
//!
//! - **Overlap**: the earliest step in list order owns a shared index.
//! - **Gap**: an index no step covers maps to `None`.
//! - **Out of range**: `end` is clamped to the last point; a step starting past
//!   the end, or with `start > end`, is dropped.

use crate::ManeuverStep;
use std::ops::Range;

/// Lookup table from geometry point index to step position
#[derive(Clone, Debug, Default)]
pub struct StepIndex {
    by_point: Vec<Option<usize>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl StepIndex {
    /// Build the table for a geometry of `len` points
    pub fn build(steps: &[ManeuverStep], len: usize) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("step_index::build");

        let mut by_point = vec![None; len];
        let mut overlapping = 0usize;

        for (position, step) in steps.iter().enumerate() {
            let [start, end] = step.point_range;
            if start > end || start >= len {
                tracing::warn!(
                    "Ignoring step {} ({:?}): range [{}, {}] does not fit a {}-point route",
                    position + 1,
                    step.instruction,
                    start,
                    end,
                    len
                );
                continue;
            }

            let end = end.min(len - 1);
            for slot in &mut by_point[start..=end] {
                match slot {
                    None => *slot = Some(position),
                    Some(_) => overlapping += 1,
                }
            }
        }

        if overlapping > 0 {
            tracing::debug!(
                "{} point(s) claimed by more than one step; earliest step wins",
                overlapping
            );
        }

        Self { by_point }
    }

    /// Position (0-based, in the step list) of the step covering `index`
    #[inline]
    pub fn step_at(&self, index: usize) -> Option<usize> {
        self.by_point.get(index).copied().flatten()
    }

    /// Number of points the table was built for
    #[inline]
    pub fn len(&self) -> usize {
        self.by_point.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_point.is_empty()
    }

    /// Ranges of point indices not covered by any step
    pub fn gaps(&self) -> Vec<Range<usize>> {
        let mut gaps = Vec::new();
        let mut open: Option<usize> = None;

        for (index, slot) in self.by_point.iter().enumerate() {
            match (slot, open) {
                (None, None) => open = Some(index),
                (Some(_), Some(start)) => {
                    gaps.push(start..index);
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            gaps.push(start..self.by_point.len());
        }

        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(start: usize, end: usize) -> ManeuverStep {
        ManeuverStep::new(format!("step {start}-{end}"), 10.0, [start, end])
    }

    #[test]
    fn test_contiguous_steps() {
        let index = StepIndex::build(&[step(0, 1), step(2, 2)], 3);

        assert_eq!(index.len(), 3);
        assert_eq!(index.step_at(0), Some(0));
        assert_eq!(index.step_at(1), Some(0));
        assert_eq!(index.step_at(2), Some(1));
        assert_eq!(index.step_at(3), None);
        assert!(index.gaps().is_empty());
    }

    #[test]
    fn test_overlap_first_step_wins() {
        let index = StepIndex::build(&[step(0, 3), step(2, 5)], 6);

        assert_eq!(index.step_at(2), Some(0));
        assert_eq!(index.step_at(3), Some(0));
        assert_eq!(index.step_at(4), Some(1));
        assert_eq!(index.step_at(5), Some(1));
    }

    #[test]
    fn test_gaps_are_reported() {
        let index = StepIndex::build(&[step(1, 2), step(5, 6)], 9);

        assert_eq!(index.step_at(0), None);
        assert_eq!(index.step_at(3), None);
        assert_eq!(index.gaps(), vec![0..1, 3..5, 7..9]);
    }

    #[test]
    fn test_end_is_clamped() {
        let index = StepIndex::build(&[step(0, 1), step(2, 99)], 4);

        assert_eq!(index.step_at(3), Some(1));
        assert!(index.gaps().is_empty());
    }

    #[test]
    fn test_invalid_ranges_are_dropped() {
        let steps = vec![
            ManeuverStep::new("backwards", 1.0, [3, 1]),
            step(10, 12),
            step(0, 4),
        ];
        let index = StepIndex::build(&steps, 5);

        for i in 0..5 {
            assert_eq!(index.step_at(i), Some(2));
        }
    }

    #[test]
    fn test_no_steps() {
        let index = StepIndex::build(&[], 3);
        assert_eq!(index.step_at(0), None);
        assert_eq!(index.gaps(), vec![0..3]);
    }
}
