// src/intervals.rs

use crate::models::GenomeInterval;

/// Half of the context window placed around a variant when the caller
/// sends no interval of its own.
pub const VARIANT_HALF_WINDOW: u64 = 524_288;

/// Upper bound for any coordinate; well past the longest known chromosome.
pub const MAX_COORDINATE: u64 = 1 << 32;

/// Input lengths the AlphaGenome model accepts.
pub const SUPPORTED_SEQUENCE_LENGTHS: [u64; 5] = [2_048, 16_384, 131_072, 524_288, 1_048_576];

/// Smallest supported length that covers `length`, or the largest one.
pub fn nearest_supported_length(length: u64) -> u64 {
    SUPPORTED_SEQUENCE_LENGTHS
        .iter()
        .copied()
        .find(|&supported| length <= supported)
        .unwrap_or(SUPPORTED_SEQUENCE_LENGTHS[SUPPORTED_SEQUENCE_LENGTHS.len() - 1])
}

impl GenomeInterval {
    /// Interval of `position ± half_window`, with `start` clamped at 1.
    pub fn centered_on(chromosome: impl Into<String>, position: u64, half_window: u64) -> Self {
        let half_window = half_window.max(1);
        Self {
            chromosome: chromosome.into(),
            start: position.saturating_sub(half_window).max(1),
            end: position.saturating_add(half_window),
        }
    }

    pub fn midpoint(&self) -> u64 {
        self.start.saturating_add(self.width() / 2)
    }

    pub fn contains(&self, position: u64) -> bool {
        self.start <= position && position < self.end
    }

    /// Re-centres the interval on its midpoint with the given width.
    pub fn resize(&self, width: u64) -> Self {
        let width = width.max(1);
        let start = self.midpoint().saturating_sub(width / 2).max(1);
        Self {
            chromosome: self.chromosome.clone(),
            start,
            end: start.saturating_add(width),
        }
    }

    /// The interval resized to the model window it will be scored in.
    pub fn model_window(&self) -> Self {
        self.resize(nearest_supported_length(self.width()))
    }
}
