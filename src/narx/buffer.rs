//! Delay buffers: the lag queue of past (output, input) pairs and the
//! prediction history.
//!
//! The lag queue is a fixed-capacity ring of `order` blocks. Each block is
//! `[output (signal_len) | input (input_len)]`. Pushing a pair overwrites the
//! oldest block and makes it the newest, so no element is ever moved. The
//! assembled feature vector is read out newest first:
//!
//! ```text
//! [O_{k-1}, U_{k-1}, O_{k-2}, U_{k-2}, ..., O_{k-N}, U_{k-N}]
//! ```

use serde::Serialize;

use super::normalizer::RunningMean;
use crate::config::NarxConfig;

/// Sizes and offsets of the delay-buffer regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferLayout {
    pub signal_len: usize,
    pub input_len: usize,
    pub order: usize,
    /// Width of the output part of a block as fed to the network.
    pub output_block_len: usize,
    /// Width of the input part of a block as fed to the network.
    pub input_block_len: usize,
    /// Offset of the output part inside a block.
    pub output_offset: usize,
    /// Offset of the input part inside a block.
    pub input_offset: usize,
    /// `signal_len`
    pub output_buffer_len: usize,
    /// `(signal_len + input_len) * order`
    pub input_buffer_len: usize,
}

impl BufferLayout {
    pub fn new(signal_len: usize, input_len: usize, order: usize) -> Self {
        Self {
            signal_len,
            input_len,
            order,
            output_block_len: signal_len,
            input_block_len: input_len,
            output_offset: 0,
            input_offset: signal_len,
            output_buffer_len: signal_len,
            input_buffer_len: (signal_len + input_len) * order,
        }
    }

    pub fn from_config(config: &NarxConfig) -> Self {
        Self::new(config.signal_len, config.input_len, config.order)
    }

    /// Width of one (output, input) block.
    pub fn block_len(&self) -> usize {
        self.output_block_len + self.input_block_len
    }
}

/// Ring buffer holding the most recent `order` centered (output, input) pairs.
#[derive(Debug, Clone)]
pub struct DelayBuffer {
    layout: BufferLayout,
    storage: Vec<f64>,
    /// Slot holding the newest pair.
    head: usize,
    /// Pairs pushed so far, saturating at `order`.
    filled: usize,
}

impl DelayBuffer {
    /// Zero-state buffer: every lag slot holds zeros.
    pub fn new(layout: BufferLayout) -> Self {
        Self {
            storage: vec![0.0; layout.input_buffer_len],
            layout,
            head: 0,
            filled: 0,
        }
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// Number of pushed pairs still in the queue (at most `order`).
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// True once `order` pairs have been pushed.
    pub fn is_full(&self) -> bool {
        self.filled == self.layout.order
    }

    fn slot_range(&self, lag: usize) -> std::ops::Range<usize> {
        let slot = (self.head + lag) % self.layout.order;
        let start = slot * self.layout.block_len();
        start..start + self.layout.block_len()
    }

    /// Push a new pair to the front, centering both parts with the running
    /// means. The oldest pair is evicted.
    ///
    /// Widths must match the layout; the model checks this before calling.
    pub fn shift(
        &mut self,
        output: &[f64],
        input: &[f64],
        output_mean: &RunningMean,
        input_mean: &RunningMean,
    ) {
        debug_assert_eq!(output.len(), self.layout.output_block_len);
        debug_assert_eq!(input.len(), self.layout.input_block_len);

        let order = self.layout.order;
        self.head = (self.head + order - 1) % order;
        self.filled = (self.filled + 1).min(order);

        let range = self.slot_range(0);
        let block = &mut self.storage[range];
        let (out_part, in_part) = block.split_at_mut(self.layout.input_offset);
        output_mean.center_into(output, out_part);
        input_mean.center_into(input, in_part);
    }

    /// The pair at `lag` (0 = newest) as `(output, input)` slices.
    /// Returns `None` for `lag >= order`.
    pub fn pair(&self, lag: usize) -> Option<(&[f64], &[f64])> {
        if lag >= self.layout.order {
            return None;
        }
        let block = &self.storage[self.slot_range(lag)];
        Some(block.split_at(self.layout.input_offset))
    }

    /// Write the lag-ordered feature vector (newest first) into `out`.
    pub fn assemble_into(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.layout.input_buffer_len);
        let block_len = self.layout.block_len();
        for (lag, chunk) in out.chunks_exact_mut(block_len).enumerate() {
            chunk.copy_from_slice(&self.storage[self.slot_range(lag)]);
        }
    }

    /// The lag-ordered feature vector (newest first).
    pub fn features(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.layout.input_buffer_len];
        self.assemble_into(&mut out);
        out
    }

    /// Back to the zero state.
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
        self.head = 0;
        self.filled = 0;
    }
}

/// Current and previous prediction, and their elementwise difference.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputHistory {
    current: Vec<f64>,
    prev: Vec<f64>,
    diff: Vec<f64>,
}

impl OutputHistory {
    pub fn new(len: usize) -> Self {
        Self {
            current: vec![0.0; len],
            prev: vec![0.0; len],
            diff: vec![0.0; len],
        }
    }

    /// `prev <- current`, `current <- prediction`, `diff <- current - prev`.
    pub fn record(&mut self, prediction: &[f64]) {
        debug_assert_eq!(prediction.len(), self.current.len());
        std::mem::swap(&mut self.prev, &mut self.current);
        self.current.copy_from_slice(prediction);
        for ((d, c), p) in self.diff.iter_mut().zip(&self.current).zip(&self.prev) {
            *d = c - p;
        }
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn prev(&self) -> &[f64] {
        &self.prev
    }

    pub fn diff(&self) -> &[f64] {
        &self.diff
    }

    pub fn clear(&mut self) {
        self.current.fill(0.0);
        self.prev.fill(0.0);
        self.diff.fill(0.0);
    }
}
