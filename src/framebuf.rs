//! Double-buffered planar frame surfaces.
//!
//! The protocol transmits sparse changes, never whole frames, so image
//! state must persist across packets and across frames. [`FrameStore`]
//! owns two buffers: a *back* buffer that accumulates the current
//! frame's runs, and a *front* snapshot published to consumers on each
//! frame-end swap. Fronts are shared as `Arc<FrameBuffer>`, so a
//! renderer can hold a frame for as long as it likes without ever
//! observing a partially-updated surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PixelwireError, Result};
use crate::wire::{Channel, FRAME_HEIGHT, FRAME_WIDTH, PixelRun};

/// Plane dimensions for a decoding session.
///
/// `width` and `height` describe the luma plane; chroma planes are
/// half-height (4:2:0-style vertical subsampling, full horizontal
/// resolution on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Luma plane width in pixels.
    pub width: usize,
    /// Luma plane height in pixels.
    pub height: usize,
}

impl FrameGeometry {
    /// Geometry with explicit luma dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Width of the given channel's plane.
    pub fn plane_width(&self, _channel: Channel) -> usize {
        self.width
    }

    /// Height of the given channel's plane.
    pub fn plane_height(&self, channel: Channel) -> usize {
        match channel {
            Channel::Luma => self.height,
            Channel::ChromaU | Channel::ChromaV => self.height / 2,
        }
    }
}

impl Default for FrameGeometry {
    /// Native sensor geometry, 512x384.
    fn default() -> Self {
        Self { width: FRAME_WIDTH, height: FRAME_HEIGHT }
    }
}

/// One three-plane 8-bit image surface.
///
/// Plane storage is row-major, one `Vec<u8>` per channel. Mutation goes
/// through [`FrameStore`]; consumers only ever see immutable snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    geometry: FrameGeometry,
    planes: [Vec<u8>; 3],
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for the given geometry.
    pub fn new(geometry: FrameGeometry) -> Self {
        let planes = Channel::ALL
            .map(|ch| vec![0u8; geometry.plane_width(ch) * geometry.plane_height(ch)]);
        Self { geometry, planes }
    }

    /// The geometry this buffer was allocated for.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Raw row-major pixel data of one plane.
    pub fn plane(&self, channel: Channel) -> &[u8] {
        &self.planes[channel.index()]
    }

    /// One row of one plane.
    ///
    /// # Panics
    ///
    /// Panics if `row` is outside the plane. Decoded runs are bounds
    /// checked before they reach the buffer; this accessor is for
    /// consumers that already know the geometry.
    pub fn row(&self, channel: Channel, row: usize) -> &[u8] {
        let width = self.geometry.plane_width(channel);
        &self.planes[channel.index()][row * width..(row + 1) * width]
    }

    fn fill(&mut self, run: &PixelRun) {
        let width = self.geometry.plane_width(run.channel);
        let start = run.row as usize * width + run.start_col as usize;
        self.planes[run.channel.index()][start..start + run.length as usize].fill(run.value);
    }
}

/// Owner of the front/back buffer pair.
///
/// The back buffer is the only mutable surface and only
/// [`apply_run`](Self::apply_run) writes to it.
/// [`swap_and_reset`](Self::swap_and_reset) publishes the accumulated
/// frame as the new front; pixels never touched by a run carry over
/// from frame to frame, matching the change-only nature of the
/// protocol.
#[derive(Debug)]
pub struct FrameStore {
    front: Arc<FrameBuffer>,
    back: FrameBuffer,
    frames: u64,
}

impl FrameStore {
    /// Create a store with zeroed front and back buffers.
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            front: Arc::new(FrameBuffer::new(geometry)),
            back: FrameBuffer::new(geometry),
            frames: 0,
        }
    }

    /// The most recently completed frame.
    pub fn front(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.front)
    }

    /// Number of completed frames since session start.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Write a run into the back buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PixelwireError::OutOfBounds`] when the run's row is
    /// outside its plane or the run would overflow the row. The buffer
    /// is untouched on failure. An out-of-bounds run that passed the id
    /// check is strong evidence of undetected framing corruption, so
    /// callers are expected to enter resync on this error.
    pub fn apply_run(&mut self, run: &PixelRun) -> Result<()> {
        let geometry = self.back.geometry;
        let width = geometry.plane_width(run.channel);
        let height = geometry.plane_height(run.channel);
        let end_col = run.start_col as u32 + run.length as u32;
        if run.row as usize >= height || end_col as usize > width {
            return Err(PixelwireError::OutOfBounds {
                channel: run.channel,
                row: run.row,
                start_col: run.start_col,
                end_col,
                width,
                height,
            });
        }
        self.back.fill(run);
        Ok(())
    }

    /// Publish the back buffer as the new front.
    ///
    /// The back buffer keeps the completed frame's contents as the
    /// starting point for the next frame; untouched regions persist
    /// until a run overwrites them. Returns the new front snapshot.
    pub fn swap_and_reset(&mut self) -> Arc<FrameBuffer> {
        self.front = Arc::new(self.back.clone());
        self.frames += 1;
        debug!(frame = self.frames, "frame complete, buffers swapped");
        Arc::clone(&self.front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn run(channel: Channel, row: u16, start_col: u16, length: u16, value: u8) -> PixelRun {
        PixelRun { channel, row, start_col, length, value }
    }

    #[test]
    fn geometry_subsamples_chroma_vertically_only() {
        let g = FrameGeometry::default();
        assert_eq!(g.plane_width(Channel::Luma), 512);
        assert_eq!(g.plane_height(Channel::Luma), 384);
        assert_eq!(g.plane_width(Channel::ChromaU), 512);
        assert_eq!(g.plane_height(Channel::ChromaU), 192);
        assert_eq!(g.plane_height(Channel::ChromaV), 192);
    }

    #[test]
    fn apply_run_writes_only_the_requested_span() {
        let mut store = FrameStore::new(FrameGeometry::new(16, 8));
        store.apply_run(&run(Channel::Luma, 3, 4, 5, 99)).unwrap();
        let front = store.swap_and_reset();
        let row3 = front.row(Channel::Luma, 3);
        assert_eq!(&row3[4..9], &[99; 5]);
        assert_eq!(&row3[..4], &[0; 4]);
        assert_eq!(&row3[9..], &[0; 7]);
        assert_eq!(front.row(Channel::Luma, 2), &[0; 16]);
    }

    #[test]
    fn run_ending_exactly_at_plane_edge_is_accepted() {
        let mut store = FrameStore::new(FrameGeometry::new(16, 8));
        assert!(store.apply_run(&run(Channel::Luma, 0, 6, 10, 1)).is_ok());
        let err = store.apply_run(&run(Channel::Luma, 0, 7, 10, 1)).unwrap_err();
        assert!(matches!(err, PixelwireError::OutOfBounds { .. }));
    }

    #[test]
    fn max_length_run_fits_a_wide_plane() {
        // 4095 is the largest encodable run length.
        let mut store = FrameStore::new(FrameGeometry::new(4095, 2));
        assert!(store.apply_run(&run(Channel::Luma, 0, 0, 4095, 7)).is_ok());
    }

    #[test]
    fn chroma_rows_beyond_half_height_are_rejected() {
        let mut store = FrameStore::new(FrameGeometry::default());
        assert!(store.apply_run(&run(Channel::ChromaV, 191, 0, 1, 1)).is_ok());
        let err = store.apply_run(&run(Channel::ChromaV, 192, 0, 1, 1)).unwrap_err();
        assert!(matches!(err, PixelwireError::OutOfBounds { row: 192, .. }));
    }

    #[test]
    fn failed_apply_leaves_buffer_untouched() {
        let mut store = FrameStore::new(FrameGeometry::new(8, 4));
        store.apply_run(&run(Channel::Luma, 1, 0, 8, 42)).unwrap();
        assert!(store.apply_run(&run(Channel::Luma, 1, 4, 8, 99)).is_err());
        let front = store.swap_and_reset();
        assert_eq!(front.row(Channel::Luma, 1), &[42; 8]);
    }

    #[test]
    fn untouched_pixels_persist_across_swaps() {
        let mut store = FrameStore::new(FrameGeometry::new(8, 4));
        store.apply_run(&run(Channel::Luma, 0, 0, 8, 10)).unwrap();
        let first = store.swap_and_reset();

        // No runs between swaps: the next front is identical.
        let second = store.swap_and_reset();
        assert_eq!(*first, *second);
        assert_eq!(store.frame_count(), 2);

        // A later run only replaces the pixels it names.
        store.apply_run(&run(Channel::Luma, 0, 2, 2, 20)).unwrap();
        let third = store.swap_and_reset();
        assert_eq!(third.row(Channel::Luma, 0), &[10, 10, 20, 20, 10, 10, 10, 10]);
    }

    #[test]
    fn published_front_is_immutable_while_back_mutates() {
        let mut store = FrameStore::new(FrameGeometry::new(8, 4));
        store.apply_run(&run(Channel::ChromaU, 0, 0, 4, 5)).unwrap();
        let front = store.swap_and_reset();
        store.apply_run(&run(Channel::ChromaU, 0, 0, 4, 200)).unwrap();
        // The held snapshot still shows the earlier frame.
        assert_eq!(&front.row(Channel::ChromaU, 0)[..4], &[5; 4]);
    }

    proptest! {
        #[test]
        fn prop_in_bounds_runs_always_apply(
            row in 0u16..192,
            start_col in 0u16..512,
            value in any::<u8>(),
        ) {
            let mut store = FrameStore::new(FrameGeometry::default());
            let length = (512 - start_col).min(0xFFF);
            let run = PixelRun { channel: Channel::ChromaU, row, start_col, length, value };
            prop_assert!(store.apply_run(&run).is_ok());
            let front = store.swap_and_reset();
            let row_data = front.row(Channel::ChromaU, row as usize);
            for col in start_col..start_col + length {
                prop_assert_eq!(row_data[col as usize], value);
            }
        }

        #[test]
        fn prop_overflowing_runs_always_rejected(
            row in 0u16..384,
            start_col in 0u16..512,
            excess in 1u16..32,
        ) {
            let mut store = FrameStore::new(FrameGeometry::default());
            let length = 512 - start_col + excess;
            if length <= 0xFFF {
                let run = PixelRun {
                    channel: Channel::Luma, row, start_col, length, value: 0,
                };
                prop_assert!(
                    matches!(
                        store.apply_run(&run),
                        Err(PixelwireError::OutOfBounds { .. })
                    ),
                    "expected OutOfBounds error"
                );
            }
        }
    }
}
