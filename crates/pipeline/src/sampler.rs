//! Interval sampling over a frame source.

use std::num::NonZeroUsize;

use crate::frame::Frame;
use crate::ring_buffer::FrameRing;
use crate::source::{DecodeError, FrameSource};

/// A frame selected for classification, with its 0-based position.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub frame: Frame,
    pub position: usize,
}

/// Walks a source in order, pushing every frame into the ring buffer and
/// yielding positions `0, I, 2I, ...` as candidates.
///
/// Candidates are produced lazily: when [`next_candidate`](Self::next_candidate)
/// returns position `p`, the ring holds the frames up to and including `p`
/// and nothing after it.
pub struct Sampler<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    ring: &'a mut FrameRing,
    interval: NonZeroUsize,
    frames_read: usize,
    exhausted: bool,
}

impl<'a, S: FrameSource + ?Sized> Sampler<'a, S> {
    pub fn new(source: &'a mut S, ring: &'a mut FrameRing, interval: NonZeroUsize) -> Self {
        Self {
            source,
            ring,
            interval,
            frames_read: 0,
            exhausted: false,
        }
    }

    /// Pull frames until the next candidate. `None` once the source is
    /// exhausted.
    pub async fn next_candidate(&mut self) -> Result<Option<Candidate>, DecodeError> {
        if self.exhausted {
            return Ok(None);
        }

        while let Some(frame) = self.source.next_frame().await? {
            let position = self.frames_read;
            self.frames_read += 1;
            self.ring.push(frame.clone());

            if position % self.interval.get() == 0 {
                return Ok(Some(Candidate { frame, position }));
            }
        }

        self.exhausted = true;
        Ok(None)
    }

    /// Drain the whole source and return every candidate in order.
    pub async fn collect_candidates(mut self) -> Result<Vec<Candidate>, DecodeError> {
        let mut candidates = Vec::new();
        while let Some(candidate) = self.next_candidate().await? {
            candidates.push(candidate);
        }
        Ok(candidates)
    }

    /// Frames consumed from the source so far.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub fn ring(&self) -> &FrameRing {
        &*self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFrameSource;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|i| Frame::solid(2, 2, [i as u8, 0, 0])).collect()
    }

    #[tokio::test]
    async fn candidate_positions_follow_interval() {
        for len in 0..=13 {
            for interval in 1..=5 {
                let mut source = MemoryFrameSource::new(frames(len));
                let mut ring = FrameRing::new(nz(100));
                let candidates = Sampler::new(&mut source, &mut ring, nz(interval))
                    .collect_candidates()
                    .await
                    .unwrap();

                let positions: Vec<usize> = candidates.iter().map(|c| c.position).collect();
                let expected: Vec<usize> = (0..len).step_by(interval).collect();
                assert_eq!(positions, expected, "len {len}, interval {interval}");
                assert_eq!(candidates.len(), len.div_ceil(interval));
                assert_eq!(ring.len(), len);
            }
        }
    }

    #[tokio::test]
    async fn candidate_frames_are_the_decoded_frames() {
        let all = frames(9);
        let mut source = MemoryFrameSource::new(all.clone());
        let mut ring = FrameRing::new(nz(4));
        let candidates = Sampler::new(&mut source, &mut ring, nz(4))
            .collect_candidates()
            .await
            .unwrap();

        assert!(candidates[0].frame.ptr_eq(&all[0]));
        assert!(candidates[1].frame.ptr_eq(&all[4]));
        assert!(candidates[2].frame.ptr_eq(&all[8]));

        // Ring keeps the last four frames: 5, 6, 7, 8.
        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), 4);
        for (frame, expected) in snapshot.iter().zip(&all[5..]) {
            assert!(frame.ptr_eq(expected));
        }
    }

    #[tokio::test]
    async fn lazy_sampling_stops_at_candidate() {
        let mut source = MemoryFrameSource::new(frames(10));
        let mut ring = FrameRing::new(nz(100));
        let mut sampler = Sampler::new(&mut source, &mut ring, nz(4));

        assert_eq!(sampler.next_candidate().await.unwrap().unwrap().position, 0);
        assert_eq!(sampler.frames_read(), 1);

        assert_eq!(sampler.next_candidate().await.unwrap().unwrap().position, 4);
        assert_eq!(sampler.frames_read(), 5);
        assert_eq!(sampler.ring().len(), 5);
        drop(sampler);

        assert_eq!(source.remaining(), 5);
    }

    #[tokio::test]
    async fn empty_source() {
        let mut source = MemoryFrameSource::default();
        let mut ring = FrameRing::new(nz(3));
        let mut sampler = Sampler::new(&mut source, &mut ring, nz(2));

        assert!(sampler.next_candidate().await.unwrap().is_none());
        assert!(sampler.next_candidate().await.unwrap().is_none());
        assert_eq!(sampler.frames_read(), 0);
        drop(sampler);
        assert!(ring.is_empty());
    }
}
