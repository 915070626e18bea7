//! Receive ring filled by a free running circular DMA transfer.
//!
//! The DMA channel only exposes how many bytes are left until it wraps. That count
//! is turned into the producer cursor `tail` on every poll; `head` is the first byte
//! not yet forwarded to USB.
use core::sync::atomic::{compiler_fence, Ordering};

use crate::PACKET_SIZE;

/// Minimum distance kept between the forwarding cursor and the DMA write position.
pub const OVERFLOW_DEADZONE: usize = 128;
/// Nominal ring size, the DMA transfer length.
pub const RX_CAPACITY: usize = 1024 + OVERFLOW_DEADZONE;

/// Result of folding DMA progress into the ring.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RxUpdate {
    /// Bytes the DMA wrote since the previous update.
    pub received: usize,
    /// Unforwarded bytes were dropped. Reported once per overflow episode.
    pub overflowed: bool,
}

pub struct RxRing {
    /// Ring storage followed by a copy of its first packet, so a packet sized read
    /// starting anywhere in the ring is contiguous.
    buf: [u8; RX_CAPACITY + PACKET_SIZE],
    head: usize,
    tail: usize,
    overflow: bool,
}

impl RxRing {
    pub const fn new() -> RxRing {
        RxRing {
            buf: [0; RX_CAPACITY + PACKET_SIZE],
            head: 0,
            tail: 0,
            overflow: false,
        }
    }

    /// Start of the DMA target area of `RX_CAPACITY` bytes.
    pub fn dma_target(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Bytes received and not yet forwarded.
    pub fn len(&self) -> usize {
        (self.tail + RX_CAPACITY - self.head) % RX_CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Folds DMA progress into the ring. `remaining` is the DMA transfer counter,
    /// counting down from `RX_CAPACITY` and reloading at zero.
    pub fn update(&mut self, remaining: usize) -> RxUpdate {
        // The counter must be read before the bytes it accounts for.
        compiler_fence(Ordering::Acquire);

        let old_tail = self.tail;
        let tail = (RX_CAPACITY - remaining.min(RX_CAPACITY)) % RX_CAPACITY;
        if tail >= old_tail {
            self.refresh_mirror(old_tail, tail);
        } else {
            self.refresh_mirror(old_tail, RX_CAPACITY);
            self.refresh_mirror(0, tail);
        }
        self.tail = tail;

        let mut update = RxUpdate {
            received: (tail + RX_CAPACITY - old_tail) % RX_CAPACITY,
            overflowed: false,
        };
        if self.len() > RX_CAPACITY - OVERFLOW_DEADZONE {
            self.head = (self.tail + RX_CAPACITY - OVERFLOW_DEADZONE) % RX_CAPACITY;
            update.overflowed = !self.overflow;
            self.overflow = true;
        }
        update
    }

    fn refresh_mirror(&mut self, from: usize, to: usize) {
        let to = to.min(PACKET_SIZE);
        if from < to {
            self.buf.copy_within(from..to, RX_CAPACITY + from);
        }
    }

    #[cfg(test)]
    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..RX_CAPACITY]
    }

    /// Next contiguous run of at most one packet.
    pub fn pending(&self) -> &[u8] {
        let len = self.len().min(PACKET_SIZE);
        &self.buf[self.head..self.head + len]
    }

    /// Marks `n` bytes of `pending()` as forwarded.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len());
        self.head = (self.head + n) % RX_CAPACITY;
        if n > 0 && self.len() <= RX_CAPACITY - OVERFLOW_DEADZONE {
            self.overflow = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::uart_rx::*;
    use std::vec::Vec;

    /// Plays the DMA: writes bytes at the current DMA position and returns the new
    /// transfer counter.
    struct FakeDma {
        pos: usize,
        next: u8,
    }

    impl FakeDma {
        fn new() -> FakeDma {
            FakeDma { pos: 0, next: 0 }
        }

        fn receive(&mut self, ring: &mut RxRing, n: usize) -> usize {
            for _ in 0..n {
                ring.buf[self.pos] = self.next;
                self.next = self.next.wrapping_add(1);
                self.pos = (self.pos + 1) % RX_CAPACITY;
            }
            RX_CAPACITY - self.pos
        }
    }

    fn drain(ring: &mut RxRing) -> Vec<u8> {
        let mut out = Vec::new();
        while !ring.is_empty() {
            let chunk = ring.pending().to_vec();
            ring.consume(chunk.len());
            out.extend(chunk);
        }
        out
    }

    #[test]
    fn test_update_tracks_dma() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        assert_eq!(ring.update(RX_CAPACITY), RxUpdate::default());
        let remaining = dma.receive(&mut ring, 10);
        assert_eq!(
            ring.update(remaining),
            RxUpdate {
                received: 10,
                overflowed: false
            }
        );
        assert_eq!(ring.len(), 10);
        assert_eq!(ring.pending(), &(0..10).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn test_pending_is_one_packet() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        let remaining = dma.receive(&mut ring, 100);
        ring.update(remaining);
        assert_eq!(ring.pending().len(), PACKET_SIZE);
        ring.consume(PACKET_SIZE);
        assert_eq!(ring.pending().len(), 36);
    }

    #[test]
    fn test_wraparound_read_is_contiguous() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        let mut expected = Vec::new();
        let mut got = Vec::new();
        // odd step sizes so the cursors cross the ring end at arbitrary offsets
        for step in [700usize, 300, 500, 41, 333, 97].iter().cycle().take(30) {
            let start = dma.next;
            let remaining = dma.receive(&mut ring, *step);
            expected.extend((0..*step).map(|i| start.wrapping_add(i as u8)));
            assert!(!ring.update(remaining).overflowed);
            got.extend(drain(&mut ring));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn test_wrap_refreshes_whole_mirror() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        for n in [1000, RX_CAPACITY - 10 - 1000].iter() {
            let remaining = dma.receive(&mut ring, *n);
            ring.update(remaining);
            drain(&mut ring);
        }
        // wrap and land past the mirrored area in one step
        let remaining = dma.receive(&mut ring, 10 + PACKET_SIZE + 5);
        ring.update(remaining);
        assert_eq!(
            &ring.buf[RX_CAPACITY..RX_CAPACITY + PACKET_SIZE],
            &ring.buf[..PACKET_SIZE]
        );
        assert_eq!(ring.pending().len(), PACKET_SIZE);
        let first = ring.pending()[0];
        assert_eq!(first, ((RX_CAPACITY - 10) % 256) as u8);
    }

    #[test]
    fn test_overflow_fires_once() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        let remaining = dma.receive(&mut ring, RX_CAPACITY - OVERFLOW_DEADZONE + 1);
        let update = ring.update(remaining);
        assert!(update.overflowed);
        assert_eq!(ring.len(), OVERFLOW_DEADZONE);
        assert!(ring.len() <= RX_CAPACITY);

        // still no consumer: dropped again, but not reported again
        let remaining = dma.receive(&mut ring, 1000);
        let update = ring.update(remaining);
        assert!(!update.overflowed);
        assert_eq!(ring.len(), OVERFLOW_DEADZONE);

        ring.consume(1);
        let remaining = dma.receive(&mut ring, 1000);
        assert!(ring.update(remaining).overflowed);
    }

    #[test]
    fn test_no_overflow_at_threshold() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        let remaining = dma.receive(&mut ring, RX_CAPACITY - OVERFLOW_DEADZONE);
        assert!(!ring.update(remaining).overflowed);
        assert_eq!(ring.head(), 0);
        assert_eq!(ring.len(), RX_CAPACITY - OVERFLOW_DEADZONE);
    }

    #[test]
    fn test_ring_invariant() {
        let mut ring = RxRing::new();
        let mut dma = FakeDma::new();
        let mut step = 1usize;
        for i in 0..500 {
            // polled often enough that one step stays inside the deadzone
            step = (step * 31 + 17) % OVERFLOW_DEADZONE;
            let remaining = dma.receive(&mut ring, step);
            ring.update(remaining);
            assert!(ring.len() <= RX_CAPACITY - OVERFLOW_DEADZONE);
            assert!(ring.head() < RX_CAPACITY && ring.tail() < RX_CAPACITY);
            if i % 3 == 0 {
                let n = ring.pending().len();
                ring.consume(n);
            }
        }
    }
}
