//! Transmit ring drained by chained one-shot DMA transfers.
//!
//! The cursors live in [`TxQueue`], which is shared between the main loop (producer)
//! and the DMA completion interrupt. The bytes live in [`TxStorage`], which only the
//! main loop writes; the DMA only reads the region between `head` and `head + transfer`.
use crate::PACKET_SIZE;

/// Nominal ring size.
pub const TX_CAPACITY: usize = 1024;

/// Starts a memory to UART transfer of `len` bytes at ring offset `offset`.
pub trait TxDma {
    fn start(&mut self, offset: usize, len: usize);
}

pub struct TxStorage {
    /// Ring storage plus room for one packet written past the end. The overhang is
    /// folded back to the start after each write.
    buf: [u8; TX_CAPACITY + PACKET_SIZE],
}

impl TxStorage {
    pub const fn new() -> TxStorage {
        TxStorage {
            buf: [0; TX_CAPACITY + PACKET_SIZE],
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.buf.as_ptr()
    }

    /// Contiguous space for one packet starting at `tail`.
    pub fn window(&mut self, tail: usize) -> &mut [u8] {
        &mut self.buf[tail..tail + PACKET_SIZE]
    }

    /// Moves whatever the last `n` bytes written at `tail` put past the ring end to
    /// the ring start.
    pub fn fold(&mut self, tail: usize, n: usize) {
        let end = tail + n;
        if end > TX_CAPACITY {
            self.buf.copy_within(TX_CAPACITY..end, 0);
        }
    }

    #[cfg(test)]
    fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.buf[offset..offset + len]
    }
}

pub struct TxQueue<D> {
    /// First byte not yet sent.
    head: usize,
    /// Bytes queued, including the ones in flight.
    size: usize,
    /// Bytes handed to the DMA by the transfer in flight, 0 when idle.
    transfer: usize,
    dma: D,
}

impl<D: TxDma> TxQueue<D> {
    pub fn new(dma: D) -> TxQueue<D> {
        TxQueue {
            head: 0,
            size: 0,
            transfer: 0,
            dma,
        }
    }

    /// Where the next byte goes.
    pub fn tail(&self) -> usize {
        (self.head + self.size) % TX_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn free(&self) -> usize {
        TX_CAPACITY - self.size
    }

    /// Nothing queued and nothing in flight.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Appends `n` bytes already written at `tail()` and kicks the DMA if idle.
    pub fn commit(&mut self, n: usize) {
        self.size += n.min(self.free());
        if self.transfer == 0 {
            self.start_next();
        }
    }

    /// Called from the DMA completion interrupt.
    pub fn transfer_complete(&mut self) {
        self.head = (self.head + self.transfer) % TX_CAPACITY;
        self.size -= self.transfer;
        self.transfer = 0;
        self.start_next();
    }

    fn start_next(&mut self) {
        let len = self.size.min(PACKET_SIZE).min(TX_CAPACITY - self.head);
        if len > 0 {
            self.transfer = len;
            self.dma.start(self.head, len);
        }
    }
}
