//! Buffer descriptor table of the USB full-speed packet memory.
//!
//! Every endpoint owns 8 bytes of the table: two (address, count) pairs. In double
//! buffered mode both pairs describe buffers of the same direction; pair 0 is buffer
//! A and pair 1 is buffer B.
use usb_device::{Result, UsbError};

/// Endpoint register pairs of the peripheral.
pub const MAX_ENDPOINTS: usize = 8;

/// Bytes of descriptor table used per endpoint.
pub const ENDPOINT_DESCRIPTOR_SIZE: usize = 8;

/// Low bits of the count field holding the byte count. The upper bits encode the
/// block size of receive buffers and are owned by the hardware.
pub const COUNT_MASK: u16 = 0x03ff;

/// Size of the whole descriptor table.
pub const BTABLE_SIZE: u16 = (MAX_ENDPOINTS * ENDPOINT_DESCRIPTOR_SIZE) as u16;

/// One of the two physical buffers of a double buffered endpoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Maps a hardware toggle bit to the buffer it selects.
    pub fn from_bit(bit: bool) -> Slot {
        if bit {
            Slot::B
        } else {
            Slot::A
        }
    }

    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Address and count of one packet buffer, as stored in packet memory.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BufferDescriptor {
    /// Offset of the buffer in packet memory.
    pub addr: u16,
    /// Raw count field, including block size bits for receive buffers.
    pub count: u16,
}

impl BufferDescriptor {
    /// Number of bytes the count field reports.
    pub fn len(&self) -> usize {
        (self.count & COUNT_MASK) as usize
    }

    /// Replaces the byte count, keeping the block size bits.
    pub fn with_len(self, len: usize) -> BufferDescriptor {
        BufferDescriptor {
            addr: self.addr,
            count: (self.count & !COUNT_MASK) | (len as u16 & COUNT_MASK),
        }
    }
}

/// Packet memory offset of a descriptor.
pub fn descriptor_offset(btable: u16, ep: usize, slot: Slot) -> usize {
    btable as usize + (ep & (MAX_ENDPOINTS - 1)) * ENDPOINT_DESCRIPTOR_SIZE + slot.index() * 4
}

/// Physical size of a receive buffer able to hold `max_packet` bytes.
///
/// The count field expresses receive buffer sizes in 2 byte blocks up to 62 bytes and
/// in 32 byte blocks above.
pub fn rx_buffer_size(max_packet: u16) -> u16 {
    if max_packet <= 62 {
        (max_packet + 1) & !1
    } else {
        (max_packet + 31) & !31
    }
}

/// Count field value announcing a receive buffer of `rx_buffer_size(max_packet)` bytes.
pub fn rx_count_field(max_packet: u16) -> u16 {
    let size = rx_buffer_size(max_packet);
    if size <= 62 {
        size << 9
    } else {
        0x8000 | ((size - 32) << 5)
    }
}

/// Physical size of a transmit buffer. Packet memory is accessed in half words, so
/// buffers start on even offsets.
pub fn tx_buffer_size(max_packet: u16) -> u16 {
    (max_packet + 1) & !1
}

/// Running allocation cursor over packet memory.
#[derive(Copy, Clone, Debug)]
pub struct PmaAllocator {
    base: u16,
    top: u16,
    end: u16,
}

impl PmaAllocator {
    pub fn new(base: u16, end: u16) -> PmaAllocator {
        PmaAllocator {
            base,
            top: base,
            end,
        }
    }

    /// Reserves `size` bytes and returns their offset.
    pub fn alloc(&mut self, size: u16) -> Result<u16> {
        let addr = self.top;
        let next = addr.checked_add(size).ok_or(UsbError::EndpointMemoryOverflow)?;
        if next > self.end {
            return Err(UsbError::EndpointMemoryOverflow);
        }
        self.top = next;
        Ok(addr)
    }

    /// First free offset.
    pub fn top(&self) -> u16 {
        self.top
    }

    /// Releases every allocation.
    pub fn reset(&mut self) {
        self.top = self.base;
    }
}
