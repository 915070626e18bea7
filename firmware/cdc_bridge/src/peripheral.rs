use usb_device::UsbDirection;

use crate::btable::{descriptor_offset, BufferDescriptor, Slot};

/// Register level access to a USB full-speed peripheral with double buffered
/// endpoints and a dedicated packet memory.
///
/// Endpoint numbers passed in are already reduced to `0..MAX_ENDPOINTS`.
pub trait UsbPeripheral {
    /// Packet memory offset of the buffer descriptor table.
    const BTABLE: u16 = 0;
    /// Size of the packet memory in bytes.
    const PMA_SIZE: u16;

    /// A receive buffer was filled by the host and not yet handed to software.
    fn rx_complete(&self, ep: usize) -> bool;

    /// A transmit buffer was sent and its completion not yet acknowledged.
    fn tx_complete(&self, ep: usize) -> bool;

    /// Remembers a transmit completion the USB stack already acknowledged in
    /// hardware, so `tx_complete` keeps reporting it until the next swap.
    fn latch_tx_complete(&mut self, _ep: usize) {}

    /// Buffer currently owned by software.
    fn software_slot(&self, ep: usize, dir: UsbDirection) -> Slot;

    /// Hands the software buffer to the hardware and takes the other one, clearing
    /// the completion flag of that direction.
    fn swap_buffer(&mut self, ep: usize, dir: UsbDirection);

    /// Switches an already enabled endpoint to double buffered operation and sets
    /// the buffer ownership baseline: receive endpoints start with buffer A owned
    /// by the hardware, transmit endpoints start with buffer A owned by software.
    fn enable_double_buffer(&mut self, ep: usize, dir: UsbDirection);

    fn read_pma(&self, offset: usize, buf: &mut [u8]);

    fn write_pma(&mut self, offset: usize, data: &[u8]);

    fn descriptor(&self, ep: usize, slot: Slot) -> BufferDescriptor {
        let mut raw = [0u8; 4];
        self.read_pma(descriptor_offset(Self::BTABLE, ep, slot), &mut raw);
        BufferDescriptor {
            addr: u16::from_le_bytes([raw[0], raw[1]]),
            count: u16::from_le_bytes([raw[2], raw[3]]),
        }
    }

    fn set_descriptor(&mut self, ep: usize, slot: Slot, desc: BufferDescriptor) {
        let addr = desc.addr.to_le_bytes();
        let count = desc.count.to_le_bytes();
        self.write_pma(
            descriptor_offset(Self::BTABLE, ep, slot),
            &[addr[0], addr[1], count[0], count[1]],
        );
    }
}
