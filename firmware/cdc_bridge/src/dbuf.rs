//! Double buffered bulk endpoints.
//!
//! The hardware alternates between two packet buffers per endpoint. Software always
//! works on the buffer selected by the software toggle; swapping hands that buffer
//! to the hardware and takes the other one back. [`DoubleBuffer`] tracks per
//! endpoint whether the software buffer holds data that was not yet delivered, so a
//! buffer still in use on the wire is never touched.
use usb_device::endpoint::EndpointAddress;
use usb_device::{Result, UsbDirection, UsbError};

use crate::btable::{
    rx_buffer_size, rx_count_field, tx_buffer_size, BufferDescriptor, PmaAllocator, Slot,
    MAX_ENDPOINTS,
};
use crate::peripheral::UsbPeripheral;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BufferState {
    /// Receive: nothing waiting for software. Transmit: nothing waiting for the wire.
    Empty,
    /// The software buffer holds a packet not yet consumed or not yet handed over.
    Full,
    /// Transmit endpoint that has not sent anything since setup. The first write
    /// has to start the transfer itself because no completion will ever arrive.
    NewlyConfigured,
}

#[derive(Copy, Clone, Debug)]
struct EndpointSlot {
    direction: Option<UsbDirection>,
    state: BufferState,
    max_packet: u16,
    /// The completion currently pending in hardware was already announced.
    announced: bool,
}

impl EndpointSlot {
    const UNUSED: EndpointSlot = EndpointSlot {
        direction: None,
        state: BufferState::Empty,
        max_packet: 0,
        announced: false,
    };
}

/// Receiver of endpoint completion notifications. Both methods default to doing
/// nothing.
pub trait EndpointEvents<P: UsbPeripheral> {
    /// A packet arrived on a receive endpoint.
    fn data_available(&mut self, _engine: &mut DoubleBuffer<P>, _ep: EndpointAddress) {}

    /// A transmit endpoint finished sending a packet.
    fn can_write(&mut self, _engine: &mut DoubleBuffer<P>, _ep: EndpointAddress) {}
}

impl<P: UsbPeripheral> EndpointEvents<P> for () {}

/// Registry of double buffered endpoints of one peripheral.
pub struct DoubleBuffer<P> {
    periph: P,
    endpoints: [EndpointSlot; MAX_ENDPOINTS],
    pma: PmaAllocator,
}

impl<P: UsbPeripheral> DoubleBuffer<P> {
    /// Packet buffers are allocated upwards from `pma_base`.
    pub fn new(periph: P, pma_base: u16) -> DoubleBuffer<P> {
        DoubleBuffer {
            periph,
            endpoints: [EndpointSlot::UNUSED; MAX_ENDPOINTS],
            pma: PmaAllocator::new(pma_base, P::PMA_SIZE),
        }
    }

    pub fn peripheral(&self) -> &P {
        &self.periph
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.periph
    }

    /// Forgets every endpoint and releases their packet memory.
    pub fn reset(&mut self) {
        self.endpoints = [EndpointSlot::UNUSED; MAX_ENDPOINTS];
        self.pma.reset();
    }

    pub fn state(&self, ep: EndpointAddress) -> BufferState {
        self.endpoints[index(ep)].state
    }

    /// Allocates both packet buffers of `ep` and switches it to double buffered
    /// operation. The endpoint must already be enabled by the USB stack.
    pub fn endpoint_setup(&mut self, ep: EndpointAddress, max_packet: u16) -> Result<()> {
        let n = index(ep);
        let dir = ep.direction();
        let (size, count) = match dir {
            UsbDirection::Out => (rx_buffer_size(max_packet), rx_count_field(max_packet)),
            UsbDirection::In => (tx_buffer_size(max_packet), 0),
        };
        let a = self.pma.alloc(size)?;
        let b = self.pma.alloc(size)?;
        self.periph
            .set_descriptor(n, Slot::A, BufferDescriptor { addr: a, count });
        self.periph
            .set_descriptor(n, Slot::B, BufferDescriptor { addr: b, count });
        self.periph.enable_double_buffer(n, dir);

        self.endpoints[n] = EndpointSlot {
            direction: Some(dir),
            state: match dir {
                UsbDirection::Out => BufferState::Empty,
                UsbDirection::In => BufferState::NewlyConfigured,
            },
            max_packet,
            announced: false,
        };
        Ok(())
    }

    /// Whether `read_packet` would deliver a packet. Takes over a freshly completed
    /// buffer as a side effect.
    pub fn can_read(&mut self, ep: EndpointAddress) -> bool {
        let n = index(ep);
        if self.endpoints[n].direction != Some(UsbDirection::Out) {
            return false;
        }
        if self.endpoints[n].state != BufferState::Empty {
            return true;
        }
        if !self.periph.rx_complete(n) {
            return false;
        }
        self.swap_rx(n);
        self.endpoints[n].state = BufferState::Full;
        true
    }

    /// Copies the next received packet into `buf`, truncated to its length.
    ///
    /// Returns `WouldBlock` when no packet has arrived. A zero length packet from the
    /// host reads as `Ok(0)`.
    pub fn read_packet(&mut self, ep: EndpointAddress, buf: &mut [u8]) -> Result<usize> {
        let n = index(ep);
        if self.endpoints[n].direction != Some(UsbDirection::Out) {
            return Err(UsbError::InvalidEndpoint);
        }
        if self.endpoints[n].state == BufferState::Empty {
            if !self.periph.rx_complete(n) {
                return Err(UsbError::WouldBlock);
            }
            self.swap_rx(n);
        }

        let slot = self.periph.software_slot(n, UsbDirection::Out);
        let desc = self.periph.descriptor(n, slot);
        let len = buf.len().min(desc.len());
        self.periph.read_pma(desc.addr as usize, &mut buf[..len]);

        // The other buffer may already be complete; take it right away so the host
        // can keep filling without a turnaround.
        if self.periph.rx_complete(n) {
            self.swap_rx(n);
            self.endpoints[n].state = BufferState::Full;
        } else {
            self.endpoints[n].state = BufferState::Empty;
        }
        Ok(len)
    }

    /// Whether `write_packet` would accept a packet. Reclaims a buffer the hardware
    /// finished with as a side effect.
    pub fn can_write(&mut self, ep: EndpointAddress) -> bool {
        let n = index(ep);
        if self.endpoints[n].direction != Some(UsbDirection::In) {
            return false;
        }
        if self.endpoints[n].state != BufferState::Full {
            return true;
        }
        if !self.periph.tx_complete(n) {
            return false;
        }
        self.periph.swap_buffer(n, UsbDirection::In);
        self.endpoints[n].state = BufferState::Empty;
        true
    }

    /// Queues one packet. An empty `data` queues a zero length packet.
    ///
    /// Returns `WouldBlock` while both buffers are in use and `BufferOverflow` when
    /// `data` exceeds the endpoint's packet size.
    pub fn write_packet(&mut self, ep: EndpointAddress, data: &[u8]) -> Result<usize> {
        let n = index(ep);
        if self.endpoints[n].direction != Some(UsbDirection::In) {
            return Err(UsbError::InvalidEndpoint);
        }
        if data.len() > self.endpoints[n].max_packet as usize {
            return Err(UsbError::BufferOverflow);
        }
        if self.endpoints[n].state == BufferState::Full {
            if !self.periph.tx_complete(n) {
                return Err(UsbError::WouldBlock);
            }
            self.periph.swap_buffer(n, UsbDirection::In);
        }

        let slot = self.periph.software_slot(n, UsbDirection::In);
        let desc = self.periph.descriptor(n, slot);
        self.periph.write_pma(desc.addr as usize, data);
        self.periph.set_descriptor(n, slot, desc.with_len(data.len()));

        if self.periph.tx_complete(n) || self.endpoints[n].state == BufferState::NewlyConfigured
        {
            self.periph.swap_buffer(n, UsbDirection::In);
            self.endpoints[n].state = BufferState::Empty;
        } else {
            self.endpoints[n].state = BufferState::Full;
        }
        Ok(data.len())
    }

    /// Dispatches a completed transaction reported by the USB stack to `events`.
    ///
    /// Receive completions stay pending in hardware until software swaps buffers,
    /// so the stack may report the same one repeatedly; it is announced once.
    pub fn notify<E: EndpointEvents<P>>(&mut self, ep: EndpointAddress, events: &mut E) {
        let n = index(ep);
        match self.endpoints[n].direction {
            Some(UsbDirection::Out) => {
                let pending = self.periph.rx_complete(n);
                if pending && self.endpoints[n].announced {
                    return;
                }
                self.endpoints[n].announced = pending;
                events.data_available(self, ep);
            }
            Some(UsbDirection::In) => {
                self.periph.latch_tx_complete(n);
                events.can_write(self, ep);
            }
            None => (),
        }
    }

    fn swap_rx(&mut self, n: usize) {
        self.periph.swap_buffer(n, UsbDirection::Out);
        self.endpoints[n].announced = false;
    }
}

fn index(ep: EndpointAddress) -> usize {
    ep.index() & (MAX_ENDPOINTS - 1)
}
