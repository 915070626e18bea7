//! CDC-ACM byte stream session on top of a pair of double buffered bulk endpoints.
use usb_device::control::{Recipient, Request, RequestType};
use usb_device::endpoint::EndpointAddress;
use usb_device::{Result, UsbError};

use crate::cdc::{
    serial_state_notification, ControlLines, LineCoding, LineCodingLimits, SerialState,
    REQ_GET_LINE_CODING, REQ_SET_CONTROL_LINE_STATE, REQ_SET_LINE_CODING,
    SERIAL_STATE_PACKET_SIZE,
};
use crate::dbuf::{DoubleBuffer, EndpointEvents};
use crate::peripheral::UsbPeripheral;
use crate::PACKET_SIZE;

/// Board specific reactions to host requests. Nothing happens by default.
pub trait SerialHooks {
    /// The host changed DTR or RTS.
    fn control_lines_changed(&mut self, _lines: ControlLines) {}

    /// The host set a line coding that passed validation.
    fn line_coding_accepted(&mut self, _coding: &LineCoding) {}

    /// A packet from the host is waiting to be read.
    fn data_available(&mut self) {}
}

pub struct NoHooks;

impl SerialHooks for NoHooks {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// The host has not selected the configuration yet.
    NotReady,
    Ready,
}

/// Outcome of a class request with a data stage towards the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutResponse {
    Accepted,
    Rejected,
}

/// Outcome of a class request with a data stage towards the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InResponse {
    Accepted([u8; LineCoding::SIZE]),
    Rejected,
}

pub struct SerialTransport<H: SerialHooks = NoHooks> {
    state: SessionState,
    comm_if: u8,
    data_out: EndpointAddress,
    data_in: EndpointAddress,
    /// Unread tail of a packet that did not fit the caller's buffer.
    remainder: [u8; PACKET_SIZE],
    remainder_start: usize,
    remainder_len: usize,
    /// The last packet was full sized, the transfer still needs a terminator.
    zlp_pending: bool,
    limits: LineCodingLimits,
    /// Last line coding accepted from the host.
    line_coding: LineCoding,
    /// Accepted line coding not yet applied to the UART.
    staged: Option<LineCoding>,
    lines: ControlLines,
    pending_state: Option<SerialState>,
    hooks: H,
}

impl<H: SerialHooks> SerialTransport<H> {
    pub fn new(
        comm_if: u8,
        data_out: EndpointAddress,
        data_in: EndpointAddress,
        line_coding: LineCoding,
        limits: LineCodingLimits,
        hooks: H,
    ) -> SerialTransport<H> {
        SerialTransport {
            state: SessionState::NotReady,
            comm_if,
            data_out,
            data_in,
            remainder: [0; PACKET_SIZE],
            remainder_start: 0,
            remainder_len: 0,
            zlp_pending: false,
            limits,
            line_coding,
            staged: None,
            lines: ControlLines::default(),
            pending_state: None,
            hooks,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Sets up the data endpoints once the host selected the configuration.
    pub fn configure<P: UsbPeripheral>(&mut self, engine: &mut DoubleBuffer<P>) -> Result<()> {
        engine.endpoint_setup(self.data_out, PACKET_SIZE as u16)?;
        engine.endpoint_setup(self.data_in, PACKET_SIZE as u16)?;
        self.clear_stream();
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Bus reset or unplug.
    pub fn reset(&mut self) {
        self.clear_stream();
        self.state = SessionState::NotReady;
        self.lines = ControlLines::default();
        self.pending_state = None;
    }

    fn clear_stream(&mut self) {
        self.remainder_start = 0;
        self.remainder_len = 0;
        self.zlp_pending = false;
    }

    /// Reads received bytes without blocking.
    ///
    /// A buffer shorter than a packet still consumes a whole packet from the
    /// endpoint; the bytes that do not fit are returned by the following calls.
    pub fn read<P: UsbPeripheral>(
        &mut self,
        engine: &mut DoubleBuffer<P>,
        buf: &mut [u8],
    ) -> Result<usize> {
        if !self.is_ready() {
            return Err(UsbError::WouldBlock);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remainder_len > 0 {
            return Ok(self.take_remainder(buf));
        }
        if buf.len() >= PACKET_SIZE {
            return engine.read_packet(self.data_out, buf);
        }
        let n = engine.read_packet(self.data_out, &mut self.remainder)?;
        self.remainder_start = 0;
        self.remainder_len = n;
        Ok(self.take_remainder(buf))
    }

    fn take_remainder(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remainder_len);
        let start = self.remainder_start;
        buf[..n].copy_from_slice(&self.remainder[start..start + n]);
        self.remainder_start += n;
        self.remainder_len -= n;
        n
    }

    /// Reads a single byte, `None` when nothing was received.
    pub fn getchar<P: UsbPeripheral>(&mut self, engine: &mut DoubleBuffer<P>) -> Option<u8> {
        let mut c = [0u8; 1];
        match self.read(engine, &mut c) {
            Ok(1) => Some(c[0]),
            _ => None,
        }
    }

    pub fn can_read<P: UsbPeripheral>(&mut self, engine: &mut DoubleBuffer<P>) -> bool {
        self.is_ready() && (self.remainder_len > 0 || engine.can_read(self.data_out))
    }

    pub fn can_write<P: UsbPeripheral>(&mut self, engine: &mut DoubleBuffer<P>) -> bool {
        self.is_ready() && engine.can_write(self.data_in)
    }

    /// Sends at most one packet of `data` without blocking.
    pub fn write<P: UsbPeripheral>(
        &mut self,
        engine: &mut DoubleBuffer<P>,
        data: &[u8],
    ) -> Result<usize> {
        if !self.is_ready() {
            return Err(UsbError::WouldBlock);
        }
        let len = data.len().min(PACKET_SIZE);
        let n = engine.write_packet(self.data_in, &data[..len])?;
        self.zlp_pending = n == PACKET_SIZE;
        Ok(n)
    }

    /// Sends the zero length packet a full sized last packet needs.
    ///
    /// When the endpoint is busy this returns `WouldBlock` and the terminator goes
    /// out from the next transmit completion instead.
    pub fn flush<P: UsbPeripheral>(&mut self, engine: &mut DoubleBuffer<P>) -> Result<()> {
        if !self.zlp_pending || !self.is_ready() {
            return Ok(());
        }
        if !engine.can_write(self.data_in) {
            return Err(UsbError::WouldBlock);
        }
        engine.write_packet(self.data_in, &[])?;
        self.zlp_pending = false;
        Ok(())
    }

    pub fn zlp_pending(&self) -> bool {
        self.zlp_pending
    }

    /// Writes one byte, polling the bus through `poll` until the endpoint takes it.
    pub fn putchar<P, F>(&mut self, engine: &mut DoubleBuffer<P>, c: u8, mut poll: F) -> Result<()>
    where
        P: UsbPeripheral,
        F: FnMut(&mut DoubleBuffer<P>),
    {
        block_on(
            engine,
            |engine| self.write(engine, &[c]),
            |engine| poll(engine),
        )
        .map(|_| ())
    }

    /// Handles a class request towards the device. `None` means the request is not
    /// for this interface and another handler or the stack should deal with it.
    pub fn control_out(&mut self, req: &Request, data: &[u8]) -> Option<OutResponse> {
        if !self.is_own_request(req) {
            return None;
        }
        match req.request {
            REQ_SET_LINE_CODING => {
                if data.len() < LineCoding::SIZE || (req.length as usize) < LineCoding::SIZE {
                    return None;
                }
                let coding = match LineCoding::parse(data) {
                    Ok(coding) => coding,
                    Err(_) => return Some(OutResponse::Rejected),
                };
                if coding.validate(&self.limits).is_err() {
                    return Some(OutResponse::Rejected);
                }
                self.line_coding = coding;
                self.staged = Some(coding);
                self.hooks.line_coding_accepted(&coding);
                Some(OutResponse::Accepted)
            }
            REQ_SET_CONTROL_LINE_STATE => {
                self.lines = ControlLines::from(req.value);
                self.hooks.control_lines_changed(self.lines);
                self.queue_state(SerialState::DEFAULT);
                Some(OutResponse::Accepted)
            }
            _ => Some(OutResponse::Rejected),
        }
    }

    /// Handles a class request towards the host, see `control_out`.
    pub fn control_in(&mut self, req: &Request) -> Option<InResponse> {
        if !self.is_own_request(req) {
            return None;
        }
        match req.request {
            REQ_GET_LINE_CODING => {
                if (req.length as usize) < LineCoding::SIZE {
                    return None;
                }
                Some(InResponse::Accepted(self.line_coding.to_bytes()))
            }
            _ => Some(InResponse::Rejected),
        }
    }

    fn is_own_request(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == self.comm_if as u16
    }

    pub fn line_coding(&self) -> &LineCoding {
        &self.line_coding
    }

    /// Accepted line coding waiting to be applied.
    pub fn staged_line_coding(&self) -> Option<&LineCoding> {
        self.staged.as_ref()
    }

    pub fn take_line_coding(&mut self) -> Option<LineCoding> {
        self.staged.take()
    }

    pub fn control_lines(&self) -> ControlLines {
        self.lines
    }

    /// Queues a serial state notification; states queued before the next send are
    /// merged.
    pub fn queue_state(&mut self, state: SerialState) {
        self.pending_state = Some(match self.pending_state {
            Some(pending) => pending | state,
            None => state,
        });
    }

    pub fn take_pending_state(&mut self) -> Option<SerialState> {
        self.pending_state.take()
    }

    /// SERIAL_STATE notification of this interface.
    pub fn state_notification(&self, state: SerialState) -> [u8; SERIAL_STATE_PACKET_SIZE] {
        serial_state_notification(self.comm_if, state)
    }
}

impl<P: UsbPeripheral, H: SerialHooks> EndpointEvents<P> for SerialTransport<H> {
    fn data_available(&mut self, _engine: &mut DoubleBuffer<P>, ep: EndpointAddress) {
        if ep == self.data_out {
            self.hooks.data_available();
        }
    }

    fn can_write(&mut self, engine: &mut DoubleBuffer<P>, ep: EndpointAddress) {
        if ep == self.data_in {
            self.flush(engine).ok();
        }
    }
}

/// Retries `attempt` as long as it reports `WouldBlock`, running `poll` in between.
///
/// Only for low traffic control plane writes: nothing bounds the wait but the host
/// polling the endpoint.
pub fn block_on<C, T, A, F>(ctx: &mut C, mut attempt: A, mut poll: F) -> Result<T>
where
    A: FnMut(&mut C) -> Result<T>,
    F: FnMut(&mut C),
{
    loop {
        match attempt(ctx) {
            Err(UsbError::WouldBlock) => poll(ctx),
            other => return other,
        }
    }
}

/// A notification the session was torn down for while waiting is dropped; the
/// host starts over from the serial state of a fresh session.
pub fn drop_if_reset(result: Result<()>) -> Result<()> {
    match result {
        Err(UsbError::InvalidState) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdc::Parity;
    use crate::dbuf::BufferState;
    use crate::sim::SimUsb;
    use std::vec::Vec;
    use usb_device::UsbDirection;

    const LIMITS: LineCodingLimits = LineCodingLimits {
        min_baud: 2400,
        max_baud: 4_000_000,
    };

    fn out_ep() -> EndpointAddress {
        EndpointAddress::from_parts(1, UsbDirection::Out)
    }

    fn in_ep() -> EndpointAddress {
        EndpointAddress::from_parts(2, UsbDirection::In)
    }

    fn session<H: SerialHooks>(hooks: H) -> (DoubleBuffer<SimUsb>, SerialTransport<H>) {
        let mut engine = DoubleBuffer::new(SimUsb::new(), 0x100);
        let mut serial =
            SerialTransport::new(0, out_ep(), in_ep(), LineCoding::new(115_200), LIMITS, hooks);
        serial.configure(&mut engine).unwrap();
        (engine, serial)
    }

    fn class_request(request: u8, value: u16, index: u16, length: u16) -> Request {
        Request {
            direction: UsbDirection::Out,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request,
            value,
            index,
            length,
        }
    }

    /// Drains everything the host can read from the data IN endpoint.
    fn host_read_all(engine: &mut DoubleBuffer<SimUsb>) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        loop {
            if let Some(p) = engine.peripheral_mut().host_in(2) {
                packets.push(p);
                continue;
            }
            // a queued packet waits for software to hand it over
            if engine.state(in_ep()) == BufferState::Full && engine.can_write(in_ep()) {
                continue;
            }
            return packets;
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        lines: Vec<ControlLines>,
        codings: Vec<LineCoding>,
        packets: usize,
    }

    impl SerialHooks for RecordingHooks {
        fn control_lines_changed(&mut self, lines: ControlLines) {
            self.lines.push(lines);
        }

        fn line_coding_accepted(&mut self, coding: &LineCoding) {
            self.codings.push(*coding);
        }

        fn data_available(&mut self) {
            self.packets += 1;
        }
    }

    #[test]
    fn test_not_ready_before_configuration() {
        let mut engine = DoubleBuffer::new(SimUsb::new(), 0x100);
        let mut serial =
            SerialTransport::new(0, out_ep(), in_ep(), LineCoding::new(115_200), LIMITS, NoHooks);
        assert_eq!(serial.state(), SessionState::NotReady);
        let mut buf = [0u8; 64];
        assert!(matches!(serial.read(&mut engine, &mut buf), Err(UsbError::WouldBlock)));
        assert!(matches!(serial.write(&mut engine, b"x"), Err(UsbError::WouldBlock)));
        serial.configure(&mut engine).unwrap();
        assert_eq!(serial.state(), SessionState::Ready);
        serial.reset();
        assert_eq!(serial.state(), SessionState::NotReady);
    }

    #[test]
    fn test_short_reads_keep_remainder() {
        let (mut engine, mut serial) = session(NoHooks);
        let data: Vec<u8> = (0..40).collect();
        assert!(engine.peripheral_mut().host_out(1, &data));
        assert!(serial.can_read(&mut engine));

        let mut got = Vec::new();
        let mut buf = [0u8; 16];
        while let Ok(n) = serial.read(&mut engine, &mut buf) {
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, data);
        assert!(!serial.can_read(&mut engine));
    }

    #[test]
    fn test_getchar() {
        let (mut engine, mut serial) = session(NoHooks);
        assert_eq!(serial.getchar(&mut engine), None);
        assert!(engine.peripheral_mut().host_out(1, b"ok"));
        assert_eq!(serial.getchar(&mut engine), Some(b'o'));
        assert_eq!(serial.getchar(&mut engine), Some(b'k'));
        assert_eq!(serial.getchar(&mut engine), None);
    }

    #[test]
    fn test_write_truncates_to_one_packet() {
        let (mut engine, mut serial) = session(NoHooks);
        let data = [7u8; 100];
        assert!(matches!(serial.write(&mut engine, &data), Ok(64)));
        assert!(serial.zlp_pending());
        assert!(matches!(serial.write(&mut engine, &data[64..]), Ok(36)));
        assert!(!serial.zlp_pending());
    }

    #[test]
    fn test_round_trip_all_chunk_sizes() {
        for chunk in 1..=64usize {
            let (mut engine, mut serial) = session(NoHooks);
            let data: Vec<u8> = (0..320u32).map(|i| (i * 7) as u8).collect();
            let mut packets = Vec::new();
            let mut last = 0;
            for piece in data.chunks(chunk) {
                let mut off = 0;
                while off < piece.len() {
                    match serial.write(&mut engine, &piece[off..]) {
                        Ok(n) => off += n,
                        Err(UsbError::WouldBlock) => {
                            packets.extend(host_read_all(&mut engine));
                        }
                        Err(e) => panic!("{:?}", e),
                    }
                }
                last = piece.len();
            }
            while serial.flush(&mut engine).is_err() {
                packets.extend(host_read_all(&mut engine));
            }
            packets.extend(host_read_all(&mut engine));

            let joined: Vec<u8> = packets.iter().flatten().cloned().collect();
            assert_eq!(joined, data, "chunk size {}", chunk);
            let terminated = packets.last().map(|p| p.is_empty()).unwrap_or(false);
            assert_eq!(terminated, last == 64, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_two_full_packets_without_flush() {
        let (mut engine, mut serial) = session(NoHooks);
        let data: Vec<u8> = (0..128).map(|i| i as u8).collect();
        assert!(matches!(serial.write(&mut engine, &data[..64]), Ok(64)));
        assert!(matches!(serial.write(&mut engine, &data[64..]), Ok(64)));

        // two completions
        let first = engine.peripheral_mut().host_in(2).unwrap();
        assert!(serial.can_write(&mut engine));
        let second = engine.peripheral_mut().host_in(2).unwrap();
        assert_eq!(first, &data[..64]);
        assert_eq!(second, &data[64..]);
        assert_eq!(engine.peripheral_mut().host_in(2), None);
        assert!(serial.zlp_pending());

        assert!(matches!(serial.flush(&mut engine), Ok(())));
        assert_eq!(engine.peripheral_mut().host_in(2), Some(Vec::new()));
    }

    #[test]
    fn test_flush_deferred_to_completion() {
        let (mut engine, mut serial) = session(NoHooks);
        let data = [1u8; 64];
        serial.write(&mut engine, &data).unwrap();
        serial.write(&mut engine, &data).unwrap();
        assert!(matches!(serial.flush(&mut engine), Err(UsbError::WouldBlock)));
        assert!(serial.zlp_pending());

        assert!(engine.peripheral_mut().host_in(2).is_some());
        engine.notify(in_ep(), &mut serial);
        assert!(!serial.zlp_pending());
        assert_eq!(engine.peripheral_mut().host_in(2).map(|p| p.len()), Some(64));
        assert_eq!(engine.peripheral_mut().host_in(2).map(|p| p.len()), None);
        assert!(engine.can_write(in_ep()));
        assert_eq!(engine.peripheral_mut().host_in(2), Some(Vec::new()));
    }

    #[test]
    fn test_putchar_polls_until_accepted() {
        let (mut engine, mut serial) = session(NoHooks);
        serial.write(&mut engine, b"a").unwrap();
        serial.write(&mut engine, b"b").unwrap();
        let mut polls = 0;
        let mut sent = Vec::new();
        serial
            .putchar(&mut engine, b'c', |engine| {
                polls += 1;
                if let Some(p) = engine.peripheral_mut().host_in(2) {
                    sent.extend(p);
                }
            })
            .unwrap();
        assert!(polls > 0);
        sent.extend(host_read_all(&mut engine).into_iter().flatten());
        assert_eq!(sent, b"abc");
    }

    #[test]
    fn test_set_line_coding_is_staged() {
        let (_, mut serial) = session(RecordingHooks::default());
        let req = class_request(REQ_SET_LINE_CODING, 0, 0, 7);
        let payload = [0x80, 0x25, 0x00, 0x00, 0x00, 0x01, 0x07];
        assert_eq!(serial.control_out(&req, &payload), Some(OutResponse::Accepted));
        assert_eq!(serial.line_coding().baud_rate, 9600);
        assert_eq!(serial.staged_line_coding().map(|c| c.parity), Some(Parity::Odd));
        assert_eq!(serial.hooks_mut().codings.len(), 1);

        let get = Request {
            direction: UsbDirection::In,
            ..class_request(REQ_GET_LINE_CODING, 0, 0, 7)
        };
        assert_eq!(serial.control_in(&get), Some(InResponse::Accepted(payload)));

        assert_eq!(serial.take_line_coding().map(|c| c.baud_rate), Some(9600));
        assert_eq!(serial.take_line_coding(), None);
    }

    #[test]
    fn test_unsupported_line_coding_rejected() {
        let (_, mut serial) = session(NoHooks);
        let req = class_request(REQ_SET_LINE_CODING, 0, 0, 7);
        // 300 baud is below the limit
        let payload = [0x2c, 0x01, 0x00, 0x00, 0x00, 0x00, 0x08];
        assert_eq!(serial.control_out(&req, &payload), Some(OutResponse::Rejected));
        assert_eq!(serial.line_coding().baud_rate, 115_200);
        assert_eq!(serial.staged_line_coding(), None);
    }

    #[test]
    fn test_foreign_or_short_requests_not_handled() {
        let (_, mut serial) = session(NoHooks);
        let payload = [0x00, 0xc2, 0x01, 0x00, 0x00, 0x00, 0x08];
        let other_if = class_request(REQ_SET_LINE_CODING, 0, 1, 7);
        assert_eq!(serial.control_out(&other_if, &payload), None);
        let short = class_request(REQ_SET_LINE_CODING, 0, 0, 6);
        assert_eq!(serial.control_out(&short, &payload[..6]), None);
        let standard = Request {
            request_type: RequestType::Standard,
            ..class_request(REQ_SET_LINE_CODING, 0, 0, 7)
        };
        assert_eq!(serial.control_out(&standard, &payload), None);
        // unknown class request on our interface
        let send_break = class_request(0x23, 0, 0, 0);
        assert_eq!(serial.control_out(&send_break, &[]), Some(OutResponse::Rejected));
    }

    #[test]
    fn test_control_line_state_echoes_serial_state() {
        let (_, mut serial) = session(RecordingHooks::default());
        let req = class_request(REQ_SET_CONTROL_LINE_STATE, 0x0003, 0, 0);
        assert_eq!(serial.control_out(&req, &[]), Some(OutResponse::Accepted));
        assert_eq!(serial.control_lines(), ControlLines { dtr: true, rts: true });
        assert_eq!(
            serial.hooks_mut().lines,
            vec![ControlLines { dtr: true, rts: true }]
        );
        assert_eq!(serial.take_pending_state(), Some(SerialState::DEFAULT));
        assert_eq!(serial.take_pending_state(), None);
    }

    #[test]
    fn test_queued_states_merge() {
        let (_, mut serial) = session(NoHooks);
        serial.queue_state(SerialState::DEFAULT | SerialState::OVERRUN);
        serial.queue_state(SerialState::DEFAULT);
        let state = serial.take_pending_state().unwrap();
        assert!(state.contains(SerialState::OVERRUN));
        assert_eq!(serial.state_notification(state)[8], 0x43);
    }

    #[test]
    fn test_block_on_retries_would_block() {
        let mut attempts = 0;
        let result = block_on(
            &mut attempts,
            |n| {
                *n += 1;
                if *n < 3 {
                    Err(UsbError::WouldBlock)
                } else {
                    Ok(*n)
                }
            },
            |_| (),
        );
        assert!(matches!(result, Ok(3)));
        let mut unit = ();
        let failed: Result<()> = block_on(&mut unit, |_| Err(UsbError::InvalidState), |_| ());
        assert!(matches!(failed, Err(UsbError::InvalidState)));
    }

    #[test]
    fn test_block_on_polls_between_retries() {
        // the poll callback is where the caller keeps its watchdog fed
        let mut feeds = 0;
        let mut busy = 4;
        let result: Result<()> = block_on(
            &mut busy,
            |n| {
                if *n > 0 {
                    Err(UsbError::WouldBlock)
                } else {
                    Ok(())
                }
            },
            |n| {
                *n -= 1;
                feeds += 1;
            },
        );
        assert!(result.is_ok());
        assert_eq!(feeds, 4);
    }

    #[test]
    fn test_notification_dropped_on_reset() {
        let mut waits = 0;
        let result = block_on(
            &mut waits,
            |n| {
                if *n < 2 {
                    Err(UsbError::WouldBlock)
                } else {
                    // bus reset while waiting for the endpoint
                    Err(UsbError::InvalidState)
                }
            },
            |n| *n += 1,
        );
        assert!(matches!(drop_if_reset(result), Ok(())));
        assert!(matches!(
            drop_if_reset(Err(UsbError::BufferOverflow)),
            Err(UsbError::BufferOverflow)
        ));
        assert!(matches!(drop_if_reset(Ok(())), Ok(())));
    }

    #[test]
    fn test_data_available_hook_on_data_out() {
        let (mut engine, mut serial) = session(RecordingHooks::default());
        assert!(engine.peripheral_mut().host_out(1, b"ping"));
        engine.notify(out_ep(), &mut serial);
        assert_eq!(serial.hooks_mut().packets, 1);

        // still pending in hardware, announced once
        engine.notify(out_ep(), &mut serial);
        assert_eq!(serial.hooks_mut().packets, 1);

        // transmit completions are not data
        engine.notify(in_ep(), &mut serial);
        assert_eq!(serial.hooks_mut().packets, 1);

        let mut buf = [0u8; 64];
        assert!(matches!(serial.read(&mut engine, &mut buf), Ok(4)));
        assert!(engine.peripheral_mut().host_out(1, b"pong"));
        engine.notify(out_ep(), &mut serial);
        assert_eq!(serial.hooks_mut().packets, 2);
    }
}
