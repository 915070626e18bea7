use cdc_bridge::cdc::{
    LineCoding, LineCodingLimits, CDC_PROTOCOL_NONE, CDC_SUBCLASS_ACM, CDC_TYPE_ACM,
    CDC_TYPE_CALL_MANAGEMENT, CDC_TYPE_HEADER, CDC_TYPE_UNION, CS_INTERFACE, USB_CLASS_CDC,
    USB_CLASS_CDC_DATA,
};
use cdc_bridge::dbuf::DoubleBuffer;
use cdc_bridge::peripheral::UsbPeripheral;
use cdc_bridge::serial::{InResponse, OutResponse, SerialHooks, SerialTransport};
use cdc_bridge::PACKET_SIZE;
use rtt_target::rprintln;
use usb_device::class_prelude::*;
use usb_device::endpoint::EndpointType;
use usb_device::UsbDirection;
use usb_device::Result;

const DATA_OUT: u8 = 1;
const DATA_IN: u8 = 2;
const NOTIFY_IN: u8 = 3;

/// ACM capabilities: line coding and control line state requests.
const ACM_CAPABILITIES: u8 = 0x02;

pub struct CdcAcmClass<'a, B: UsbBus, P: UsbPeripheral, H: SerialHooks> {
    comm_if: InterfaceNumber,
    data_if: InterfaceNumber,
    notify_ep: EndpointIn<'a, B>,
    // Only for the descriptors; the packets go through the double buffer engine.
    data_out: EndpointOut<'a, B>,
    data_in: EndpointIn<'a, B>,
    engine: DoubleBuffer<P>,
    serial: SerialTransport<H>,
}

impl<'a, B: UsbBus, P: UsbPeripheral, H: SerialHooks> CdcAcmClass<'a, B, P, H> {
    /// Data endpoints get fixed addresses because their buffers are set up behind
    /// the USB stack's back; their double buffers start at `pma_base`.
    pub fn new(
        alloc: &'a UsbBusAllocator<B>,
        periph: P,
        pma_base: u16,
        limits: LineCodingLimits,
        line_coding: LineCoding,
        hooks: H,
    ) -> Result<CdcAcmClass<'a, B, P, H>> {
        let comm_if = alloc.interface();
        let data_if = alloc.interface();
        let notify_ep = alloc.alloc(
            Some(EndpointAddress::from_parts(NOTIFY_IN as usize, UsbDirection::In)),
            EndpointType::Interrupt,
            16,
            255,
        )?;
        let data_out: EndpointOut<'a, B> = alloc.alloc(
            Some(EndpointAddress::from_parts(DATA_OUT as usize, UsbDirection::Out)),
            EndpointType::Bulk,
            PACKET_SIZE as u16,
            0,
        )?;
        let data_in: EndpointIn<'a, B> = alloc.alloc(
            Some(EndpointAddress::from_parts(DATA_IN as usize, UsbDirection::In)),
            EndpointType::Bulk,
            PACKET_SIZE as u16,
            0,
        )?;
        let serial = SerialTransport::new(
            u8::from(comm_if),
            data_out.address(),
            data_in.address(),
            line_coding,
            limits,
            hooks,
        );

        Ok(CdcAcmClass {
            comm_if,
            data_if,
            notify_ep,
            data_out,
            data_in,
            engine: DoubleBuffer::new(periph, pma_base),
            serial,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.serial.is_ready()
    }

    /// Switches the data endpoints to double buffering once the host selected the
    /// configuration.
    pub fn configure(&mut self) -> Result<()> {
        self.serial.configure(&mut self.engine)
    }

    pub fn serial(&self) -> &SerialTransport<H> {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut SerialTransport<H> {
        &mut self.serial
    }

    /// Engine and transport together, as the bridge needs them.
    pub fn split(&mut self) -> (&mut DoubleBuffer<P>, &mut SerialTransport<H>) {
        (&mut self.engine, &mut self.serial)
    }

    pub fn write_notification(&mut self, packet: &[u8]) -> Result<usize> {
        self.notify_ep.write(packet)
    }
}

impl<B: UsbBus, P: UsbPeripheral, H: SerialHooks> UsbClass<B> for CdcAcmClass<'_, B, P, H> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        writer.interface(
            self.comm_if,
            USB_CLASS_CDC,
            CDC_SUBCLASS_ACM,
            CDC_PROTOCOL_NONE,
        )?;
        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_HEADER,
                0x10, // bcdCDC
                0x01, // bcdCDC
            ],
        )?;
        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_CALL_MANAGEMENT,
                0x00, // bmCapabilities
                u8::from(self.data_if),
            ],
        )?;
        writer.write(CS_INTERFACE, &[CDC_TYPE_ACM, ACM_CAPABILITIES])?;
        writer.write(
            CS_INTERFACE,
            &[
                CDC_TYPE_UNION,
                u8::from(self.comm_if),
                u8::from(self.data_if),
            ],
        )?;
        writer.endpoint(&self.notify_ep)?;

        writer.interface(self.data_if, USB_CLASS_CDC_DATA, 0x00, 0x00)?;
        writer.endpoint(&self.data_out)?;
        writer.endpoint(&self.data_in)?;

        Ok(())
    }

    fn reset(&mut self) {
        self.engine.reset();
        self.serial.reset();
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        match self.serial.control_in(&req) {
            None => (),
            Some(InResponse::Accepted(coding)) => {
                xfer.accept_with(&coding).ok();
            }
            Some(InResponse::Rejected) => {
                xfer.reject().ok();
            }
        }
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        match self.serial.control_out(&req, xfer.data()) {
            None => (),
            Some(OutResponse::Accepted) => {
                xfer.accept().ok();
            }
            Some(OutResponse::Rejected) => {
                rprintln!("cdc: rejected request {:#04x}", req.request);
                xfer.reject().ok();
            }
        }
    }

    fn endpoint_out(&mut self, addr: EndpointAddress) {
        self.engine.notify(addr, &mut self.serial);
    }

    fn endpoint_in_complete(&mut self, addr: EndpointAddress) {
        self.engine.notify(addr, &mut self.serial);
    }
}
