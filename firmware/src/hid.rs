use cdc_bridge::hid_keypad::{
    build_report_descriptor, descriptor_len, report_len, KeyUsage, KeypadReport,
};
use usb_device::class_prelude::*;
use usb_device::Result;

pub const USB_CLASS_HID: u8 = 0x03;

const USB_SUBCLASS_NONE: u8 = 0x00;
const USB_INTERFACE_KEYBOARD: u8 = 0x01;

const DESCRIPTOR_HID: u8 = 0x21;
const DESCRIPTOR_REPORT: u8 = 0x22;

const REQ_GET_REPORT: u8 = 0x01;

pub struct HidKeypadClass<'a, B: UsbBus> {
    report_if: InterfaceNumber,
    report_ep: EndpointIn<'a, B>,
    report: KeypadReport<'a>,
    descriptor: &'a [u8],
}

impl<'a, B: UsbBus> HidKeypadClass<'a, B> {
    /// One report bit per entry of `keys`; `KEY_NONE` entries are left out. The
    /// report descriptor is built into `descriptor_buf`.
    ///
    /// `None` if there are too many keys or `descriptor_buf` is too small.
    pub fn new(
        alloc: &'a UsbBusAllocator<B>,
        keys: &'a [KeyUsage],
        descriptor_buf: &'a mut [u8],
    ) -> Option<HidKeypadClass<'a, B>> {
        let report = KeypadReport::new(keys)?;
        let len = build_report_descriptor(keys, descriptor_buf)?;
        debug_assert_eq!(len, descriptor_len(report.n_keys()));
        let descriptor: &'a [u8] = descriptor_buf;
        Some(HidKeypadClass {
            report_if: alloc.interface(),
            report_ep: alloc.interrupt(report_len(report.n_keys()).max(1) as u16, 1),
            report,
            descriptor: &descriptor[..len],
        })
    }

    pub fn key_down(&mut self, key: KeyUsage) {
        self.report.key_down(key);
    }

    pub fn key_up(&mut self, key: KeyUsage) {
        self.report.key_up(key);
    }

    /// Sends the report if it changed since it was last sent.
    pub fn send(&mut self) -> Result<()> {
        if !self.report.needs_update() {
            return Ok(());
        }
        self.report_ep.write(self.report.as_bytes())?;
        self.report.mark_sent();
        Ok(())
    }

    fn hid_descriptor(&self) -> [u8; 7] {
        let len = self.descriptor.len() as u16;
        [
            0x11,              // bcdHID
            0x01,              // bcdHID
            0x00,              // bCountryCode
            0x01,              // bNumDescriptors
            DESCRIPTOR_REPORT, // bDescriptorType
            len as u8,         // wDescriptorLength
            (len >> 8) as u8,  // wDescriptorLength
        ]
    }
}

impl<B: UsbBus> UsbClass<B> for HidKeypadClass<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        writer.interface(
            self.report_if,
            USB_CLASS_HID,
            USB_SUBCLASS_NONE,
            USB_INTERFACE_KEYBOARD,
        )?;
        writer.write(DESCRIPTOR_HID, &self.hid_descriptor())?;
        writer.endpoint(&self.report_ep)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.report.invalidate();
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();

        if req.request_type == control::RequestType::Standard
            && req.recipient == control::Recipient::Interface
            && req.request == control::Request::GET_DESCRIPTOR
            && req.index == u8::from(self.report_if) as u16
        {
            let (dtype, _index) = req.descriptor_type_index();
            if dtype == DESCRIPTOR_HID {
                let mut descr = [0u8; 9];
                descr[0] = 9;
                descr[1] = DESCRIPTOR_HID;
                descr[2..].copy_from_slice(&self.hid_descriptor());
                xfer.accept_with(&descr).ok();
            } else if dtype == DESCRIPTOR_REPORT {
                // the host reads the report layout after configuration
                self.report.invalidate();
                xfer.accept_with(self.descriptor).ok();
            }
            return;
        }

        if !(req.request_type == control::RequestType::Class
            && req.recipient == control::Recipient::Interface
            && req.index == u8::from(self.report_if) as u16)
        {
            return;
        }

        match req.request {
            REQ_GET_REPORT => {
                xfer.accept_with(self.report.as_bytes()).ok();
            }
            _ => {
                xfer.reject().ok();
            }
        }
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = xfer.request();

        if !(req.request_type == control::RequestType::Class
            && req.recipient == control::Recipient::Interface
            && req.index == u8::from(self.report_if) as u16)
        {
            return;
        }

        xfer.reject().ok();
    }
}
