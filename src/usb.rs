#![allow(static_mut_refs)]

// Device specific
use pimoroni_tiny2040 as bsp;

use bsp::hal;
use bsp::hal::pac;

// USB Device support
use usb_device::{class_prelude::*, prelude::*};

// USB Human Interface Device (HID) Class support
use usbd_hid::descriptor::generator_prelude::*;
use usbd_hid::descriptor::KeyboardReport;
use usbd_hid::hid_class::HIDClass;

use usb_device::UsbError;

use ducky::{Report, Transport};

/// USB

/// Vendor and product IDs, the pid.codes test range.
const VID_PID: UsbVidPid = UsbVidPid(0x1209, 0x0001);

/// Interrupt endpoint polling interval, in ms.
const POLL_MS: u8 = 10;

/// The USB Device Driver (shared with the playback interrupt).
static mut USB_DEVICE: Option<UsbDevice<hal::usb::UsbBus>> = None;

/// The USB Bus Driver (shared with the playback interrupt).
static mut USB_BUS: Option<UsbBusAllocator<hal::usb::UsbBus>> = None;

/// The USB Human Interface Device Driver (shared with the playback interrupt).
static mut USB_HID: Option<HIDClass<hal::usb::UsbBus>> = None;

/// Sets up the USB driver. This will set the global USB device.
///
/// IMPORTANT: Call this before interrupts are enabled.
pub fn setup_usb_driver(
    usbctrl_regs: pac::USBCTRL_REGS,
    usbctrl_dpram: pac::USBCTRL_DPRAM,
    usb_clock: hal::clocks::UsbClock,
    resets: &mut pac::RESETS,
) {
    let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
        usbctrl_regs,
        usbctrl_dpram,
        usb_clock,
        true,
        resets,
    ));

    unsafe {
        // Note (safety): This is safe as interrupts haven't been started yet
        USB_BUS = Some(usb_bus);
    }

    let usb_dev = {
        // Grab a reference to the USB Bus allocator. We are promising to the
        // compiler not to take mutable access to this global variable whilst this
        // reference exists!
        let bus_ref = unsafe { USB_BUS.as_ref().unwrap() };

        // Set up the USB HID Class Device driver, boot keyboard reports
        let usb_hid = HIDClass::new(bus_ref, KeyboardReport::desc(), POLL_MS);
        unsafe {
            // Note (safety): This is safe as interrupts haven't been started yet.
            USB_HID = Some(usb_hid);
        }

        UsbDeviceBuilder::new(bus_ref, VID_PID)
            .strings(&[StringDescriptors::default()
                .manufacturer("ICE9")
                .product("Uberducky")
                .serial_number("00000000000000000000000000000001")])
            .unwrap()
            .device_class(0)
            .build()
    };

    unsafe {
        // Note (safety): This is safe as interrupts haven't been started yet
        USB_DEVICE = Some(usb_dev);
    }
}

/// Submit a new HID report to the USB stack.
///
/// We do this with interrupts disabled (critical_section), to avoid a race hazard
/// with the main loop polling the device.
pub fn push_hid_report(report: KeyboardReport) -> Result<usize, UsbError> {
    critical_section::with(|_| unsafe {
        // Now interrupts are disabled, grab the global variable and, if
        // available, send it a HID report
        USB_HID.as_mut().map(|hid| hid.push_input(&report))
    })
    .unwrap_or(Err(UsbError::InvalidState))
}

/// Service the USB stack: enumeration, control requests, endpoint traffic.
/// Called continuously from the main loop.
pub fn poll() {
    critical_section::with(|_| unsafe {
        if let (Some(usb_dev), Some(usb_hid)) = (USB_DEVICE.as_mut(), USB_HID.as_mut()) {
            usb_dev.poll(&mut [usb_hid]);
        }
    })
}

/// Whether the host has configured us, i.e. reports will be read.
pub fn configured() -> bool {
    critical_section::with(|_| unsafe {
        USB_DEVICE
            .as_ref()
            .map(|usb_dev| usb_dev.state() == UsbDeviceState::Configured)
            .unwrap_or(false)
    })
}

/// Playback's way out: the keyboard's interrupt IN endpoint.
pub struct UsbTransport;

impl Transport for UsbTransport {
    fn send(&mut self, report: Report) {
        // Fire and forget: a report the endpoint can't take is lost, never retried
        match push_hid_report(report.into()) {
            Ok(_) => {}
            Err(UsbError::WouldBlock) => defmt::warn!("endpoint busy, dropped {:?}", report),
            Err(_) => defmt::warn!("usb not ready, dropped {:?}", report),
        }
    }
}
