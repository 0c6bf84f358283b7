//! USB HID keyboard for the ATmega32U4's built-in USB controller.
//!
//! A boot-protocol keyboard that only ever reports a single key. The driver
//! is polled from the main loop and talks to the controller through
//! avr-device registers directly.

use avr_device::atmega32u4::Peripherals;

use twikbd_core::keycode::Keycode;

/// Standard 8-byte boot keyboard report.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; 6],
        }
    }

    /// Report with at most one key held and no modifiers.
    pub fn for_key(key: Option<Keycode>) -> Self {
        let mut report = Self::empty();
        report.keys[0] = key.map_or(0, Keycode::usage);
        report
    }
}

/// USB device state, numbered like LUFA's `USB_DeviceState` so the debug
/// output matches what host-side tooling already expects.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UsbState {
    Unattached = 0,
    Powered = 1,
    Default = 2,
    Addressed = 3,
    Configured = 4,
    Suspended = 5,
}

// ============================================================================
// Descriptors
// ============================================================================

const EP0_SIZE: u8 = 8;
const KEYBOARD_EP: u8 = 1;
const KEYBOARD_EP_SIZE: u8 = 8;

const VENDOR_ID: u16 = 0x03EB;
const PRODUCT_ID: u16 = 0x2042;

static HID_REPORT_DESCRIPTOR: [u8; 64] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (LCtrl)
    0x29, 0xE7, //   Usage Maximum (RGui)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255), media usages live above 0xE7
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x10, 0x01, // bcdUSB (1.1)
    0,    // bDeviceClass (per interface)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE,
    VENDOR_ID as u8, (VENDOR_ID >> 8) as u8,
    PRODUCT_ID as u8, (PRODUCT_ID >> 8) as u8,
    0x01, 0x00, // bcdDevice (0.01)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    9, 2, 34, 0, // Configuration, wTotalLength = 34
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100 mA)
    9, 4, // Interface
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3, 1, 1, // HID, boot subclass, keyboard protocol
    0,    // iInterface
    9, 0x21, // HID
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // Report descriptor
    HID_REPORT_DESCRIPTOR.len() as u8, 0,
    7, 5, // Endpoint
    0x80 | KEYBOARD_EP, // IN
    0x03, // Interrupt
    KEYBOARD_EP_SIZE, 0,
    5,    // bInterval (5 ms)
];

static STRING_LANGUAGE: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

static STRING_MANUFACTURER: [u8; 14] = [
    14, 3, b't', 0, b'w', 0, b'i', 0, b'k', 0, b'b', 0, b'd', 0,
];

static STRING_PRODUCT: [u8; 26] = [
    26, 3, b'T', 0, b'W', 0, b'I', 0, b' ', 0, b'K', 0, b'e', 0, b'y', 0, b'b', 0, b'o', 0,
    b'a', 0, b'r', 0, b'd', 0,
];

// ============================================================================
// Control requests
// ============================================================================

/// The 8-byte SETUP packet of a control transfer.
struct SetupPacket {
    request_type: u8,
    request: u8,
    value: u16,
    length: u16,
}

impl SetupPacket {
    fn read(dp: &Peripherals) -> Self {
        let usb = &dp.USB_DEVICE;
        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    fn descriptor_type(&self) -> u8 {
        (self.value >> 8) as u8
    }

    fn descriptor_index(&self) -> u8 {
        self.value as u8
    }
}

const GET_STATUS: u8 = 0x00;
const SET_ADDRESS: u8 = 0x05;
const GET_DESCRIPTOR: u8 = 0x06;
const GET_CONFIGURATION: u8 = 0x08;
const SET_CONFIGURATION: u8 = 0x09;
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;
const HID_SET_IDLE: u8 = 0x0A;
const HID_SET_PROTOCOL: u8 = 0x0B;

pub struct UsbKeyboard {
    state: UsbState,
    /// State to return to when the bus wakes up from suspend.
    resume_state: UsbState,
    last_report: KeyboardReport,
}

impl UsbKeyboard {
    pub const fn new() -> Self {
        Self {
            state: UsbState::Unattached,
            resume_state: UsbState::Unattached,
            last_report: KeyboardReport::empty(),
        }
    }

    pub fn state(&self) -> UsbState {
        self.state
    }

    /// Bring up the pad regulator, PLL and controller, then attach.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16 MHz crystal -> PLL -> 48 MHz USB clock
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        self.state = UsbState::Powered;
    }

    /// Handle bus resets, suspend/resume and control requests.
    pub fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;
        let udint = usb.udint.read();

        if udint.eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_endpoint(dp, 0, 0b00, false, 0b000);
            self.state = UsbState::Default;
        }

        if udint.suspi().bit_is_set() {
            usb.udint.modify(|_, w| w.suspi().clear_bit());
            if self.state != UsbState::Suspended {
                self.resume_state = self.state;
                self.state = UsbState::Suspended;
            }
        }

        if udint.wakeupi().bit_is_set() {
            usb.udint.modify(|_, w| w.wakeupi().clear_bit());
            if self.state == UsbState::Suspended {
                self.state = self.resume_state;
            }
        }

        select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup(dp);
        }
    }

    /// Queue `report` on the keyboard endpoint if it differs from the last one sent.
    pub fn send_report(&mut self, dp: &Peripherals, report: &KeyboardReport) {
        if self.state != UsbState::Configured || *report == self.last_report {
            return;
        }

        let usb = &dp.USB_DEVICE;
        select_endpoint(dp, KEYBOARD_EP);

        // Bank busy: try again on the next pass instead of waiting.
        if usb.ueintx.read().rwal().bit_is_clear() {
            return;
        }

        write_report(dp, report);
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        self.last_report = *report;
    }

    fn configure_endpoint(&self, dp: &Peripherals, ep: u8, kind: u8, is_in: bool, size: u8) {
        let usb = &dp.USB_DEVICE;

        select_endpoint(dp, ep);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x
            .write(|w| w.eptype().bits(kind).epdir().bit(is_in));
        usb.uecfg1x.write(|w| w.epsize().bits(size).alloc().set_bit());
    }

    fn handle_setup(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;
        let setup = SetupPacket::read(dp);
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        match (setup.request_type, setup.request) {
            (0x80, GET_DESCRIPTOR) => {
                let descriptor: &[u8] = match (setup.descriptor_type(), setup.descriptor_index()) {
                    (1, _) => &DEVICE_DESCRIPTOR,
                    (2, _) => &CONFIG_DESCRIPTOR,
                    (3, 0) => &STRING_LANGUAGE,
                    (3, 1) => &STRING_MANUFACTURER,
                    (3, 2) => &STRING_PRODUCT,
                    _ => return stall(dp),
                };
                send_control_data(dp, descriptor, setup.length);
            }
            (0x81, GET_DESCRIPTOR) if setup.descriptor_type() == 0x22 => {
                send_control_data(dp, &HID_REPORT_DESCRIPTOR, setup.length);
            }
            (0x00, SET_ADDRESS) => {
                // Status stage goes out on the old address first
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(setup.value as u8 & 0x7F).adden().set_bit());
                self.state = UsbState::Addressed;
            }
            (0x00, SET_CONFIGURATION) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                if setup.value as u8 == 1 {
                    self.configure_endpoint(dp, KEYBOARD_EP, 0b11, true, 0b000);
                    self.last_report = KeyboardReport::empty();
                    self.state = UsbState::Configured;
                } else {
                    self.state = UsbState::Addressed;
                }
            }
            (0x80, GET_CONFIGURATION) => {
                let configured = self.state == UsbState::Configured;
                send_control_data(dp, &[configured as u8], setup.length);
            }
            (0x80, GET_STATUS) => send_control_data(dp, &[0, 0], setup.length),
            (0xA1, HID_GET_REPORT) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                write_report(dp, &self.last_report);
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                wait_status_out(dp);
            }
            (0x21, HID_SET_IDLE) | (0x21, HID_SET_PROTOCOL) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }
            (0x21, HID_SET_REPORT) => {
                // LED state from the host; nothing to drive with it.
                while usb.ueintx.read().rxouti().bit_is_clear() {}
                usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }
            _ => stall(dp),
        }
    }
}

fn select_endpoint(dp: &Peripherals, ep: u8) {
    dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
}

fn write_report(dp: &Peripherals, report: &KeyboardReport) {
    let usb = &dp.USB_DEVICE;
    usb.uedatx.write(|w| w.bits(report.modifiers));
    usb.uedatx.write(|w| w.bits(report.reserved));
    for &key in &report.keys {
        usb.uedatx.write(|w| w.bits(key));
    }
}

/// IN data stage in EP0-sized chunks, followed by the host's status ZLP.
fn send_control_data(dp: &Peripherals, data: &[u8], max_length: u16) {
    let usb = &dp.USB_DEVICE;
    let len = core::cmp::min(data.len(), max_length as usize);

    for chunk in data[..len].chunks(EP0_SIZE as usize) {
        while usb.ueintx.read().txini().bit_is_clear() {}
        for &byte in chunk {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    wait_status_out(dp);
}

fn wait_status_out(dp: &Peripherals) {
    let usb = &dp.USB_DEVICE;
    while usb.ueintx.read().rxouti().bit_is_clear() {}
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

fn stall(dp: &Peripherals) {
    dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
}
