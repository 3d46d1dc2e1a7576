//! USB identity of the GE150 family.

/// STMicroelectronics vendor ID used by the device.
pub const MOOER_VENDOR_ID: u16 = 0x0483;

pub const GE150_PRODUCT_ID: u16 = 0x5703;

/// HID interface carrying the control protocol.
pub const CONTROL_INTERFACE: i32 = 3;

/// Default timeout for one interrupt read.
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 1000;

/// `true` when a VID/PID pair is a supported device.
pub fn is_ge150(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == MOOER_VENDOR_ID && product_id == GE150_PRODUCT_ID
}

/// `true` for the one HID interface of a GE150 that speaks the control
/// protocol. The device enumerates further interfaces (audio, MIDI).
pub fn is_control_interface(vendor_id: u16, product_id: u16, interface: i32) -> bool {
    is_ge150(vendor_id, product_id) && interface == CONTROL_INTERFACE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert!(is_ge150(0x0483, 0x5703));
        assert!(!is_ge150(0x0483, 0x5740));
    }

    #[test]
    fn test_control_interface() {
        assert!(is_control_interface(0x0483, 0x5703, 3));
        assert!(!is_control_interface(0x0483, 0x5703, 0));
        assert!(!is_control_interface(0x0483, 0x5740, 3));
    }
}
