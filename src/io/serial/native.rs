// src/io/serial/native.rs
//
// Line settings applied to the open native port: Mark/Space ("stick")
// parity and 1.5 stop bits. `utils::check_line_settings` has already
// rejected whatever the platform cannot do.

use crate::settings::{Parity, StopBits};

// ============================================================================
// Linux
// ============================================================================

#[cfg(any(target_os = "linux", target_os = "android"))]
use nix::sys::termios::ControlFlags;

/// Control flags for stick parity: PARENB | CMSPAR, with PARODD selecting Mark.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn stick_parity_flags(mut flags: ControlFlags, parity: Parity) -> ControlFlags {
    let mark = match parity {
        Parity::Mark => true,
        Parity::Space => false,
        _ => return flags,
    };
    flags.insert(ControlFlags::PARENB | ControlFlags::CMSPAR);
    flags.set(ControlFlags::PARODD, mark);
    flags
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn apply_line_settings(
    port: &serialport::TTYPort,
    parity: Parity,
    _stop_bits: StopBits,
) -> Result<(), String> {
    use nix::sys::termios::{tcgetattr, tcsetattr, SetArg};
    use std::os::fd::{AsRawFd, BorrowedFd};

    if !matches!(parity, Parity::Mark | Parity::Space) {
        return Ok(());
    }

    // SAFETY: the descriptor is owned by `port`, which outlives `fd`
    let fd = unsafe { BorrowedFd::borrow_raw(port.as_raw_fd()) };
    let mut attrs =
        tcgetattr(fd).map_err(|e| format!("Failed to read line settings: {}", e))?;
    attrs.control_flags = stick_parity_flags(attrs.control_flags, parity);
    tcsetattr(fd, SetArg::TCSANOW, &attrs)
        .map_err(|e| format!("Failed to set {} parity: {}", parity.label(), e))?;

    tlog!("[Serial] {} parity applied", parity.label());
    Ok(())
}

// ============================================================================
// Other Unix
// ============================================================================

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub fn apply_line_settings(
    _port: &serialport::TTYPort,
    _parity: Parity,
    _stop_bits: StopBits,
) -> Result<(), String> {
    Ok(())
}

// ============================================================================
// Windows
// ============================================================================

/// DCB `Parity` and `StopBits` overrides, if any.
#[cfg(windows)]
fn dcb_overrides(parity: Parity, stop_bits: StopBits) -> (Option<u8>, Option<u8>) {
    use windows_sys::Win32::Devices::Communication::{MARKPARITY, ONE5STOPBITS, SPACEPARITY};

    let parity = match parity {
        Parity::Mark => Some(MARKPARITY),
        Parity::Space => Some(SPACEPARITY),
        _ => None,
    };
    let stop_bits = (stop_bits == StopBits::OneAndHalf).then_some(ONE5STOPBITS);
    (parity, stop_bits)
}

#[cfg(windows)]
pub fn apply_line_settings(
    port: &serialport::COMPort,
    parity: Parity,
    stop_bits: StopBits,
) -> Result<(), String> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Devices::Communication::{GetCommState, SetCommState, DCB};
    use windows_sys::Win32::Foundation::HANDLE;

    let (dcb_parity, dcb_stop_bits) = dcb_overrides(parity, stop_bits);
    if dcb_parity.is_none() && dcb_stop_bits.is_none() {
        return Ok(());
    }

    let handle = port.as_raw_handle() as HANDLE;
    // SAFETY: DCB is plain old data
    let mut dcb: DCB = unsafe { std::mem::zeroed() };
    dcb.DCBlength = std::mem::size_of::<DCB>() as u32;

    // SAFETY: `handle` is the open port owned by `port`; `dcb` is a valid DCB
    if unsafe { GetCommState(handle, &mut dcb) } == 0 {
        return Err(format!(
            "Failed to read line settings: {}",
            std::io::Error::last_os_error()
        ));
    }
    if let Some(p) = dcb_parity {
        dcb.Parity = p;
    }
    if let Some(s) = dcb_stop_bits {
        dcb.StopBits = s;
    }
    if unsafe { SetCommState(handle, &dcb) } == 0 {
        return Err(format!(
            "Failed to apply line settings: {}",
            std::io::Error::last_os_error()
        ));
    }

    tlog!(
        "[Serial] Line settings applied (parity: {}, stop bits: {})",
        parity.label(),
        stop_bits.label()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_stick_parity_flags() {
        let base = ControlFlags::CS8 | ControlFlags::CREAD;

        let mark = stick_parity_flags(base, Parity::Mark);
        assert!(mark.contains(ControlFlags::PARENB | ControlFlags::CMSPAR | ControlFlags::PARODD));
        assert!(mark.contains(base));

        let space = stick_parity_flags(base | ControlFlags::PARODD, Parity::Space);
        assert!(space.contains(ControlFlags::PARENB | ControlFlags::CMSPAR));
        assert!(!space.contains(ControlFlags::PARODD));

        assert_eq!(stick_parity_flags(base, Parity::Even), base);
        assert_eq!(stick_parity_flags(base, Parity::None), base);
    }

    #[cfg(windows)]
    #[test]
    fn test_dcb_overrides() {
        use windows_sys::Win32::Devices::Communication::{MARKPARITY, ONE5STOPBITS, SPACEPARITY};

        assert_eq!(dcb_overrides(Parity::Mark, StopBits::One), (Some(MARKPARITY), None));
        assert_eq!(dcb_overrides(Parity::Space, StopBits::Two), (Some(SPACEPARITY), None));
        assert_eq!(
            dcb_overrides(Parity::None, StopBits::OneAndHalf),
            (None, Some(ONE5STOPBITS))
        );
        assert_eq!(dcb_overrides(Parity::Odd, StopBits::One), (None, None));
    }
}
