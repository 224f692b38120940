// src/io/serial/utils.rs
//
// Conversions from the persisted line parameters to the serialport crate's types.
// Mark/Space parity and 1.5 stop bits have no builder option; the port opens
// without them and `native::apply_line_settings` sets them afterwards.

use serialport::{
    DataBits as SpDataBits, FlowControl as SpFlowControl, Parity as SpParity,
    StopBits as SpStopBits,
};

use crate::settings::{DataBits, FlowControl, Parity, StopBits};

/// Reject line settings this platform cannot produce.
pub fn check_line_settings(parity: Parity, stop_bits: StopBits) -> Result<(), String> {
    if !Parity::available().contains(&parity) {
        return Err(format!(
            "{} parity is not supported on this platform",
            parity.label()
        ));
    }
    if !StopBits::available().contains(&stop_bits) {
        return Err(format!(
            "{} stop bits are not supported on this platform",
            stop_bits.label()
        ));
    }
    Ok(())
}

/// Builder parity. Mark and Space open as None and are applied natively.
pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
        Parity::None | Parity::Mark | Parity::Space => SpParity::None,
    }
}

pub fn to_serialport_data_bits(bits: DataBits) -> SpDataBits {
    match bits {
        DataBits::Five => SpDataBits::Five,
        DataBits::Six => SpDataBits::Six,
        DataBits::Seven => SpDataBits::Seven,
        DataBits::Eight => SpDataBits::Eight,
    }
}

/// Builder stop bits. 1.5 opens as 1 and is applied natively.
pub fn to_serialport_stop_bits(bits: StopBits) -> SpStopBits {
    match bits {
        StopBits::One | StopBits::OneAndHalf => SpStopBits::One,
        StopBits::Two => SpStopBits::Two,
    }
}

pub fn to_serialport_flow_control(flow: FlowControl) -> SpFlowControl {
    match flow {
        FlowControl::None => SpFlowControl::None,
        FlowControl::Hardware => SpFlowControl::Hardware,
        FlowControl::Software => SpFlowControl::Software,
    }
}

/// Short line-format tag for logs, e.g. `8N1`.
pub fn line_format(data_bits: DataBits, parity: Parity, stop_bits: StopBits) -> String {
    let parity = match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
        Parity::Mark => 'M',
        Parity::Space => 'S',
    };
    format!("{}{}{}", data_bits.label(), parity, stop_bits.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_serialport_parity() {
        assert!(matches!(to_serialport_parity(Parity::None), SpParity::None));
        assert!(matches!(to_serialport_parity(Parity::Odd), SpParity::Odd));
        assert!(matches!(to_serialport_parity(Parity::Even), SpParity::Even));
        assert!(matches!(to_serialport_parity(Parity::Mark), SpParity::None));
        assert!(matches!(to_serialport_parity(Parity::Space), SpParity::None));
    }

    #[test]
    fn test_check_line_settings_follows_platform() {
        assert!(check_line_settings(Parity::Even, StopBits::Two).is_ok());

        let sticky = cfg!(any(target_os = "linux", target_os = "android", windows));
        assert_eq!(check_line_settings(Parity::Mark, StopBits::One).is_ok(), sticky);
        assert_eq!(check_line_settings(Parity::Space, StopBits::One).is_ok(), sticky);
        if !sticky {
            let err = check_line_settings(Parity::Mark, StopBits::One).unwrap_err();
            assert!(err.contains("Mark"));
        }

        assert_eq!(
            check_line_settings(Parity::None, StopBits::OneAndHalf).is_ok(),
            cfg!(windows)
        );
    }

    #[test]
    fn test_to_serialport_data_bits() {
        assert!(matches!(to_serialport_data_bits(DataBits::Five), SpDataBits::Five));
        assert!(matches!(to_serialport_data_bits(DataBits::Six), SpDataBits::Six));
        assert!(matches!(to_serialport_data_bits(DataBits::Seven), SpDataBits::Seven));
        assert!(matches!(to_serialport_data_bits(DataBits::Eight), SpDataBits::Eight));
    }

    #[test]
    fn test_to_serialport_stop_bits() {
        assert!(matches!(to_serialport_stop_bits(StopBits::One), SpStopBits::One));
        assert!(matches!(to_serialport_stop_bits(StopBits::Two), SpStopBits::Two));
        assert!(matches!(to_serialport_stop_bits(StopBits::OneAndHalf), SpStopBits::One));
    }

    #[test]
    fn test_to_serialport_flow_control() {
        assert!(matches!(to_serialport_flow_control(FlowControl::None), SpFlowControl::None));
        assert!(matches!(
            to_serialport_flow_control(FlowControl::Hardware),
            SpFlowControl::Hardware
        ));
        assert!(matches!(
            to_serialport_flow_control(FlowControl::Software),
            SpFlowControl::Software
        ));
    }

    #[test]
    fn test_line_format() {
        assert_eq!(line_format(DataBits::Eight, Parity::None, StopBits::One), "8N1");
        assert_eq!(line_format(DataBits::Seven, Parity::Even, StopBits::Two), "7E2");
    }
}
