// src/io/serial/ports.rs
//
// Serial port enumeration for the settings dialog and `--list`.

use serde::Serialize;

/// Placeholder for port details the OS did not report.
pub const BLANK: &str = "N/A";

/// Information about an available serial port
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Detail lines shown under the port selector.
    pub fn info_lines(&self) -> Vec<String> {
        let text = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(BLANK)
                .to_string()
        };
        let hex_id = |v: Option<u16>| match v {
            Some(id) if id != 0 => format!("{:x}", id),
            _ => BLANK.to_string(),
        };

        vec![
            format!("Description: {}", text(&self.product)),
            format!("Manufacturer: {}", text(&self.manufacturer)),
            format!("Serial number: {}", text(&self.serial_number)),
            format!("Location: {}", self.port_name),
            format!("Vendor Identifier: {}", hex_id(self.vid)),
            format!("Product Identifier: {}", hex_id(self.pid)),
        ]
    }
}

/// Whether a device node belongs in the port list. macOS exposes every
/// device twice; only the `/dev/cu.*` call-out node is listed.
fn is_listed(port_name: &str) -> bool {
    !(cfg!(target_os = "macos") && port_name.starts_with("/dev/tty."))
}

impl From<serialport::SerialPortInfo> for SerialPortInfo {
    fn from(port: serialport::SerialPortInfo) -> Self {
        let mut info = SerialPortInfo {
            port_name: port.port_name,
            port_type: String::new(),
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        };
        info.port_type = match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                info.manufacturer = usb.manufacturer;
                info.product = usb.product;
                info.serial_number = usb.serial_number;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                "USB"
            }
            serialport::SerialPortType::BluetoothPort => "Bluetooth",
            serialport::SerialPortType::PciPort => "PCI",
            serialport::SerialPortType::Unknown => "Unknown",
        }
        .to_string();
        info
    }
}

/// Ports for the settings dialog and `--list`, with USB details when known.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|p| is_listed(&p.port_name))
        .map(SerialPortInfo::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lines_usb() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: "USB".to_string(),
            manufacturer: Some("FTDI".to_string()),
            product: Some("FT232R USB UART".to_string()),
            serial_number: Some("A50285BI".to_string()),
            vid: Some(0x0403),
            pid: Some(0x6001),
        };
        let lines = info.info_lines();
        assert_eq!(lines[0], "Description: FT232R USB UART");
        assert_eq!(lines[1], "Manufacturer: FTDI");
        assert_eq!(lines[3], "Location: /dev/ttyUSB0");
        assert_eq!(lines[4], "Vendor Identifier: 403");
        assert_eq!(lines[5], "Product Identifier: 6001");
    }

    #[test]
    fn test_info_lines_blank_fields() {
        let info = SerialPortInfo {
            port_name: "COM1".to_string(),
            port_type: "PCI".to_string(),
            manufacturer: None,
            product: Some(String::new()),
            serial_number: None,
            vid: None,
            pid: None,
        };
        let lines = info.info_lines();
        assert_eq!(lines[0], "Description: N/A");
        assert_eq!(lines[2], "Serial number: N/A");
        assert_eq!(lines[4], "Vendor Identifier: N/A");
    }

    #[test]
    fn test_from_usb_port() {
        let info = SerialPortInfo::from(serialport::SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: serialport::SerialPortType::UsbPort(serialport::UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: Some("7543".to_string()),
                manufacturer: Some("Arduino".to_string()),
                product: Some("Uno".to_string()),
            }),
        });
        assert_eq!(info.port_type, "USB");
        assert_eq!(info.manufacturer.as_deref(), Some("Arduino"));
        assert_eq!(info.vid, Some(0x2341));
        assert_eq!(info.info_lines()[5], "Product Identifier: 43");
    }

    #[test]
    fn test_from_pci_port_has_no_usb_details() {
        let info = SerialPortInfo::from(serialport::SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: serialport::SerialPortType::PciPort,
        });
        assert_eq!(info.port_type, "PCI");
        assert_eq!(info.vid, None);
        assert_eq!(info.manufacturer, None);
    }

    #[test]
    fn test_is_listed() {
        assert!(is_listed("/dev/cu.usbserial-1410"));
        assert!(is_listed("COM3"));
        assert_eq!(is_listed("/dev/tty.usbserial-1410"), !cfg!(target_os = "macos"));
    }
}
