//! CDC-ACM wire types.
pub const USB_CLASS_CDC: u8 = 0x02;
pub const USB_CLASS_CDC_DATA: u8 = 0x0a;
pub const CDC_SUBCLASS_ACM: u8 = 0x02;
pub const CDC_PROTOCOL_NONE: u8 = 0x00;

pub const CS_INTERFACE: u8 = 0x24;
pub const CDC_TYPE_HEADER: u8 = 0x00;
pub const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
pub const CDC_TYPE_ACM: u8 = 0x02;
pub const CDC_TYPE_UNION: u8 = 0x06;

pub const REQ_SET_LINE_CODING: u8 = 0x20;
pub const REQ_GET_LINE_CODING: u8 = 0x21;
pub const REQ_SET_CONTROL_LINE_STATE: u8 = 0x22;

pub const NOTIFY_SERIAL_STATE: u8 = 0x20;
/// bmRequestType of a class notification sent to an interface.
const NOTIFICATION_REQUEST_TYPE: u8 = 0xa1;

/// Size of a SERIAL_STATE notification.
pub const SERIAL_STATE_PACKET_SIZE: usize = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineCodingError {
    /// Fewer than 7 bytes of payload.
    Truncated,
    BaudRate,
    StopBits,
    Parity,
    DataBits,
}

/// Baud rates the UART can produce.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineCodingLimits {
    pub min_baud: u32,
    pub max_baud: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineCoding {
    pub baud_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: u8,
}

impl LineCoding {
    pub const SIZE: usize = 7;

    /// 8N1 at `baud_rate`.
    pub fn new(baud_rate: u32) -> LineCoding {
        LineCoding {
            baud_rate,
            stop_bits: StopBits::One,
            parity: Parity::None,
            data_bits: 8,
        }
    }

    /// Decodes the SET_LINE_CODING payload.
    pub fn parse(data: &[u8]) -> Result<LineCoding, LineCodingError> {
        if data.len() < Self::SIZE {
            return Err(LineCodingError::Truncated);
        }
        let stop_bits = match data[4] {
            0 => StopBits::One,
            1 => StopBits::OnePointFive,
            2 => StopBits::Two,
            _ => return Err(LineCodingError::StopBits),
        };
        let parity = match data[5] {
            0 => Parity::None,
            1 => Parity::Odd,
            2 => Parity::Even,
            3 => Parity::Mark,
            4 => Parity::Space,
            _ => return Err(LineCodingError::Parity),
        };
        Ok(LineCoding {
            baud_rate: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            stop_bits,
            parity,
            data_bits: data[6],
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let baud = self.baud_rate.to_le_bytes();
        let stop_bits = match self.stop_bits {
            StopBits::One => 0,
            StopBits::OnePointFive => 1,
            StopBits::Two => 2,
        };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Odd => 1,
            Parity::Even => 2,
            Parity::Mark => 3,
            Parity::Space => 4,
        };
        [
            baud[0],
            baud[1],
            baud[2],
            baud[3],
            stop_bits,
            parity,
            self.data_bits,
        ]
    }

    /// Checks that the UART can run this format: baud rate within `limits`, 7 or 8
    /// data bits and no mark or space parity.
    pub fn validate(&self, limits: &LineCodingLimits) -> Result<(), LineCodingError> {
        if self.baud_rate < limits.min_baud || self.baud_rate > limits.max_baud {
            return Err(LineCodingError::BaudRate);
        }
        match self.parity {
            Parity::Mark | Parity::Space => return Err(LineCodingError::Parity),
            _ => (),
        }
        match self.data_bits {
            7 | 8 => Ok(()),
            _ => Err(LineCodingError::DataBits),
        }
    }

    /// UART frame word length: data bits plus the parity bit.
    pub fn word_length(&self) -> u8 {
        match self.parity {
            Parity::None => self.data_bits,
            _ => self.data_bits + 1,
        }
    }
}

/// DTR and RTS as set by SET_CONTROL_LINE_STATE.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlLines {
    pub dtr: bool,
    pub rts: bool,
}

impl From<u16> for ControlLines {
    fn from(value: u16) -> ControlLines {
        ControlLines {
            dtr: value & 0x0001 != 0,
            rts: value & 0x0002 != 0,
        }
    }
}

/// UART state bitmap of a SERIAL_STATE notification.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SerialState(u16);

impl SerialState {
    pub const RX_CARRIER: SerialState = SerialState(1 << 0);
    pub const TX_CARRIER: SerialState = SerialState(1 << 1);
    pub const BREAK: SerialState = SerialState(1 << 2);
    pub const RING_SIGNAL: SerialState = SerialState(1 << 3);
    pub const FRAMING_ERROR: SerialState = SerialState(1 << 4);
    pub const PARITY_ERROR: SerialState = SerialState(1 << 5);
    pub const OVERRUN: SerialState = SerialState(1 << 6);

    /// Carrier detect and DSR asserted, no errors.
    pub const DEFAULT: SerialState = SerialState(Self::RX_CARRIER.0 | Self::TX_CARRIER.0);

    pub const fn empty() -> SerialState {
        SerialState(0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: SerialState) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for SerialState {
    type Output = SerialState;

    fn bitor(self, rhs: SerialState) -> SerialState {
        SerialState(self.0 | rhs.0)
    }
}

/// Builds the SERIAL_STATE notification for communication interface `interface`.
pub fn serial_state_notification(interface: u8, state: SerialState) -> [u8; SERIAL_STATE_PACKET_SIZE] {
    let bits = state.bits().to_le_bytes();
    [
        NOTIFICATION_REQUEST_TYPE,
        NOTIFY_SERIAL_STATE,
        0,
        0, // wValue
        interface,
        0, // wIndex
        2,
        0, // wLength
        bits[0],
        bits[1],
    ]
}
