pub trait Field: Into<u8> {}

pub trait BitField<F: Field>: Copy + Into<u8> {
    fn has(&self, field: F) -> bool {
        let value: u8 = (*self).into();
        value & (1 << field.into()) > 0
    }

    fn no(&self, field: F) -> Option<()> {
        return if !self.has(field) { Some(()) } else { None };
    }
}

#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
pub enum R1ResponseField {
    Idle = 0,
    EraseReset,
    IllegalCommand,
    CommandCRC,
    EraseSequence,
    Address,
    Parameter,
    /// Always clear in a valid response
    Start,
}

impl Into<u8> for R1ResponseField {
    fn into(self) -> u8 {
        self as u8
    }
}

impl Field for R1ResponseField {}

/// Value returned when no response arrived within the poll window.
pub const NO_RESPONSE: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct R1Response(pub u8);

impl R1Response {
    /// The card accepted the command and left idle state.
    pub fn ready(self) -> bool {
        self.0 == 0
    }

    /// The card accepted the command and is still initializing.
    pub fn idle(self) -> bool {
        self.0 == 1 << R1ResponseField::Idle as u8
    }

    /// Accepted, idle or not.
    pub fn accepted(self) -> bool {
        self.0 <= 1
    }

    pub fn valid(self) -> bool {
        self.no(R1ResponseField::Start).is_some()
    }
}

impl From<u8> for R1Response {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl Into<u8> for R1Response {
    fn into(self) -> u8 {
        self.0 as u8
    }
}

impl BitField<R1ResponseField> for R1Response {}

pub const BLOCK_READ_DATA_TOKEN: u8 = 0xFE;

pub enum WriteToken {
    SingleWrite = 0xFE,
}

pub enum ResponseCode {
    Accepted,
    CRCError,
    WriteError,
}

/// Data response token sent by the card after a written block.
#[derive(Copy, Clone, Debug)]
pub struct DataResponse(u8);

impl DataResponse {
    pub fn try_from(value: u8) -> Option<Self> {
        // 0bxxx0xxx1
        return if value & 0b10001 == 0b00001 { Some(Self(value)) } else { None };
    }

    pub fn response_code(self) -> Option<ResponseCode> {
        match self.0 >> 1 & 0b111 {
            0x2 => Some(ResponseCode::Accepted),
            0x5 => Some(ResponseCode::CRCError),
            0x6 => Some(ResponseCode::WriteError),
            _ => None,
        }
    }

    pub fn accepted(self) -> bool {
        match self.response_code() {
            Some(ResponseCode::Accepted) => true,
            _ => false,
        }
    }
}
