/*!
    CANopen SDO abort codes.

    A driver whose SDO exchange is aborted by the slave reports it as a [crate::MasterError] of kind `Protocol`, carrying the abort code returned by the slave. These are the codes defined by CiA 301 (and repeated in ETG.1000.6 5.6.2.7.2).
*/

use bilge::prelude::*;


#[bitsize(32)]
#[derive(TryFromBits, Debug, Copy, Clone, Eq, PartialEq)]
pub enum SdoAbortCode {
    /// Toggle bit not changed
    BadToggle = 0x05_03_00_00,
    /// SDO protocol timeout
    Timeout = 0x05_04_00_00,
    /// Client/Server command specifier not valid or unknown
    UnsupportedCommand = 0x05_04_00_01,
    /// Out of memory
    OufOfMemory = 0x05_04_00_05,
    /// Unsupported access to an object
    UnsupportedAccess = 0x06_01_00_00,
    /// Attempt to read to a write only object
    WriteOnly = 0x06_01_00_01,
    /// Attempt to write to a read only object
    ReadOnly = 0x06_01_00_02,
    /// The object does not exist in the object directory
    InvalidIndex = 0x06_02_00_00,
    /// The object can not be mapped into the PDO
    CannotMap = 0x06_04_00_41,
    /// The number and length of the objects to be mapped would exceed the PDO length
    PdoTooSmall = 0x06_04_00_42,
    /// General parameter incompatibility reason
    IncompatibleParameter = 0x06_04_00_43,
    /// General internal incompatibility in the device
    IncompatibleDevice = 0x06_04_00_47,
    /// Access failed due to a hardware error
    HardwareError = 0x06_06_00_00,
    /// Data type does not match, length of service parameter does not match
    InvalidLength = 0x06_07_00_10,
    /// Data type does not match, length of service parameter too high
    ServiceTooBig = 0x06_07_00_12,
    /// Data type does not match, length of service parameter too low
    ServiceTooSmall = 0x06_07_00_13,
    /// Subindex does not exist
    InvalidSubIndex = 0x06_09_00_11,
    /// Value range of parameter exceeded (only for write access)
    ValueOutOfRange = 0x06_09_00_30,
    /// Value of parameter written too high
    ValueTooHigh = 0x06_09_00_31,
    /// Value of parameter written too low
    ValueTooLow = 0x06_09_00_32,
    /// General error
    GeneralError = 0x08_00_00_00,
    /// Data cannot be transferred or stored to the application
    Refused = 0x08_00_00_20,
    /// Data cannot be transferred or stored to the application because of the present device state
    StateRefused = 0x08_00_00_22,
    /// Object dictionary dynamic generation fails or no object dictionary is present
    DictionnaryEmpty = 0x08_00_00_23,
}

impl SdoAbortCode {
    pub fn object_related(self) -> bool   {u32::from(self) >> 24 == 0x06}
    pub fn subitem_related(self) -> bool  {u32::from(self) >> 16 == 0x06_09}
    pub fn mapping_related(self) -> bool  {u32::from(self) >> 16 == 0x06_04}
    pub fn device_related(self) -> bool   {u32::from(self) >> 24 == 0x08}
    pub fn protocol_related(self) -> bool {u32::from(self) >> 24 == 0x05}

    /// human readable message for error reports
    pub fn description(self) -> &'static str {
        match self {
            Self::BadToggle => "toggle bit not changed",
            Self::Timeout => "SDO protocol timeout",
            Self::UnsupportedCommand => "command specifier not valid or unknown",
            Self::OufOfMemory => "out of memory",
            Self::UnsupportedAccess => "unsupported access to an object",
            Self::WriteOnly => "attempt to read a write only object",
            Self::ReadOnly => "attempt to write a read only object",
            Self::InvalidIndex => "object does not exist in the dictionary",
            Self::CannotMap => "object cannot be mapped into the PDO",
            Self::PdoTooSmall => "mapped objects would exceed the PDO length",
            Self::IncompatibleParameter => "general parameter incompatibility",
            Self::IncompatibleDevice => "general internal incompatibility in the device",
            Self::HardwareError => "access failed due to a hardware error",
            Self::InvalidLength => "length of service parameter does not match",
            Self::ServiceTooBig => "length of service parameter too high",
            Self::ServiceTooSmall => "length of service parameter too low",
            Self::InvalidSubIndex => "subindex does not exist",
            Self::ValueOutOfRange => "value range of parameter exceeded",
            Self::ValueTooHigh => "value of parameter written too high",
            Self::ValueTooLow => "value of parameter written too low",
            Self::GeneralError => "general error",
            Self::Refused => "data cannot be transferred or stored to the application",
            Self::StateRefused => "data refused because of the present device state",
            Self::DictionnaryEmpty => "no object dictionary is present",
        }
    }
}
