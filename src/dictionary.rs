/*!
    Static description of CANopen object dictionary entries.

    An [ObjectDescriptor] is only metadata: where the entry lives in the dictionary (index and subindex), what access and mapping the device declares for it, and its bounds. It is consumed by the bindings in [crate::binding], none of which enforce the access flags or the bounds: they are kept as passive information for the application.

    Concrete device profiles are expected to declare their entries as constants:

    ```
    use coimage::{ObjectDescriptor, Access, Mapping};

    const TARGET_POSITION: ObjectDescriptor<i32> = ObjectDescriptor::bounded(
        0x607a, 0, Access::ReadWrite, Mapping::RX,
        -1_000_000, 1_000_000, 0);
    let control_word = ObjectDescriptor::<u16>::new(0x6040, 0, Access::ReadWrite, Mapping::RX);
    # assert_eq!(TARGET_POSITION.max(), 1_000_000);
    # assert_eq!(control_word.index(), 0x6040);
    ```
*/

use core::{fmt, ops::BitOr};
use crate::data::PdoData;


/// access rights declared by the device for a dictionary entry
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Access {
    ReadOnly = 0x01,
    WriteOnly = 0x02,
    ReadWrite = 0x03,
}
impl Access {
    pub fn readable(self) -> bool  {self as u8 & 0x01 != 0}
    pub fn writable(self) -> bool  {self as u8 & 0x02 != 0}
}

/**
    mapping capabilities of a dictionary entry, these are bit flags that can be combined

    `TX` and `RX` are from the point of view of the slave: transmit PDOs are inputs of the master, receive PDOs are its outputs
*/
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Mapping(u8);
impl Mapping {
    /// the entry cannot be mapped
    pub const NONE: Self = Self(0x00);
    /// the entry can be mapped, without any direction restriction
    pub const MAPPED: Self = Self(0x01);
    pub const TX: Self = Self(0x02);
    pub const RX: Self = Self(0x04);
    pub const TX_RX: Self = Self(0x06);

    pub const fn bits(self) -> u8  {self.0}
    pub const fn from_bits(bits: u8) -> Self  {Self(bits & 0x07)}
    pub const fn contains(self, other: Self) -> bool  {self.0 & other.0 == other.0}
    pub const fn is_mappable(self) -> bool  {self.0 != 0}
}
impl BitOr for Mapping {
    type Output = Self;
    fn bitor(self, other: Self) -> Self  {Self(self.0 | other.0)}
}
impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapping(0x{:02x})", self.0)
    }
}

/**
    CANopen primitive data types (CiA 301 table 44)

    they are descriptive only, nothing checks them against the type a value is actually read or written with
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeCode {
    Boolean = 0x0001,
    Integer8 = 0x0002,
    Integer16 = 0x0003,
    Integer32 = 0x0004,
    Unsigned8 = 0x0005,
    Unsigned16 = 0x0006,
    Unsigned32 = 0x0007,
    Real32 = 0x0008,
    VisibleString = 0x0009,
    OctetString = 0x000a,
    Domain = 0x000f,
    Real64 = 0x0011,
    Integer64 = 0x0015,
    Unsigned64 = 0x001b,
}


/**
    description of one entry of an object dictionary, with the type `T` of its value

    This struct is immutable once created. Bindings copy it rather than borrowing it.
*/
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ObjectDescriptor<T> {
    index: u16,
    sub: u8,
    access: Access,
    mapping: Mapping,
    min: T,
    max: T,
    default: T,
}
impl<T: PdoData + Default> ObjectDescriptor<T> {
    /// describe an entry with null bounds, use [Self::with_bounds] to set them
    pub fn new(index: u16, sub: u8, access: Access, mapping: Mapping) -> Self {
        Self::bounded(index, sub, access, mapping, T::default(), T::default(), T::default())
    }
}
impl<T: PdoData> ObjectDescriptor<T> {
    /// describe an entry with all its metadata, this is usable in constants
    pub const fn bounded(index: u16, sub: u8, access: Access, mapping: Mapping, min: T, max: T, default: T) -> Self {
        Self {index, sub, access, mapping, min, max, default}
    }
    /// copy of this description with other passive bounds and default value
    pub fn with_bounds(&self, min: T, max: T, default: T) -> Self {
        Self {min, max, default, .. *self}
    }

    pub const fn index(&self) -> u16  {self.index}
    pub const fn sub(&self) -> u8  {self.sub}
    pub const fn access(&self) -> Access  {self.access}
    pub const fn mapping(&self) -> Mapping  {self.mapping}
    pub fn min(&self) -> T  {self.min}
    pub fn max(&self) -> T  {self.max}
    pub fn default(&self) -> T  {self.default}
    /// CANopen type implied by `T`
    pub fn type_code(&self) -> TypeCode  {T::TYPE}
}
impl<T: fmt::Debug> fmt::Debug for ObjectDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectDescriptor {{index: {:#06x}, sub: {}, access: {:?}, mapping: {:?}, min: {:?}, max: {:?}, default: {:?}}}",
            self.index, self.sub, self.access, self.mapping, self.min, self.max, self.default)
    }
}
