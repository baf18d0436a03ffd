/*!
    Bindings attach a dictionary entry to a concrete access path on a [MasterLink].

    - [ProcessDataBinding] reads and writes a typed value at a bit address in one of the process images
    - [RawBinding] does the same for fields of irregular width, carried in a `u64`
    - [ServiceDataBinding] reads and writes a typed value through blocking SDO exchanges with one slave

    None of them checks the access flags or the bounds of the descriptor against the operation performed.

    ```
    use coimage::*;

    let master = LoopbackMaster::new(LinkConfig::default().input_size(4).output_size(4))?;
    let position = ProcessDataBinding::<i32, _>::new(&master, Direction::Output, 0);
    assert_eq!(position.write(-42), 32);
    assert_eq!(position.read(), -42);
    # Ok::<(), MasterError>(())
    ```
*/

use core::fmt;
use crate::{
    data::PdoData,
    dictionary::{ObjectDescriptor, Access, Mapping},
    error::{MasterError, MasterResult},
    link::{MasterLink, MasterLinkExt, Direction},
    };


/// typed value at a bit address in a process image of a link
pub struct ProcessDataBinding<'a, T: PdoData, L: MasterLink + ?Sized> {
    link: &'a L,
    direction: Direction,
    bit_addr: usize,
    bit_size: usize,
    descriptor: Option<ObjectDescriptor<T>>,
}

impl<'a, T: PdoData, L: MasterLink + ?Sized> ProcessDataBinding<'a, T, L> {
    /// bind the value at `bit_addr` in the image of the given direction, its bit size is deduced from `T`
    pub fn new(link: &'a L, direction: Direction, bit_addr: usize) -> Self {
        Self::with_size(link, direction, bit_addr, core::mem::size_of::<T>() * 8)
    }
    /**
        same as [Self::new] but with an explicit bit size

        the size is informative only: transfers always request the bits of `T`, see [MasterLinkExt::read_pdo]
    */
    pub fn with_size(link: &'a L, direction: Direction, bit_addr: usize, bit_size: usize) -> Self {
        Self {link, direction, bit_addr, bit_size, descriptor: None}
    }
    /// bind a dictionary entry mapped at `bit_addr`, the descriptor is copied
    pub fn describe(link: &'a L, direction: Direction, bit_addr: usize, descriptor: &ObjectDescriptor<T>) -> Self {
        Self {descriptor: Some(*descriptor), .. Self::new(link, direction, bit_addr)}
    }

    pub fn read(&self) -> T {
        self.link.read_mapped(self.direction, self.bit_addr)
    }
    /// return the number of bits written, 0 if the binding address cannot be written
    pub fn write(&self, value: T) -> usize {
        self.link.write_mapped(self.direction, self.bit_addr, value)
    }

    pub fn link(&self) -> &'a L  {self.link}
    pub fn direction(&self) -> Direction  {self.direction}
    pub fn bit_addr(&self) -> usize  {self.bit_addr}
    pub fn bit_size(&self) -> usize  {self.bit_size}
    pub fn descriptor(&self) -> Option<&ObjectDescriptor<T>>  {self.descriptor.as_ref()}
}

impl<T: PdoData + fmt::Debug, L: MasterLink + ?Sized> fmt::Debug for ProcessDataBinding<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessDataBinding<{}>{{{:?}, bits {}..{}, {:?}}}",
            core::any::type_name::<T>(),
            self.direction, self.bit_addr, self.bit_addr + self.bit_size,
            self.descriptor)
    }
}


/**
    field of up to 64 bits at a bit address in a process image, used for irregular widths or banks of flags

    transfers request exactly the bit size of the binding, so the byte granularity of the images applies: only byte aligned fields of whole bytes are actually transferred
*/
pub struct RawBinding<'a, L: MasterLink + ?Sized> {
    link: &'a L,
    direction: Direction,
    bit_addr: usize,
    bit_size: usize,
}

impl<'a, L: MasterLink + ?Sized> RawBinding<'a, L> {
    /// maximum bit size of a raw field, the capacity of its `u64` container
    pub const MAX_BITS: usize = 64;

    /// fails with `InvalidArgument` unless `1 <= bit_size <= 64`
    pub fn new(link: &'a L, direction: Direction, bit_addr: usize, bit_size: usize) -> MasterResult<Self> {
        if bit_size == 0 || bit_size > Self::MAX_BITS
            {return Err(MasterError::invalid_argument(format!("raw binding of {} bits, expected 1 to {}", bit_size, Self::MAX_BITS)))}
        Ok(Self {link, direction, bit_addr, bit_size})
    }

    /// read the field in the low bits of a `u64`, 0 if it cannot be read
    pub fn read(&self) -> u64 {
        let mut buffer = [0; 8];
        self.read_raw(&mut buffer);
        u64::from_le_bytes(buffer)
    }
    /// write the low bits of `value` to the field, return the number of bits written
    pub fn write(&self, value: u64) -> usize {
        self.write_raw(&value.to_le_bytes())
    }
    /// read the field bytes into `dst`, return the number of bits read
    pub fn read_raw(&self, dst: &mut [u8]) -> usize {
        self.link.read_pdo_raw(self.link.image(self.direction), dst, self.bit_addr, self.bit_size)
    }
    /// write the field bytes from `src`, return the number of bits written
    pub fn write_raw(&self, src: &[u8]) -> usize {
        self.link.write_pdo_raw(self.link.image(self.direction), src, self.bit_addr, self.bit_size)
    }

    pub fn direction(&self) -> Direction  {self.direction}
    pub fn bit_addr(&self) -> usize  {self.bit_addr}
    pub fn bit_size(&self) -> usize  {self.bit_size}
}

impl<L: MasterLink + ?Sized> fmt::Debug for RawBinding<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBinding{{{:?}, bits {}..{}}}", self.direction, self.bit_addr, self.bit_addr + self.bit_size)
    }
}


/**
    typed dictionary entry of one slave, accessed through SDO exchanges

    every access blocks the calling thread for the duration of the exchange, errors of the driver are returned unchanged
*/
pub struct ServiceDataBinding<'a, T: PdoData, L: MasterLink + ?Sized> {
    link: &'a L,
    slave: u16,
    descriptor: ObjectDescriptor<T>,
}

impl<'a, T: PdoData, L: MasterLink + ?Sized> ServiceDataBinding<'a, T, L> {
    /// bind a dictionary entry of the given slave, the descriptor is copied
    pub fn new(link: &'a L, slave: u16, descriptor: &ObjectDescriptor<T>) -> Self {
        Self {link, slave, descriptor: *descriptor}
    }
    /// bind the entry at `index.sub` of the given slave, with no other metadata
    pub fn at(link: &'a L, slave: u16, index: u16, sub: u8) -> Self
    where T: Default
    {
        Self::new(link, slave, &ObjectDescriptor::new(index, sub, Access::ReadWrite, Mapping::NONE))
    }

    pub fn read(&self) -> MasterResult<T> {
        self.link.read_sdo(self.slave, self.descriptor.index(), self.descriptor.sub())
    }
    /// return the number of bits written
    pub fn write(&self, value: T) -> MasterResult<usize> {
        self.link.write_sdo(self.slave, self.descriptor.index(), self.descriptor.sub(), value)
    }

    pub fn slave(&self) -> u16  {self.slave}
    pub fn index(&self) -> u16  {self.descriptor.index()}
    pub fn sub(&self) -> u8  {self.descriptor.sub()}
    pub fn descriptor(&self) -> &ObjectDescriptor<T>  {&self.descriptor}
}

impl<T: PdoData + fmt::Debug, L: MasterLink + ?Sized> fmt::Debug for ServiceDataBinding<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceDataBinding<{}>{{slave: {}, {:?}}}", core::any::type_name::<T>(), self.slave, self.descriptor)
    }
}
