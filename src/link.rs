/*!
    Abstract communication endpoint between the application and a fieldbus master driver.

    A driver implements [MasterLink] by providing its two process images, its notification hub, the wait on cycles and the blocking SDO exchanges. Everything else is provided on top of it:

    - raw PDO transfers, delegating to the process images
    - the hooks the driver must call from its cycle thread, which are the only senders of [CycleCompleted] and [MasterEvent]
    - typed accesses, by the mean of the blanket [MasterLinkExt] trait
*/

use core::time::Duration;
use std::time::Instant;
use crate::{
    data::{PdoData, Storage},
    error::MasterResult,
    image::ProcessImage,
    notify::Hub,
    };


/// slave id that no slave can have, drivers reject SDO exchanges with it
pub const INVALID_SLAVE_ID: u16 = u16::MAX;
/// default duration to wait for a cycle before giving up
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_millis(100);

/// process image selected by a binding, from the point of view of the master
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// data received from the slaves
    Input,
    /// data sent to the slaves
    Output,
}

/// event notified on the link's hub each time a cycle has been applied to the process images
#[derive(Clone, Debug)]
pub struct CycleCompleted {
    at: Instant,
}
impl CycleCompleted {
    /// instant the process images were updated
    pub fn at(&self) -> Instant  {self.at}
}

/// generic event reported by the master driver, such as a slave state change or a link loss
#[derive(Clone, Debug)]
pub struct MasterEvent {
    code: i64,
    message: String,
}
impl MasterEvent {
    pub fn code(&self) -> i64  {self.code}
    pub fn message(&self) -> &str  {&self.message}
}


/**
    communication endpoint owning one input and one output [ProcessImage]

    ## Note

    The driver's cycle thread must call [Self::on_cycle_sync] once per completed cycle, and [Self::on_master_event] when it has something to report. The application threads only use the bindings or the accessors of [MasterLinkExt].
*/
pub trait MasterLink {
    /// process image of the data received from the slaves
    fn input(&self) -> &ProcessImage;
    /// process image of the data sent to the slaves
    fn output(&self) -> &ProcessImage;
    /// hub notifying [CycleCompleted] and [MasterEvent]
    fn hub(&self) -> &Hub;

    /**
        block the calling thread until `cycles` cycles have completed, or `timeout` elapsed

        return false on timeout, which is not an error
    */
    fn wait_cycles(&self, cycles: u32, timeout: Duration) -> bool;

    /**
        read the value of a dictionary entry of a slave through an SDO exchange, into `dst`

        This blocks the calling thread for the whole exchange. Returns the number of bytes read. Transport failures are returned unchanged, no retry is performed.
    */
    fn read_sdo_raw(&self, slave: u16, index: u16, sub: u8, dst: &mut [u8]) -> MasterResult<usize>;
    /**
        write the value of a dictionary entry of a slave through an SDO exchange, from `src`

        This blocks the calling thread for the whole exchange. Returns the number of bytes written. Transport failures are returned unchanged, no retry is performed.
    */
    fn write_sdo_raw(&self, slave: u16, index: u16, sub: u8, src: &[u8]) -> MasterResult<usize>;

    /**
        apply the data of the last completed cycle to the process images

        this is driver specific, and must follow the lock discipline of the images (see [ProcessImage::update])
    */
    fn apply_cycle(&self);

    fn image(&self, direction: Direction) -> &ProcessImage {
        match direction {
            Direction::Input => self.input(),
            Direction::Output => self.output(),
        }
    }
    /// read raw data from a process image, return the number of bits read (0 on any failure)
    fn read_pdo_raw(&self, image: &ProcessImage, dst: &mut [u8], bit_offset: usize, bit_size: usize) -> usize {
        image.read(dst, bit_offset, bit_size)
    }
    /// write raw data to a process image, return the number of bits written (0 on any failure)
    fn write_pdo_raw(&self, image: &ProcessImage, src: &[u8], bit_offset: usize, bit_size: usize) -> usize {
        image.write(src, bit_offset, bit_size)
    }

    /// hook for the cycle thread: apply the cycle data, then notify [CycleCompleted]
    fn on_cycle_sync(&self) {
        self.apply_cycle();
        let event = CycleCompleted {at: Instant::now()};
        let delivered = self.hub().notify(&event);
        log::trace!("cycle completed, {} subscribers notified", delivered);
    }
    /// hook for the driver: notify a [MasterEvent]
    fn on_master_event(&self, code: i64, message: &str) {
        log::debug!("master event {}: {}", code, message);
        self.hub().notify(&MasterEvent {code, message: message.to_owned()});
    }
}


/// typed accesses to a [MasterLink], implemented for every link
pub trait MasterLinkExt: MasterLink {
    /**
        read a value from a process image at the given bit offset

        The value requests `T::BITS` bits, so a `bool` requests one bit and is never transferred by a byte-granular image. On any failure, including bytes that `T` cannot unpack, [PdoData::fallback] is returned.
    */
    fn read_pdo<T: PdoData>(&self, image: &ProcessImage, bit_offset: usize) -> T {
        let mut buffer = T::Packed::zeroed();
        if self.read_pdo_raw(image, buffer.as_mut(), bit_offset, T::BITS) == 0
            {return T::fallback()}
        T::unpack(buffer.as_ref()).unwrap_or_else(|error| {
            log::debug!("cannot unpack PDO at bit {}: {:?}", bit_offset, error);
            T::fallback()
        })
    }
    /// write a value to a process image at the given bit offset, return the number of bits written
    fn write_pdo<T: PdoData>(&self, image: &ProcessImage, bit_offset: usize, value: T) -> usize {
        let mut buffer = T::Packed::zeroed();
        if value.pack(buffer.as_mut()).is_err()
            {return 0}
        self.write_pdo_raw(image, buffer.as_ref(), bit_offset, T::BITS)
    }
    fn read_mapped<T: PdoData>(&self, direction: Direction, bit_offset: usize) -> T {
        self.read_pdo(self.image(direction), bit_offset)
    }
    fn write_mapped<T: PdoData>(&self, direction: Direction, bit_offset: usize, value: T) -> usize {
        self.write_pdo(self.image(direction), bit_offset, value)
    }

    /// read a dictionary entry of a slave, blocking for the SDO exchange
    fn read_sdo<T: PdoData>(&self, slave: u16, index: u16, sub: u8) -> MasterResult<T> {
        let mut buffer = T::Packed::zeroed();
        self.read_sdo_raw(slave, index, sub, buffer.as_mut())?;
        Ok(T::unpack(buffer.as_ref())?)
    }
    /// write a dictionary entry of a slave, blocking for the SDO exchange, return the number of bits written
    fn write_sdo<T: PdoData>(&self, slave: u16, index: u16, sub: u8, value: T) -> MasterResult<usize> {
        let mut buffer = T::Packed::zeroed();
        value.pack(buffer.as_mut())?;
        self.write_sdo_raw(slave, index, sub, buffer.as_ref())?;
        Ok(core::mem::size_of::<T>() * 8)
    }
}
impl<L: MasterLink + ?Sized> MasterLinkExt for L {}
