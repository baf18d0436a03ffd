/*!
    Process images: the in-memory mirror of the cyclic data exchanged with the slaves.

    A [ProcessImage] is a linear byte buffer of fixed capacity ([MAX_IMAGE_BYTES], the payload ceiling of one cyclic frame), of which only a logical prefix of `size` bytes is in use. The storage is a member array and is never reallocated: resizing only changes the logical view.

    Accesses are addressed in bits, as PDO mappings are, but this storage only honors byte-aligned transfers of whole bytes. Any other transfer does not copy anything and reports zero bits transferred.

    ```
    use coimage::ProcessImage;

    let image = ProcessImage::new(4)?;
    assert_eq!(image.write(&0xdeadbeef_u32.to_le_bytes(), 0, 32), 32);
    // not byte aligned, nothing is copied
    assert_eq!(image.write(&[0xff], 3, 8), 0);

    let mut value = [0; 4];
    assert_eq!(image.read(&mut value, 0, 32), 32);
    assert_eq!(u32::from_le_bytes(value), 0xdeadbeef);
    # Ok::<(), coimage::MasterError>(())
    ```
*/

use core::{
    cell::UnsafeCell,
    fmt,
    ops::Range,
    sync::atomic::{AtomicUsize, Ordering::*},
    };
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use crate::error::{MasterError, MasterResult};


/// maximum byte size of a process image, matching the payload of a single cyclic frame
pub const MAX_IMAGE_BYTES: usize = 1510;

/// synchronization of the accesses to a process image, chosen at construction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageAccess {
    /**
        mutual exclusive access

        reads share a reader lock, writes take the writer lock, both only for the duration of the copy
    */
    Exclusive,
    /**
        nonexclusive access

        nothing is done for synchronization, this is the caller's responsibility
    */
    Unsynchronized,
}

/**
    a single process image, shared by all the bindings pointing in it and by the master cycle

    There is no atomicity guarantee across several calls: two fields written by two calls may be observed torn by a reader sampling both.
*/
pub struct ProcessImage {
    access: ImageAccess,
    /// number of bytes in the logical view, only changed under the writer lock
    size: AtomicUsize,
    lock: RwLock<()>,
    buffer: UnsafeCell<[u8; MAX_IMAGE_BYTES]>,
}

// concurrency safety: the buffer is only accessed under `lock` in exclusive mode, and the caller guarantees serialization in unsynchronized mode (whose constructor is unsafe)
unsafe impl Sync for ProcessImage {}

impl ProcessImage {
    /**
        create a zero-filled process image of `size` bytes with exclusive access

        fails with `InvalidArgument` if `size` exceeds [MAX_IMAGE_BYTES]
    */
    pub fn new(size: usize) -> MasterResult<Self> {
        Self::with_access(size, ImageAccess::Exclusive)
    }
    /**
        create a zero-filled process image of `size` bytes performing no synchronization at all

        # Safety

        the caller must ensure that no read or write on this image happens concurrently with a write or a resize, from any thread
    */
    pub unsafe fn unsynchronized(size: usize) -> MasterResult<Self> {
        Self::with_access(size, ImageAccess::Unsynchronized)
    }
    fn with_access(size: usize, access: ImageAccess) -> MasterResult<Self> {
        if size > MAX_IMAGE_BYTES
            {return Err(MasterError::invalid_argument(format!("process image of {} bytes exceeds {} bytes", size, MAX_IMAGE_BYTES)))}
        let image = Self {
            access,
            size: AtomicUsize::new(size),
            lock: RwLock::new(()),
            buffer: UnsafeCell::new([0; MAX_IMAGE_BYTES]),
        };
        log::info!("process image created ({:p}, {} bytes, {:?})", image.buffer.get(), size, access);
        Ok(image)
    }

    /// number of bytes in the logical view of the image
    pub fn size(&self) -> usize  {self.size.load(Acquire)}
    /// number of bytes of the backing storage, the bound of any resize
    pub const fn capacity(&self) -> usize  {MAX_IMAGE_BYTES}
    pub fn access(&self) -> ImageAccess  {self.access}

    /**
        change the logical size of the image, the storage is not reallocated and its content is kept

        fails with `InvalidArgument` if the new size exceeds [MAX_IMAGE_BYTES], and returns the new size otherwise
    */
    pub fn resize(&self, size: usize) -> MasterResult<usize> {
        if size > MAX_IMAGE_BYTES
            {return Err(MasterError::invalid_argument(format!("process image of {} bytes exceeds {} bytes", size, MAX_IMAGE_BYTES)))}
        {
            let _guard = self.write_guard();
            self.size.store(size, Release);
        }
        log::info!("process image resized ({:p}, {} bytes)", self.buffer.get(), size);
        Ok(size)
    }

    /**
        pointer to the image data

        This is the direct interface to the backing buffer: it bypasses the lock and may cause memory synchronization problems. It is meant for drivers exchanging the image with the hardware in ways no other method allows. Dereferencing it is unsafe.
    */
    pub fn pointer(&self) -> *mut u8  {self.buffer.get() as *mut u8}

    /**
        read byte-aligned raw data from the image

        `bit_size/8` bytes starting at byte `bit_offset/8` are copied into the beginning of `dst`. Returns `bit_size` on success, and 0 without copying anything if either `bit_offset` or `bit_size` is not a multiple of 8, if the range goes beyond the image size, or if `dst` is too short.
    */
    pub fn read(&self, dst: &mut [u8], bit_offset: usize, bit_size: usize) -> usize {
        let _guard = self.read_guard();
        let Some(range) = self.byte_range(bit_offset, bit_size, dst.len())
            else {return 0};
        // memory safety: the range is checked against the logical size which is bounded by the capacity
        let buffer = unsafe {&*self.buffer.get()};
        dst[.. range.len()].copy_from_slice(&buffer[range]);
        bit_size
    }
    /**
        write byte-aligned raw data to the image

        `bit_size/8` bytes from the beginning of `src` are copied at byte `bit_offset/8`. Returns `bit_size` on success, and 0 without copying anything if either `bit_offset` or `bit_size` is not a multiple of 8, if the range goes beyond the image size, or if `src` is too short.
    */
    pub fn write(&self, src: &[u8], bit_offset: usize, bit_size: usize) -> usize {
        let _guard = self.write_guard();
        let Some(range) = self.byte_range(bit_offset, bit_size, src.len())
            else {return 0};
        let buffer = unsafe {&mut *self.buffer.get()};
        let len = range.len();
        buffer[range].copy_from_slice(&src[.. len]);
        bit_size
    }

    /// run `task` on the logical content of the image, holding the reader lock
    pub fn inspect<R>(&self, task: impl FnOnce(&[u8]) -> R) -> R {
        let _guard = self.read_guard();
        let buffer = unsafe {&*self.buffer.get()};
        task(&buffer[.. self.size()])
    }
    /**
        run `task` on the logical content of the image, holding the writer lock

        this is how a driver should apply a whole cycle of data to the image, so that it follows the same lock discipline as the bindings
    */
    pub fn update<R>(&self, task: impl FnOnce(&mut [u8]) -> R) -> R {
        let _guard = self.write_guard();
        let buffer = unsafe {&mut *self.buffer.get()};
        let size = self.size();
        task(&mut buffer[.. size])
    }

    /// byte range of a transfer, if it is allowed, the caller must hold a guard so the size cannot change meanwhile
    fn byte_range(&self, bit_offset: usize, bit_size: usize, available: usize) -> Option<Range<usize>> {
        if bit_offset & 0x07 != 0 || bit_size & 0x07 != 0
            {return None}
        let start = bit_offset >> 3;
        let end = start.checked_add(bit_size >> 3)?;
        if end > self.size() || end - start > available
            {return None}
        Some(start .. end)
    }

    // the lock only protects the buffer, so a poisoned lock is still usable
    fn read_guard(&self) -> Option<RwLockReadGuard<'_, ()>> {
        (self.access == ImageAccess::Exclusive)
            .then(|| self.lock.read().unwrap_or_else(PoisonError::into_inner))
    }
    fn write_guard(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        (self.access == ImageAccess::Exclusive)
            .then(|| self.lock.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl fmt::Debug for ProcessImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessImage{{{:p}, {} bytes, {:?}}}", self.buffer.get(), self.size(), self.access)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::{sync::Arc, thread, time::Duration};

    fn is_shareable<T: Send + Sync>() {}

    #[test]
    fn shareable_between_threads() {
        is_shareable::<ProcessImage>();
    }

    #[test]
    fn capacity_bound() {
        assert_eq!(ProcessImage::new(MAX_IMAGE_BYTES + 1).unwrap_err().kind(), ErrorKind::InvalidArgument);
        let image = ProcessImage::new(MAX_IMAGE_BYTES).unwrap();
        assert_eq!(image.size(), image.capacity());

        let image = ProcessImage::new(0).unwrap();
        assert_eq!(image.resize(MAX_IMAGE_BYTES + 1).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(image.size(), 0);
        assert_eq!(image.resize(MAX_IMAGE_BYTES).unwrap(), MAX_IMAGE_BYTES);
        assert_eq!(image.size(), MAX_IMAGE_BYTES);
    }

    #[test]
    fn aligned_round_trip() {
        let image = ProcessImage::new(4).unwrap();
        assert_eq!(image.write(&0xdeadbeef_u32.to_le_bytes(), 0, 32), 32);
        let mut data = [0; 4];
        assert_eq!(image.read(&mut data, 0, 32), 32);
        assert_eq!(u32::from_le_bytes(data), 0xdeadbeef);

        let image = ProcessImage::new(4).unwrap();
        assert_eq!(image.write(&[0xff], 3, 8), 0);
        assert_eq!(image.read(&mut data, 0, 32), 32);
        assert_eq!(data, [0; 4]);
    }

    #[test]
    fn resize_keeps_content() {
        let image = ProcessImage::new(4).unwrap();
        assert_eq!(image.write(&[1, 2, 3, 4], 0, 32), 32);
        image.resize(2).unwrap();
        // out of the logical view now
        assert_eq!(image.read(&mut [0; 2], 16, 16), 0);
        image.resize(4).unwrap();
        let mut data = [0; 4];
        assert_eq!(image.read(&mut data, 0, 32), 32);
        assert_eq!(data, [1, 2, 3, 4]);
    }

    #[test]
    fn misaligned_transfers() {
        let image = ProcessImage::new(4).unwrap();
        assert_eq!(image.write(&[0xff; 4], 3, 8), 0);
        assert_eq!(image.write(&[0xff; 4], 8, 12), 0);
        assert_eq!(image.write(&[0xff; 4], 1, 1), 0);
        let mut data = [0x55; 4];
        assert_eq!(image.read(&mut data, 4, 8), 0);
        assert_eq!(data, [0x55; 4]);
        assert_eq!(image.read(&mut data, 0, 32), 32);
        assert_eq!(data, [0; 4]);
    }

    #[test]
    fn out_of_range_transfers() {
        let image = ProcessImage::new(4).unwrap();
        assert_eq!(image.write(&[1, 2], 24, 16), 0);
        // source shorter than the transfer
        assert_eq!(image.write(&[1], 0, 16), 0);
        assert_eq!(image.read(&mut [0; 1], 0, 16), 0);
        assert_eq!(image.read(&mut [0; 8], usize::MAX & !0x07, 8), 0);
        image.inspect(|data| assert_eq!(data, &[0; 4]));
    }

    #[test]
    fn offset_transfers() {
        let image = ProcessImage::new(8).unwrap();
        assert_eq!(image.write(&[0xaa, 0xbb], 16, 16), 16);
        image.inspect(|data| assert_eq!(data, &[0, 0, 0xaa, 0xbb, 0, 0, 0, 0]));
        image.update(|data| data[7] = 0x11);
        let mut byte = [0];
        assert_eq!(image.read(&mut byte, 56, 8), 8);
        assert_eq!(byte, [0x11]);
        // zero sized transfers are aligned
        assert_eq!(image.read(&mut [], 0, 0), 0);
    }

    #[test]
    fn raw_pointer() {
        let image = ProcessImage::new(2).unwrap();
        image.write(&[0x34, 0x12], 0, 16);
        let raw = unsafe {core::slice::from_raw_parts(image.pointer(), 2)};
        assert_eq!(raw, &[0x34, 0x12]);
    }

    #[test]
    fn unsynchronized_access() {
        let image = unsafe {ProcessImage::unsynchronized(4)}.unwrap();
        assert_eq!(image.access(), ImageAccess::Unsynchronized);
        assert_eq!(image.write(&[9, 8, 7, 6], 0, 32), 32);
        let mut data = [0; 4];
        assert_eq!(image.read(&mut data, 0, 32), 32);
        assert_eq!(data, [9, 8, 7, 6]);
    }

    #[test]
    fn concurrent_writers_never_interleave() {
        const LEN: usize = 64;
        let image = Arc::new(ProcessImage::new(LEN).unwrap());
        let writers = [0x11u8, 0x22, 0x33].map(|pattern| {
            let image = image.clone();
            thread::spawn(move || {
                for _ in 0 .. 2000 {
                    assert_eq!(image.write(&[pattern; LEN], 0, LEN*8), LEN*8);
                }
            })
        });
        let reader = {
            let image = image.clone();
            thread::spawn(move || {
                let mut data = [0; LEN];
                for _ in 0 .. 2000 {
                    assert_eq!(image.read(&mut data, 0, LEN*8), LEN*8);
                    assert!(data.iter().all(|&byte| byte == data[0]), "torn write observed: {:?}", data);
                }
            })
        };
        for writer in writers {writer.join().unwrap()}
        reader.join().unwrap();
    }

    #[test]
    fn shrink_during_pending_transfers() {
        let image = Arc::new(ProcessImage::new(8).unwrap());
        let guard = image.lock.write().unwrap();
        let writer = {
            let image = image.clone();
            thread::spawn(move || image.write(&[0xff; 4], 32, 32))
        };
        let reader = {
            let image = image.clone();
            thread::spawn(move || image.read(&mut [0; 4], 32, 32))
        };
        thread::sleep(Duration::from_millis(50));
        // same as a resize, while both transfers wait for the lock
        image.size.store(4, Release);
        drop(guard);

        assert_eq!(writer.join().unwrap(), 0);
        assert_eq!(reader.join().unwrap(), 0);
        image.resize(8).unwrap();
        image.inspect(|data| assert_eq!(data, &[0; 8]));
    }
}
