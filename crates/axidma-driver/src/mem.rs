//! Physical memory mapping over `/dev/mem`.
//!
//! The reference platform exposes both the DMA register file and the
//! reserved receive-buffer region as physical address ranges; this module
//! maps them into the process and provides volatile, bounds-checked access.

use crate::error::{AxiDmaError, Result};
use crate::regio::RegisterIo;
use rustix::fs::OFlags;
use rustix::mm::{mmap, mmap_anonymous, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::ptr::NonNull;

const DEV_MEM: &str = "/dev/mem";

/// Handle on `/dev/mem`, opened once at startup.
#[derive(Debug)]
pub struct DevMem {
    file: File,
}

impl DevMem {
    /// Open `/dev/mem` for register and buffer mapping.
    ///
    /// Opened with `O_SYNC` so register writes are not combined or deferred
    /// by the CPU write buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::Mapping`] if the file cannot be opened
    /// (typically: not running as root).
    pub fn open() -> Result<Self> {
        // O_SYNC has no OpenOptions method; pass it through custom_flags.
        #[allow(clippy::cast_possible_wrap)]
        let sync_flag = OFlags::SYNC.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(sync_flag)
            .open(DEV_MEM)
            .map_err(|e| AxiDmaError::mapping(DEV_MEM, e))?;

        tracing::debug!("Opened {DEV_MEM}");
        Ok(Self { file })
    }

    /// Map `len` bytes of physical memory starting at `phys_base`.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::Mapping`] if the mmap fails.
    pub fn map(&self, phys_base: u64, len: usize) -> Result<MappedRegion> {
        // SAFETY: mmap of an open /dev/mem fd. The fd is valid (owned by
        // self), len is the caller's requested window, SHARED is required
        // for device memory, and the result is checked before use.
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                self.file.as_fd(),
                phys_base,
            )
            .map_err(|e| AxiDmaError::mapping(DEV_MEM, e.into()))?;

            NonNull::new(addr.cast::<u8>()).expect("mmap returns non-null on success")
        };

        tracing::info!("Mapped {len} bytes at phys {phys_base:#010x} ({ptr:p})");

        Ok(MappedRegion {
            ptr,
            len,
            phys_base,
        })
    }
}

/// An owned mapping over a physical address range.
///
/// Register access (`read32`/`write32`) is volatile and 32-bit aligned;
/// bulk access (`read_bytes`/`write_bytes`/`fill`) serves the receive
/// buffer. All offsets are bounds-checked: an out-of-range offset is a
/// contract violation and panics rather than returning an error.
///
/// Unmapped on drop.
pub struct MappedRegion {
    ptr: NonNull<u8>,
    len: usize,
    phys_base: u64,
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("len", &self.len)
            .field("phys_base", &format_args!("{:#010x}", self.phys_base))
            .finish()
    }
}

// SAFETY: MappedRegion owns its mapping exclusively; moving it between
// threads does not invalidate the mapping.
unsafe impl Send for MappedRegion {}

// SAFETY: reads take &self and are bounds-checked volatile loads; writes
// require &mut self, so exclusive access is enforced by the borrow checker.
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// An anonymous private mapping with the same API, for host tests and
    /// simulated captures. Not backed by hardware; `phys_base` is 0.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::Mapping`] if the mmap fails.
    pub fn anonymous(len: usize) -> Result<Self> {
        // SAFETY: anonymous private mapping, no fd involved; result checked
        // before use.
        let ptr = unsafe {
            let addr = mmap_anonymous(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE,
            )
            .map_err(|e| AxiDmaError::mapping("<anonymous>", e.into()))?;

            NonNull::new(addr.cast::<u8>()).expect("mmap returns non-null on success")
        };

        Ok(Self {
            ptr,
            len,
            phys_base: 0,
        })
    }

    /// Mapping length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty (never true for a mapped window).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Physical base address of the mapping.
    #[must_use]
    pub const fn phys_base(&self) -> u64 {
        self.phys_base
    }

    fn check_word(&self, offset: usize) {
        assert!(offset + 4 <= self.len, "register offset out of bounds");
        assert!(offset % 4 == 0, "register offset not word aligned");
    }

    /// Read bytes at `offset` into `buffer`.
    ///
    /// # Panics
    ///
    /// Panics if the read would exceed the mapping.
    pub fn read_bytes(&self, offset: usize, buffer: &mut [u8]) {
        assert!(offset + buffer.len() <= self.len, "read out of bounds");

        // SAFETY: bounds checked above; src is within the mapping, dst is a
        // valid slice, and the two cannot overlap (device memory vs heap).
        unsafe {
            let src = self.ptr.as_ptr().add(offset);
            std::ptr::copy_nonoverlapping(src, buffer.as_mut_ptr(), buffer.len());
        }
    }

    /// Write `data` at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the write would exceed the mapping.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        assert!(offset + data.len() <= self.len, "write out of bounds");

        // SAFETY: bounds checked above; dst is within the mapping, src is a
        // valid slice, no overlap.
        unsafe {
            let dst = self.ptr.as_ptr().add(offset);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
    }

    /// Fill the whole mapping with `byte`.
    pub fn fill(&mut self, byte: u8) {
        // SAFETY: the full range is owned by this mapping.
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr(), byte, self.len);
        }
    }
}

impl RegisterIo for MappedRegion {
    /// # Panics
    ///
    /// Panics if `offset` is out of bounds or not word aligned.
    fn read32(&self, offset: usize) -> u32 {
        self.check_word(offset);

        // SAFETY: bounds and alignment checked; volatile is required
        // because the hardware changes these words asynchronously.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };

        tracing::trace!("read32  {offset:#04x} = {value:#010x}");
        value
    }

    /// # Panics
    ///
    /// Panics if `offset` is out of bounds or not word aligned.
    fn write32(&mut self, offset: usize, value: u32) {
        self.check_word(offset);

        tracing::trace!("write32 {offset:#04x} = {value:#010x}");

        // SAFETY: bounds and alignment checked; volatile is required
        // because register writes have hardware side effects.
        unsafe {
            self.ptr
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value);
        }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/len came from a successful mmap and Drop runs once.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.len) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}
