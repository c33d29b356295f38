//! Executable memory management using mmap.
//!
//! Memory starts out readable and writable. `make_executable` flips it to
//! read+execute, after which it can no longer be written.

use std::ptr::NonNull;

use crate::error::MemoryError;

/// A page-aligned block of memory allocated via mmap.
pub struct ExecutableMemory {
    ptr: NonNull<u8>,
    size: usize,
    executable: bool,
}

impl ExecutableMemory {
    /// Allocate at least `size` bytes, rounded up to whole pages.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidSize);
        }

        let page_size = Self::page_size();
        let aligned_size = size
            .checked_add(page_size - 1)
            .ok_or(MemoryError::InvalidSize)?
            & !(page_size - 1);

        let ptr = Self::mmap_alloc(aligned_size)?;

        Ok(Self {
            ptr,
            size: aligned_size,
            executable: false,
        })
    }

    fn page_size() -> usize {
        #[cfg(unix)]
        {
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            if size > 0 { size as usize } else { 4096 }
        }
        #[cfg(not(unix))]
        {
            4096
        }
    }

    #[cfg(unix)]
    fn mmap_alloc(size: usize) -> Result<NonNull<u8>, MemoryError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed);
        }

        NonNull::new(ptr as *mut u8).ok_or(MemoryError::AllocationFailed)
    }

    // Plain heap memory; generally not executable on these hosts.
    #[cfg(not(unix))]
    fn mmap_alloc(size: usize) -> Result<NonNull<u8>, MemoryError> {
        let layout = std::alloc::Layout::from_size_align(size, Self::page_size())
            .map_err(|_| MemoryError::InvalidSize)?;
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).ok_or(MemoryError::AllocationFailed)
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Size of the mapping in bytes (a whole number of pages).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping is `size` bytes long and readable in both states.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    /// Writable view of the whole mapping, or None once executable.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if self.executable {
            return None;
        }
        // SAFETY: the mapping is `size` bytes long, writable, and borrowed
        // mutably through `self`.
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) })
    }

    /// Make the memory executable (and read-only).
    #[cfg(unix)]
    pub fn make_executable(&mut self) -> Result<(), MemoryError> {
        if self.executable {
            return Ok(());
        }

        let result = unsafe {
            libc::mprotect(
                self.ptr.as_ptr() as *mut libc::c_void,
                self.size,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };

        if result != 0 {
            return Err(MemoryError::ProtectionFailed);
        }

        self.executable = true;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn make_executable(&mut self) -> Result<(), MemoryError> {
        self.executable = true;
        Ok(())
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
            }
        }
        #[cfg(not(unix))]
        {
            if let Ok(layout) = std::alloc::Layout::from_size_align(self.size, Self::page_size()) {
                unsafe { std::alloc::dealloc(self.ptr.as_ptr(), layout) };
            }
        }
    }
}

// The mapping is owned exclusively; once executable it is never written.
unsafe impl Send for ExecutableMemory {}
unsafe impl Sync for ExecutableMemory {}
