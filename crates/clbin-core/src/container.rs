//! Parser for the Intel OpenCL program-binary container.
//!
//! A compiled program binary from the Intel driver is a flat byte buffer:
//! a fixed program header, an opaque program-level patch list, then
//! `NumberOfKernels` variable-length kernel records back to back. Each
//! record is a fixed common header, the null-padded kernel name, and five
//! opaque regions (per-kernel patch list, kernel heap, general/dynamic/
//! surface state heaps) in that exact order.
//!
//! The parser validates the magic, walks the records with a bounds-checked
//! cursor and yields offset+length views into the source buffer. Patch
//! lists are located but never decoded; the kernel heap is what callers
//! are after (the compiled ISA of a kernel, extractable by name).
//!
//! All multi-byte fields are little-endian, matching the layouts in the
//! `iOpenCL` driver headers.

use crate::Error;

#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
#[cfg(feature = "metrics")]
use std::time::Instant;

/// Magic identifying an Intel OpenCL program binary ("CTNI" in memory).
pub const MAGIC_CL: u32 = 0x494E_5443;

/// Byte size of `SProgramBinaryHeader`: seven u32 fields.
pub const PROGRAM_HEADER_SIZE: usize = 28;

/// Byte size of `SKernelBinaryHeaderCommon` (packed): eight u32 fields
/// plus the u64 shader hash.
pub const KERNEL_HEADER_SIZE: usize = 40;

/// A region inside the source buffer, as byte offset + length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The region's bytes, or `None` if `buf` is not the source buffer
    /// this span was parsed from (or a shorter copy of it).
    pub fn slice<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        buf.get(self.offset..self.end())
    }
}

/// One kernel record, with its heaps located but not copied.
#[derive(Debug, Clone)]
pub struct KernelRecord {
    /// Logical name: the name bytes up to the first NUL.
    pub name: String,
    pub checksum: u32,
    pub shader_hash: u64,
    /// Per-kernel patch list, surfaced for later consumers, never decoded.
    pub patch_list: Span,
    /// Instruction heap (the kernel's ISA).
    pub heap: Span,
    pub general_state_size: u32,
    pub dynamic_state_size: u32,
    pub surface_state_size: u32,
    pub unpadded_size: u32,
}

/// A parsed program binary. Spans index into the buffer passed to
/// [`ProgramContainer::parse`]; the container itself owns no heap bytes.
#[derive(Debug, Clone)]
pub struct ProgramContainer {
    pub magic: u32,
    pub version: u32,
    pub device: u32,
    pub pointer_size: u32,
    pub stepping: u32,
    /// Program-level patch list, skipped as opaque.
    pub patch_list: Span,
    /// Kernel records in container order.
    pub kernels: Vec<KernelRecord>,
    /// Residual bytes after the last record. Tolerated, reported for
    /// diagnostics.
    pub trailing_bytes: usize,
}

/// Bounds-checked cursor over an immutable byte slice. `take` is the only
/// primitive that advances; everything else is built on it, so a record
/// stream can never be read past the end of the buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(Error::Truncated { offset: self.pos, needed: n })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, Error> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}

/// Name bytes are null-padded to `KernelNameSize`; the logical name stops
/// at the first NUL, or spans the whole field if none is present.
fn kernel_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl ProgramContainer {
    /// Parse one device's program binary.
    ///
    /// Fails with [`Error::BadMagic`] if the buffer does not start with
    /// [`MAGIC_CL`], and with [`Error::Truncated`] whenever a declared
    /// size runs past the end of the buffer. A failed parse yields no
    /// partial views.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        #[cfg(feature = "metrics")]
        let t = Instant::now();

        if buf.len() < PROGRAM_HEADER_SIZE {
            return Err(Error::Truncated { offset: 0, needed: PROGRAM_HEADER_SIZE });
        }
        let mut r = Reader::new(buf);

        let magic = r.u32()?;
        if magic != MAGIC_CL {
            return Err(Error::BadMagic(magic));
        }
        let version = r.u32()?;
        let device = r.u32()?;
        let pointer_size = r.u32()?;
        let number_of_kernels = r.u32()?;
        let stepping = r.u32()?;
        let patch_list_size = r.u32()? as usize;

        let patch_list = Span { offset: r.pos(), len: patch_list_size };
        r.take(patch_list_size)?;

        // NumberOfKernels is exact; there is no terminator record.
        let mut kernels = Vec::new();
        for _ in 0..number_of_kernels {
            let checksum = r.u32()?;
            let shader_hash = r.u64()?;
            let name_size = r.u32()? as usize;
            let kernel_patch_size = r.u32()? as usize;
            let heap_size = r.u32()? as usize;
            let general_state_size = r.u32()?;
            let dynamic_state_size = r.u32()?;
            let surface_state_size = r.u32()?;
            let unpadded_size = r.u32()?;

            let name = kernel_name(r.take(name_size)?);

            let patch_list = Span { offset: r.pos(), len: kernel_patch_size };
            r.take(kernel_patch_size)?;
            let heap = Span { offset: r.pos(), len: heap_size };
            r.take(heap_size)?;
            r.take(general_state_size as usize)?;
            r.take(dynamic_state_size as usize)?;
            r.take(surface_state_size as usize)?;

            kernels.push(KernelRecord {
                name,
                checksum,
                shader_hash,
                patch_list,
                heap,
                general_state_size,
                dynamic_state_size,
                surface_state_size,
                unpadded_size,
            });
        }

        let trailing_bytes = r.remaining();

        #[cfg(feature = "metrics")]
        {
            crate::metrics::CONTAINERS_PARSED.fetch_add(1, Ordering::Relaxed);
            crate::metrics::KERNELS_SEEN.fetch_add(kernels.len(), Ordering::Relaxed);
            crate::metrics::BYTES_SCANNED.fetch_add(buf.len(), Ordering::Relaxed);
            crate::metrics::record("parse", t);
        }

        Ok(Self {
            magic,
            version,
            device,
            pointer_size,
            stepping,
            patch_list,
            kernels,
            trailing_bytes,
        })
    }

    /// Linear scan by logical name; first match wins.
    pub fn find_kernel(&self, name: &str) -> Option<&KernelRecord> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// Owned copy of the named kernel's instruction heap, taken out of
    /// `buf` (the buffer this container was parsed from).
    pub fn kernel_heap(&self, buf: &[u8], name: &str) -> Result<Vec<u8>, Error> {
        let kernel = self
            .find_kernel(name)
            .ok_or_else(|| Error::KernelNotFound(name.to_owned()))?;
        let heap = kernel.heap.slice(buf).ok_or(Error::Truncated {
            offset: kernel.heap.offset,
            needed: kernel.heap.len,
        })?;
        Ok(heap.to_vec())
    }
}
