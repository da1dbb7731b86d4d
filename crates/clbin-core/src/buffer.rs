//! Typestate wrapper around a device buffer: `Queued` (no valid device
//! contents yet) → `InFlight` (a transfer or kernel is touching it) →
//! `Ready` (device contents are valid). Transfers hand back a
//! [`GpuEventGuard`] that waits on the underlying event when dropped.

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    event::{Event, wait_for_events},
    memory::{Buffer, CL_MEM_READ_WRITE},
    types::{CL_NON_BLOCKING, cl_event},
};

use std::{marker::PhantomData, ptr};

use crate::Error;

mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

pub struct Queued;
impl sealed::Sealed for Queued {}
impl State for Queued {}

pub struct InFlight;
impl sealed::Sealed for InFlight {}
impl State for InFlight {}

pub struct Ready;
impl sealed::Sealed for Ready {}
impl State for Ready {}

pub struct GpuBuffer<S> {
    buf: Buffer<u8>,
    len: usize,
    _state: PhantomData<S>,
}

impl GpuBuffer<Queued> {
    pub fn new(context: &Context, len: usize) -> Result<Self, Error> {
        let buf = Buffer::<u8>::create(context, CL_MEM_READ_WRITE, len, ptr::null_mut())?;
        Ok(Self { buf, len, _state: PhantomData })
    }

    /// Allocate, upload `data` and wait for the copy. Convenience for the
    /// common one-shot input buffer.
    pub fn from_slice(
        context: &Context,
        queue: &CommandQueue,
        data: &[u8],
    ) -> Result<GpuBuffer<Ready>, Error> {
        let buf = Self::new(context, data.len())?;
        let (in_flight, guard) = buf.enqueue_write(queue, data)?;
        guard.wait()?;
        Ok(in_flight.finish())
    }

    pub fn enqueue_write(
        mut self,
        queue: &CommandQueue,
        host: &[u8],
    ) -> Result<(GpuBuffer<InFlight>, GpuEventGuard), Error> {
        debug_assert_eq!(host.len(), self.len, "host data length mismatch");
        let evt = queue.enqueue_write_buffer(&mut self.buf, CL_NON_BLOCKING, 0, host, &[])?;
        Ok((
            GpuBuffer { buf: self.buf, len: self.len, _state: PhantomData },
            GpuEventGuard { evt },
        ))
    }

    /// A kernel filled this buffer; wait on its event and treat the
    /// contents as valid.
    pub fn into_ready(self, evt: cl_event) -> Result<GpuBuffer<Ready>, Error> {
        wait_for_events(&[evt])?;
        Ok(GpuBuffer { buf: self.buf, len: self.len, _state: PhantomData })
    }
}

impl GpuBuffer<InFlight> {
    /// Declare the in-flight operation complete. Callers must have waited
    /// on the matching [`GpuEventGuard`] first.
    pub fn finish(self) -> GpuBuffer<Ready> {
        GpuBuffer { buf: self.buf, len: self.len, _state: PhantomData }
    }
}

impl GpuBuffer<Ready> {
    pub fn enqueue_read(
        mut self,
        queue: &CommandQueue,
        host_out: &mut [u8],
    ) -> Result<(GpuBuffer<InFlight>, GpuEventGuard), Error> {
        debug_assert_eq!(host_out.len(), self.len, "host output length mismatch");
        let evt = queue.enqueue_read_buffer(&mut self.buf, CL_NON_BLOCKING, 0, host_out, &[])?;
        Ok((
            GpuBuffer { buf: self.buf, len: self.len, _state: PhantomData },
            GpuEventGuard { evt },
        ))
    }
}

impl<S> GpuBuffer<S> {
    pub fn raw(&self) -> &Buffer<u8> {
        &self.buf
    }

    pub fn raw_mut(&mut self) -> &mut Buffer<u8> {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Waits on its event when dropped, so an in-flight transfer can never
/// outlive the host slice it reads from or writes into.
pub struct GpuEventGuard {
    evt: Event,
}

impl GpuEventGuard {
    /// Explicit wait; reports the error the drop path would swallow.
    /// The second wait in `drop` returns immediately on a completed event.
    pub fn wait(self) -> Result<(), Error> {
        self.evt.wait().map_err(Error::from)
    }
}

impl Drop for GpuEventGuard {
    fn drop(&mut self) {
        let _ = self.evt.wait();
    }
}
