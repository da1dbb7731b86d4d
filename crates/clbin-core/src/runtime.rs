//! Thin facade over the OpenCL runtime: device enumeration, context and
//! queue setup, program build, and retrieval of per-device program
//! binaries. Binary contents are never inspected here; that is the
//! container parser's job.

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::{CL_DEVICE_TYPE_GPU, Device},
    error_codes::CL_INVALID_VALUE,
    kernel::Kernel,
    platform::{Platform, get_platforms},
    program::Program,
    types::cl_device_id,
};
use std::ptr;

use crate::Error;

/// First platform exposing at least one GPU device, with its GPU device
/// list in runtime order. That order is the order `binaries` reports in.
pub fn gpu_platform() -> Result<(Platform, Vec<cl_device_id>), Error> {
    for platform in get_platforms()? {
        let devices = platform.get_devices(CL_DEVICE_TYPE_GPU).unwrap_or_default();
        if !devices.is_empty() {
            return Ok((platform, devices));
        }
    }
    Err(Error::NoDevice)
}

/// Context plus command queue over a fixed device set.
pub struct Session {
    pub context: Context,
    pub queue: CommandQueue,
    devices: Vec<cl_device_id>,
}

impl Session {
    /// The queue lives on the first device; programs are built for all of
    /// them.
    pub fn create(devices: Vec<cl_device_id>) -> Result<Self, Error> {
        if devices.is_empty() {
            return Err(Error::NoDevice);
        }
        let context = Context::from_devices(&devices, &[], None, ptr::null_mut())?;
        let queue = CommandQueue::create(&context, devices[0], 0)?;
        Ok(Self { context, queue, devices })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> &[cl_device_id] {
        &self.devices
    }

    pub fn device_name(&self, index: usize) -> Result<String, Error> {
        Ok(Device::new(self.devices[index]).name()?)
    }

    /// Build `source` for the whole device set. Blocks until the build is
    /// finished; on failure the build logs of all devices are collected
    /// into [`Error::BuildFailed`].
    pub fn build(&self, source: &str, options: &str) -> Result<BuiltProgram, Error> {
        let mut program = Program::create_from_source(&self.context, source)?;
        if program.build(&self.devices, options).is_err() {
            let log = self
                .devices
                .iter()
                .filter_map(|&d| program.get_build_log(d).ok())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::BuildFailed(log));
        }
        Ok(BuiltProgram { program, num_devices: self.devices.len() })
    }
}

/// A successfully built program. Binary queries only exist on this type,
/// so they cannot be issued before the build has completed.
pub struct BuiltProgram {
    program: Program,
    num_devices: usize,
}

impl BuiltProgram {
    pub fn kernel(&self, name: &str) -> Result<Kernel, Error> {
        Ok(Kernel::create(&self.program, name)?)
    }

    /// Per-device compiled binary sizes, aligned to the session's device
    /// order.
    pub fn binary_sizes(&self) -> Result<Vec<usize>, Error> {
        Ok(self.program.get_binary_sizes()?)
    }

    /// Per-device compiled binaries, one owned buffer per device. Each
    /// buffer is checked against the size the runtime declared for it.
    pub fn binaries(&self) -> Result<Vec<Vec<u8>>, Error> {
        let sizes = self.binary_sizes()?;
        let blobs = self.program.get_binaries()?;
        if blobs.len() != self.num_devices || sizes.len() != self.num_devices {
            return Err(Error::Api(CL_INVALID_VALUE));
        }
        for (blob, &size) in blobs.iter().zip(&sizes) {
            if blob.len() != size {
                return Err(Error::Api(CL_INVALID_VALUE));
            }
        }
        Ok(blobs)
    }
}
