pub mod container;
pub mod runtime;

mod buffer;
pub use buffer::{GpuBuffer, GpuEventGuard, InFlight, Queued, Ready, State};

#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::summary;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no GPU device found on any platform")]
    NoDevice,
    #[error("program build failed:\n{0}")]
    BuildFailed(String),
    #[error("OpenCL API error {0}")]
    Api(i32),
    #[error("truncated container: need {needed} byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("bad container magic {0:#010x}")]
    BadMagic(u32),
    #[error("kernel {0:?} not present in container")]
    KernelNotFound(String),
}

impl Error {
    /// Process exit code used by the harness binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoDevice | Error::BuildFailed(_) | Error::Api(_) => 2,
            Error::Truncated { .. } | Error::BadMagic(_) => 3,
            Error::KernelNotFound(_) => 4,
        }
    }
}

impl From<opencl3::error_codes::ClError> for Error {
    fn from(err: opencl3::error_codes::ClError) -> Self {
        Error::Api(err.0)
    }
}

impl From<i32> for Error {
    fn from(code: i32) -> Self {
        Error::Api(code)
    }
}
