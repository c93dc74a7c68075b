//! Image blurring via pluggable compute backends, with deterministic
//! resource cleanup.
//!
//! The blur math itself is delegated to a kernel behind the
//! [`BlurKernel`] capability interface; this crate's job is the resource
//! lifecycle around it: every compute context and device buffer created
//! during a call is released exactly once before the call returns, on
//! success and on failure alike, and the source image is always consumed.
//!
//! # Architecture
//!
//! ```text
//! BlurExecutor<B: BlurBackend>
//!     └── ComputeContext (one per call, never pooled)
//!             ├── DeviceBuffer (input, output)
//!             └── BlurKernel (set_radius / bind_input / for_each)
//!                     ├── CpuBoxBlur  (rayon)
//!                     └── WgpuBoxBlur (compute shaders, `wgpu` feature)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fogger_blur::{BlurExecutor, CpuBackend};
//! use fogger_core::Image;
//!
//! let executor = BlurExecutor::new(CpuBackend::new());
//! let blurred = executor.blur(image, 12)?;
//! ```
//!
//! Note that `blur` takes the source image by value: its buffer is
//! released before the call returns whether or not the blur succeeded.

pub mod backend;
mod executor;
mod shaders;
pub mod support;

pub use backend::{BlurBackend, BlurKernel, ComputeContext, CpuBackend, DeviceBuffer, MAX_RADIUS};
#[cfg(feature = "wgpu")]
pub use backend::WgpuBackend;
pub use executor::BlurExecutor;

use thiserror::Error;

/// Blur operation errors.
///
/// Everything except [`NativeLoadFailure`](BlurError::NativeLoadFailure)
/// is a per-call execution failure: it reaches the caller only after the
/// call's teardown block has released whatever resources were created.
#[derive(Error, Debug)]
pub enum BlurError {
    #[error("native compute support unavailable on runtime '{runtime}': {reason}")]
    NativeLoadFailure { runtime: String, reason: String },

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create compute context: {0}")]
    ContextCreation(String),

    #[error("failed to create device buffer: {0}")]
    BufferCreation(String),

    #[error("blur kernel execution failed: {0}")]
    KernelExecution(String),

    #[error("compute synchronization failed: {0}")]
    Synchronization(String),

    #[error("device readback failed: {0}")]
    Readback(String),
}

impl BlurError {
    /// Whether this is a per-call execution failure (as opposed to the
    /// process-wide native support load failing).
    pub fn is_execution_failure(&self) -> bool {
        !matches!(self, Self::NativeLoadFailure { .. })
    }
}

pub type BlurResult<T> = Result<T, BlurError>;
