//! Compute backends for image blurring.
//!
//! The capability interface is deliberately narrow: a backend creates a
//! per-call [`ComputeContext`]; the context uploads pixels into
//! [`DeviceBuffer`]s and hands out a [`BlurKernel`] that is configured
//! with a radius, bound to an input buffer, and executed once into an
//! output buffer. Nothing here is pooled or cached between calls.

mod cpu;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu::{CpuBackend, CpuBoxBlur, CpuBuffer, CpuContext};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuBackend, WgpuBoxBlur, WgpuBuffer, WgpuContext};

use crate::BlurResult;
use fogger_core::Image;

/// Largest support window the bundled kernels accept. Radii beyond this
/// are clamped by the kernels themselves; the executor passes the caller's
/// radius through verbatim.
pub const MAX_RADIUS: u32 = 25;

/// Factory for per-call compute contexts.
///
/// The backend is the caller-supplied execution environment; it may be
/// held for the life of the application, but every [`blur`] call creates
/// and destroys its own [`ComputeContext`].
///
/// [`blur`]: crate::BlurExecutor::blur
pub trait BlurBackend {
    type Context: ComputeContext;

    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    /// Create a compute context for a single blur call.
    fn create_context(&self) -> BlurResult<Self::Context>;
}

/// A handle to the compute runtime, exclusively owned by one blur call.
///
/// Dropping the context destroys the underlying runtime handle; the
/// executor guarantees this happens exactly once per call, after both
/// device buffers have been released.
pub trait ComputeContext {
    type Buffer: DeviceBuffer;
    type Kernel<'a>: BlurKernel<'a, Buffer = Self::Buffer>
    where
        Self: 'a;

    /// Upload an image into a new read-only input buffer.
    fn upload(&self, image: &Image) -> BlurResult<Self::Buffer>;

    /// Allocate an output buffer with the same layout as `buffer`.
    fn allocate_like(&self, buffer: &Self::Buffer) -> BlurResult<Self::Buffer>;

    /// Instantiate the blur kernel for this context.
    fn blur_kernel(&self) -> BlurResult<Self::Kernel<'_>>;

    /// Block until all queued compute work has completed.
    fn finish(&self) -> BlurResult<()>;

    /// Copy a device buffer's contents back into `into`.
    fn download(&self, buffer: &Self::Buffer, into: &mut Image) -> BlurResult<()>;
}

/// A compute-visible pixel buffer bound to a [`ComputeContext`].
///
/// Released by drop; the executor's teardown block drops the input buffer
/// first, then the output buffer, before the context itself.
pub trait DeviceBuffer {
    /// Buffer dimensions (width, height) in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Size in bytes of the backing memory (RGBA8).
    fn size_bytes(&self) -> u64 {
        let (w, h) = self.dimensions();
        (w as u64) * (h as u64) * 4
    }
}

/// The external blur primitive: configure a radius, bind an input, execute
/// once over every element.
///
/// The lifetime ties the kernel to the context that created it and to the
/// input buffer it is bound to; both outlive the single `for_each` call.
pub trait BlurKernel<'a> {
    type Buffer: 'a;

    /// Configure the kernel's support window. Values above [`MAX_RADIUS`]
    /// are clamped; radius 0 degenerates to a copy.
    fn set_radius(&mut self, radius: u32);

    /// Bind the source buffer the kernel reads from.
    fn bind_input(&mut self, input: &'a Self::Buffer);

    /// Execute the kernel over every element, writing into `output`.
    ///
    /// Fails if no input has been bound or the buffers disagree on layout.
    fn for_each(&mut self, output: &mut Self::Buffer) -> BlurResult<()>;
}
