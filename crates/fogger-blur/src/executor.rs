//! The blur operation: a single linear sequence with one exit guarantee.

use tracing::debug;

use crate::backend::{BlurBackend, BlurKernel, ComputeContext};
use crate::{BlurResult, support};
use fogger_core::Image;

/// Produces blurred copies of images using a caller-supplied backend.
///
/// Each [`blur`](Self::blur) call creates its own compute context and
/// device buffers and releases them before returning, in a fixed order
/// that runs on every exit path: input buffer, output buffer, source
/// image, compute context. Nothing is shared between calls.
pub struct BlurExecutor<B: BlurBackend> {
    backend: B,
}

impl<B: BlurBackend> BlurExecutor<B> {
    /// Create an executor over the given backend. The backend is the
    /// caller's execution environment and may outlive many calls; the
    /// per-call resources do not.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Backend name, for logging.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Blur `image` with the given radius, returning a new image of
    /// identical dimensions and format.
    ///
    /// The source image is consumed: its buffer is released before this
    /// method returns whether the blur succeeded or not. The radius is
    /// passed to the kernel verbatim; the bundled kernels clamp it to
    /// [`MAX_RADIUS`](crate::MAX_RADIUS).
    ///
    /// One attempt per call; on failure no image is returned and every
    /// resource created so far has already been released.
    pub fn blur(&self, image: Image, radius: u32) -> BlurResult<Image> {
        support::ensure_loaded()?;

        let (width, height) = image.dimensions();
        debug!(
            backend = self.backend.name(),
            width, height, radius, "blurring image"
        );

        let mut blurred = image.duplicate();
        let context = self.backend.create_context()?;

        // The fallible steps store their buffers in these slots so that an
        // early error return cannot skip the teardown below.
        let mut input = None;
        let mut output = None;
        let outcome = run_kernel(&context, &image, radius, &mut input, &mut output, &mut blurred);

        // Teardown, on success and failure alike. Fixed order: input
        // buffer, output buffer, source image, compute context.
        drop(input);
        drop(output);
        drop(image);
        drop(context);

        outcome?;
        Ok(blurred)
    }
}

/// Steps 3-8 of the blur sequence: upload, allocate, configure, execute,
/// synchronize, read back. Created buffers are parked in the caller's
/// slots, never owned here, so they survive an early `?`.
fn run_kernel<'a, C: ComputeContext>(
    context: &'a C,
    source: &Image,
    radius: u32,
    input: &'a mut Option<C::Buffer>,
    output: &'a mut Option<C::Buffer>,
    blurred: &mut Image,
) -> BlurResult<()> {
    let input = &*input.insert(context.upload(source)?);
    let output = output.insert(context.allocate_like(input)?);

    let mut kernel = context.blur_kernel()?;
    kernel.set_radius(radius);
    kernel.bind_input(input);
    kernel.for_each(output)?;

    context.finish()?;
    context.download(output, blurred)
}
