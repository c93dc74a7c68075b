//! Executor tests for fogger-blur.
//!
//! The lifecycle tests use a counting mock backend: every context and
//! buffer bumps a creation counter when handed out and a release counter
//! from `Drop`, and failures can be injected at any stage of the call.

use fogger_blur::{BlurExecutor, CpuBackend};
use fogger_core::Image;

use mock::{Counters, MockBackend, Stage};
use std::sync::Arc;

mod mock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fogger_blur::{
        BlurBackend, BlurError, BlurKernel, BlurResult, ComputeContext, DeviceBuffer,
    };
    use fogger_core::Image;

    /// Where to inject a failure inside a blur call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Stage {
        CreateContext,
        Upload,
        Allocate,
        CreateKernel,
        Execute,
        Finish,
        Download,
    }

    /// Acquire/release counts for every native-handle analogue.
    #[derive(Default)]
    pub struct Counters {
        pub contexts_created: AtomicUsize,
        pub contexts_released: AtomicUsize,
        pub buffers_created: AtomicUsize,
        pub buffers_released: AtomicUsize,
    }

    impl Counters {
        pub fn contexts(&self) -> (usize, usize) {
            (
                self.contexts_created.load(Ordering::SeqCst),
                self.contexts_released.load(Ordering::SeqCst),
            )
        }

        pub fn buffers(&self) -> (usize, usize) {
            (
                self.buffers_created.load(Ordering::SeqCst),
                self.buffers_released.load(Ordering::SeqCst),
            )
        }

        /// Every acquired resource has been released exactly once.
        pub fn assert_balanced(&self) {
            let (cc, cr) = self.contexts();
            let (bc, br) = self.buffers();
            assert_eq!(cc, cr, "contexts: {cc} created, {cr} released");
            assert_eq!(bc, br, "buffers: {bc} created, {br} released");
        }
    }

    pub struct MockBackend {
        pub counters: Arc<Counters>,
        fail_at: Option<Stage>,
    }

    impl MockBackend {
        pub fn new(fail_at: Option<Stage>) -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                fail_at,
            }
        }
    }

    impl BlurBackend for MockBackend {
        type Context = MockContext;

        fn name(&self) -> &'static str {
            "mock"
        }

        fn create_context(&self) -> BlurResult<Self::Context> {
            if self.fail_at == Some(Stage::CreateContext) {
                return Err(BlurError::ContextCreation("injected failure".into()));
            }
            self.counters
                .contexts_created
                .fetch_add(1, Ordering::SeqCst);
            Ok(MockContext {
                counters: self.counters.clone(),
                fail_at: self.fail_at,
            })
        }
    }

    pub struct MockContext {
        counters: Arc<Counters>,
        fail_at: Option<Stage>,
    }

    impl MockContext {
        fn new_buffer(&self, data: Vec<u8>, width: u32, height: u32) -> MockBuffer {
            self.counters.buffers_created.fetch_add(1, Ordering::SeqCst);
            MockBuffer {
                counters: self.counters.clone(),
                data,
                width,
                height,
            }
        }
    }

    impl Drop for MockContext {
        fn drop(&mut self) {
            self.counters
                .contexts_released
                .fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ComputeContext for MockContext {
        type Buffer = MockBuffer;
        type Kernel<'a> = MockKernel<'a>;

        fn upload(&self, image: &Image) -> BlurResult<Self::Buffer> {
            if self.fail_at == Some(Stage::Upload) {
                return Err(BlurError::BufferCreation("injected upload failure".into()));
            }
            let (w, h) = image.dimensions();
            Ok(self.new_buffer(image.data().to_vec(), w, h))
        }

        fn allocate_like(&self, buffer: &Self::Buffer) -> BlurResult<Self::Buffer> {
            if self.fail_at == Some(Stage::Allocate) {
                return Err(BlurError::BufferCreation(
                    "injected allocation failure".into(),
                ));
            }
            Ok(self.new_buffer(vec![0; buffer.data.len()], buffer.width, buffer.height))
        }

        fn blur_kernel(&self) -> BlurResult<Self::Kernel<'_>> {
            if self.fail_at == Some(Stage::CreateKernel) {
                return Err(BlurError::KernelExecution(
                    "injected kernel creation failure".into(),
                ));
            }
            Ok(MockKernel {
                fail: self.fail_at == Some(Stage::Execute),
                input: None,
            })
        }

        fn finish(&self) -> BlurResult<()> {
            if self.fail_at == Some(Stage::Finish) {
                return Err(BlurError::Synchronization("injected sync failure".into()));
            }
            Ok(())
        }

        fn download(&self, buffer: &Self::Buffer, into: &mut Image) -> BlurResult<()> {
            if self.fail_at == Some(Stage::Download) {
                return Err(BlurError::Readback("injected readback failure".into()));
            }
            into.data_mut().copy_from_slice(&buffer.data);
            Ok(())
        }
    }

    pub struct MockBuffer {
        counters: Arc<Counters>,
        data: Vec<u8>,
        width: u32,
        height: u32,
    }

    impl Drop for MockBuffer {
        fn drop(&mut self) {
            self.counters
                .buffers_released
                .fetch_add(1, Ordering::SeqCst);
        }
    }

    impl DeviceBuffer for MockBuffer {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }
    }

    /// Identity "blur": copies input to output, or fails when told to.
    pub struct MockKernel<'a> {
        fail: bool,
        input: Option<&'a MockBuffer>,
    }

    impl<'a> BlurKernel<'a> for MockKernel<'a> {
        type Buffer = MockBuffer;

        fn set_radius(&mut self, _radius: u32) {}

        fn bind_input(&mut self, input: &'a MockBuffer) {
            self.input = Some(input);
        }

        fn for_each(&mut self, output: &mut MockBuffer) -> BlurResult<()> {
            if self.fail {
                return Err(BlurError::KernelExecution("injected kernel failure".into()));
            }
            let input = self
                .input
                .ok_or_else(|| BlurError::KernelExecution("no input buffer bound".into()))?;
            output.data.copy_from_slice(&input.data);
            Ok(())
        }
    }
}

fn test_image(width: u32, height: u32, pixel: [u8; 4]) -> Image {
    let mut img = Image::new(width, height).unwrap();
    img.fill(pixel);
    img
}

// === Lifecycle (resource-tracking double) ===

#[test]
fn test_success_path_releases_everything_once() {
    let backend = MockBackend::new(None);
    let counters: Arc<Counters> = backend.counters.clone();
    let executor = BlurExecutor::new(backend);

    let out = executor.blur(test_image(4, 4, [9, 9, 9, 255]), 3).unwrap();
    assert_eq!(out.dimensions(), (4, 4));

    counters.assert_balanced();
    assert_eq!(counters.contexts(), (1, 1));
    assert_eq!(counters.buffers(), (2, 2));
}

#[test]
fn test_failure_at_every_stage_still_cleans_up() {
    let stages = [
        Stage::CreateContext,
        Stage::Upload,
        Stage::Allocate,
        Stage::CreateKernel,
        Stage::Execute,
        Stage::Finish,
        Stage::Download,
    ];

    for stage in stages {
        let backend = MockBackend::new(Some(stage));
        let counters = backend.counters.clone();
        let executor = BlurExecutor::new(backend);

        let err = executor
            .blur(test_image(4, 4, [9, 9, 9, 255]), 3)
            .expect_err("injected failure must surface");
        assert!(
            err.is_execution_failure(),
            "{stage:?} produced {err}, not an execution failure"
        );

        counters.assert_balanced();
    }
}

#[test]
fn test_forced_kernel_failure_releases_both_buffers_and_context() {
    let backend = MockBackend::new(Some(Stage::Execute));
    let counters = backend.counters.clone();
    let executor = BlurExecutor::new(backend);

    executor
        .blur(test_image(2, 2, [1, 2, 3, 255]), 1)
        .unwrap_err();

    // Both buffers existed by the time the kernel ran; all released.
    assert_eq!(counters.buffers(), (2, 2));
    assert_eq!(counters.contexts(), (1, 1));
}

// === End-to-end on the CPU backend ===

#[test]
fn test_output_matches_input_dimensions() {
    let executor = BlurExecutor::new(CpuBackend::new());
    let out = executor.blur(test_image(7, 3, [50, 60, 70, 255]), 2).unwrap();
    assert_eq!(out.dimensions(), (7, 3));
    assert_eq!(out.size_bytes(), 7 * 3 * 4);
}

#[test]
fn test_solid_color_is_invariant_under_blur() {
    let executor = BlurExecutor::new(CpuBackend::new());
    let color = [120, 30, 200, 255];
    let out = executor.blur(test_image(4, 4, color), 5).unwrap();
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(out.pixel(x, y), color);
        }
    }
}

#[test]
fn test_diagonal_split_blends_corners() {
    // 2x2, white and black split diagonally.
    let data = vec![
        255, 255, 255, 255, // (0,0) white
        0, 0, 0, 255, // (1,0) black
        0, 0, 0, 255, // (0,1) black
        255, 255, 255, 255, // (1,1) white
    ];
    let img = Image::from_rgba8(data, 2, 2).unwrap();

    let executor = BlurExecutor::new(CpuBackend::new());
    let out = executor.blur(img, 1).unwrap();

    for y in 0..2 {
        for x in 0..2 {
            let [r, g, b, a] = out.pixel(x, y);
            // Every corner moved off its original color toward a blend.
            for v in [r, g, b] {
                assert!(v > 0 && v < 255, "pixel ({x},{y}) not blended: {v}");
            }
            // Both source colors were opaque; blurring keeps them so.
            assert_eq!(a, 255);
        }
    }
}

#[test]
fn test_radius_zero_returns_identical_pixels() {
    let mut img = test_image(3, 3, [10, 20, 30, 255]);
    img.data_mut()[0] = 77;
    let reference = img.duplicate();

    let executor = BlurExecutor::new(CpuBackend::new());
    let out = executor.blur(img, 0).unwrap();
    assert_eq!(out, reference);
}

#[test]
fn test_oversized_radius_still_succeeds() {
    // The executor passes the radius through verbatim; the kernel clamps.
    let executor = BlurExecutor::new(CpuBackend::new());
    let color = [80, 80, 80, 255];
    let out = executor.blur(test_image(4, 4, color), 10_000).unwrap();
    assert_eq!(out.pixel(0, 0), color);
}
