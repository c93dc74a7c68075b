//! CPU backend using rayon for parallelization.
//!
//! The kernel is a separable, edge-clamped box blur over interleaved
//! RGBA8 rows and columns. It stands in for the platform blur intrinsic
//! on machines without a GPU and in the default test suite.

use rayon::prelude::*;

use super::{BlurBackend, BlurKernel, ComputeContext, DeviceBuffer, MAX_RADIUS};
use crate::{BlurError, BlurResult};
use fogger_core::{CHANNELS, Image};

/// CPU processing backend.
#[derive(Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl BlurBackend for CpuBackend {
    type Context = CpuContext;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn create_context(&self) -> BlurResult<Self::Context> {
        Ok(CpuContext)
    }
}

/// CPU compute context. Carries no state; buffers live in RAM.
#[derive(Debug)]
pub struct CpuContext;

impl ComputeContext for CpuContext {
    type Buffer = CpuBuffer;
    type Kernel<'a> = CpuBoxBlur<'a>;

    fn upload(&self, image: &Image) -> BlurResult<Self::Buffer> {
        let (width, height) = image.dimensions();
        Ok(CpuBuffer {
            data: image.data().to_vec(),
            width,
            height,
        })
    }

    fn allocate_like(&self, buffer: &Self::Buffer) -> BlurResult<Self::Buffer> {
        Ok(CpuBuffer {
            data: vec![0; buffer.data.len()],
            width: buffer.width,
            height: buffer.height,
        })
    }

    fn blur_kernel(&self) -> BlurResult<Self::Kernel<'_>> {
        Ok(CpuBoxBlur {
            radius: 0,
            input: None,
        })
    }

    fn finish(&self) -> BlurResult<()> {
        // Kernel execution is synchronous on this backend; nothing queued.
        Ok(())
    }

    fn download(&self, buffer: &Self::Buffer, into: &mut Image) -> BlurResult<()> {
        if buffer.dimensions() != into.dimensions() {
            return Err(BlurError::Readback(format!(
                "buffer is {}x{} but target image is {}x{}",
                buffer.width,
                buffer.height,
                into.width(),
                into.height()
            )));
        }
        into.data_mut().copy_from_slice(&buffer.data);
        Ok(())
    }
}

/// CPU device buffer - pixel data stored in RAM.
pub struct CpuBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl DeviceBuffer for CpuBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Separable box blur kernel (rayon-parallel over rows).
pub struct CpuBoxBlur<'a> {
    radius: u32,
    input: Option<&'a CpuBuffer>,
}

impl<'a> BlurKernel<'a> for CpuBoxBlur<'a> {
    type Buffer = CpuBuffer;

    fn set_radius(&mut self, radius: u32) {
        self.radius = radius.min(MAX_RADIUS);
    }

    fn bind_input(&mut self, input: &'a CpuBuffer) {
        self.input = Some(input);
    }

    fn for_each(&mut self, output: &mut CpuBuffer) -> BlurResult<()> {
        let input = self
            .input
            .ok_or_else(|| BlurError::KernelExecution("no input buffer bound".into()))?;
        if input.dimensions() != output.dimensions() {
            return Err(BlurError::KernelExecution(format!(
                "input is {}x{} but output is {}x{}",
                input.width, input.height, output.width, output.height
            )));
        }
        if self.radius == 0 {
            output.data.copy_from_slice(&input.data);
            return Ok(());
        }

        let width = input.width as usize;
        let height = input.height as usize;
        let radius = self.radius as usize;

        // Horizontal pass into a scratch buffer, then vertical pass into
        // the output. The scratch is kernel-internal and freed on return.
        let mut scratch = vec![0u8; input.data.len()];
        box_blur_rows(&input.data, &mut scratch, width, radius);
        box_blur_cols(&scratch, &mut output.data, width, height, radius);
        Ok(())
    }
}

/// Horizontal box pass. Rows are independent, so each is processed on its
/// own rayon task.
fn box_blur_rows(src: &[u8], dst: &mut [u8], width: usize, radius: usize) {
    let row_bytes = width * CHANNELS;
    let count = (2 * radius + 1) as u32;

    dst.par_chunks_mut(row_bytes)
        .zip(src.par_chunks(row_bytes))
        .for_each(|(drow, srow)| {
            for x in 0..width {
                let mut acc = [0u32; CHANNELS];
                for i in -(radius as isize)..=(radius as isize) {
                    let sx = (x as isize + i).clamp(0, width as isize - 1) as usize;
                    let base = sx * CHANNELS;
                    for ch in 0..CHANNELS {
                        acc[ch] += srow[base + ch] as u32;
                    }
                }
                let base = x * CHANNELS;
                for ch in 0..CHANNELS {
                    drow[base + ch] = ((acc[ch] + count / 2) / count) as u8;
                }
            }
        });
}

/// Vertical box pass. Output rows are independent; each task reads the
/// clamped window of source rows around it.
fn box_blur_cols(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    let row_bytes = width * CHANNELS;
    let count = (2 * radius + 1) as u32;

    dst.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, drow)| {
            for x in 0..width {
                let mut acc = [0u32; CHANNELS];
                for i in -(radius as isize)..=(radius as isize) {
                    let sy = (y as isize + i).clamp(0, height as isize - 1) as usize;
                    let base = (sy * width + x) * CHANNELS;
                    for ch in 0..CHANNELS {
                        acc[ch] += src[base + ch] as u32;
                    }
                }
                let base = x * CHANNELS;
                for ch in 0..CHANNELS {
                    drow[base + ch] = ((acc[ch] + count / 2) / count) as u8;
                }
            }
        });
}
