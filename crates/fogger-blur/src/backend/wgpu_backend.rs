//! wgpu backend implementation.
//!
//! Box blur on the GPU: packed RGBA8 pixels in storage buffers, one
//! compute pipeline per pass (horizontal, vertical). The context owns a
//! freshly requested device and queue; it is created per blur call and
//! destroyed with it, like every other resource here.

use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

use super::{BlurBackend, BlurKernel, ComputeContext, DeviceBuffer, MAX_RADIUS};
use crate::shaders;
use crate::{BlurError, BlurResult};
use fogger_core::Image;

/// Dimensions uniform: [width, height, radius, 0].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DimsUniform {
    dims: [u32; 4],
}

/// wgpu processing backend.
#[derive(Debug, Default)]
pub struct WgpuBackend;

impl WgpuBackend {
    pub fn new() -> Self {
        Self
    }

    /// Check if a GPU adapter is available.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }
}

impl BlurBackend for WgpuBackend {
    type Context = WgpuContext;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_context(&self) -> BlurResult<Self::Context> {
        WgpuContext::new()
    }
}

/// wgpu compute context: device, queue, and the two blur pipelines.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    blur_h: wgpu::ComputePipeline,
    blur_v: wgpu::ComputePipeline,
}

impl WgpuContext {
    fn new() -> BlurResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> BlurResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BlurError::NoAdapter)?;

        let info = adapter.get_info();
        debug!(adapter = %info.name, backend = ?info.backend, "creating compute context");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fogger-blur"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| BlurError::ContextCreation(e.to_string()))?;

        let blur_h = create_pipeline(&device, shaders::BLUR_H, "blur_h_pipeline");
        let blur_v = create_pipeline(&device, shaders::BLUR_V, "blur_v_pipeline");

        Ok(Self {
            device,
            queue,
            blur_h,
            blur_v,
        })
    }

    fn create_dims_buffer(&self, w: u32, h: u32, radius: u32) -> wgpu::Buffer {
        let uniform = DimsUniform {
            dims: [w, h, radius, 0],
        };
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("dims_uniform"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }
}

impl ComputeContext for WgpuContext {
    type Buffer = WgpuBuffer;
    type Kernel<'a> = WgpuBoxBlur<'a>;

    fn upload(&self, image: &Image) -> BlurResult<Self::Buffer> {
        let (width, height) = image.dimensions();
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("input_buffer"),
                contents: image.data(),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });
        Ok(WgpuBuffer {
            buffer,
            width,
            height,
        })
    }

    fn allocate_like(&self, buffer: &Self::Buffer) -> BlurResult<Self::Buffer> {
        let out = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output_buffer"),
            size: buffer.size_bytes(),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(WgpuBuffer {
            buffer: out,
            width: buffer.width,
            height: buffer.height,
        })
    }

    fn blur_kernel(&self) -> BlurResult<Self::Kernel<'_>> {
        Ok(WgpuBoxBlur {
            context: self,
            radius: 0,
            input: None,
        })
    }

    fn finish(&self) -> BlurResult<()> {
        self.device.poll(wgpu::Maintain::Wait);
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
        let size = buffer.size_bytes();

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| BlurError::Readback("map channel closed".into()))?
            .map_err(|e| BlurError::Readback(format!("map failed: {e}")))?;

        let data = slice.get_mapped_range();
        into.data_mut().copy_from_slice(&data);
        drop(data);
        staging.unmap();

        Ok(())
    }
}

/// GPU device buffer holding packed RGBA8 pixels.
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl DeviceBuffer for WgpuBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// GPU box blur kernel (horizontal + vertical compute passes).
pub struct WgpuBoxBlur<'a> {
    context: &'a WgpuContext,
    radius: u32,
    input: Option<&'a WgpuBuffer>,
}

impl<'a> BlurKernel<'a> for WgpuBoxBlur<'a> {
    type Buffer = WgpuBuffer;

    fn set_radius(&mut self, radius: u32) {
        self.radius = radius.min(MAX_RADIUS);
    }

    fn bind_input(&mut self, input: &'a WgpuBuffer) {
        self.input = Some(input);
    }

    fn for_each(&mut self, output: &mut WgpuBuffer) -> BlurResult<()> {
        let input = self
            .input
            .ok_or_else(|| BlurError::KernelExecution("no input buffer bound".into()))?;
        if input.dimensions() != output.dimensions() {
            return Err(BlurError::KernelExecution(format!(
                "input is {}x{} but output is {}x{}",
                input.width, input.height, output.width, output.height
            )));
        }

        let ctx = self.context;
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blur_encoder"),
            });

        if self.radius == 0 {
            encoder.copy_buffer_to_buffer(&input.buffer, 0, &output.buffer, 0, input.size_bytes());
            ctx.queue.submit(std::iter::once(encoder.finish()));
            return Ok(());
        }

        let (w, h) = input.dimensions();
        let dims = ctx.create_dims_buffer(w, h, self.radius);
        // Scratch for the horizontal pass; freed with the kernel, before
        // the call's teardown touches input and output.
        let scratch = ctx.allocate_like(input)?;

        let bind_h = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur_h_bind_group"),
            layout: &ctx.blur_h.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scratch.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: dims.as_entire_binding(),
                },
            ],
        });
        let bind_v = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur_v_bind_group"),
            layout: &ctx.blur_v.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scratch.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: dims.as_entire_binding(),
                },
            ],
        });

        let workgroups = (w * h).div_ceil(256);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("blur_h_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.blur_h);
            pass.set_bind_group(0, &bind_h, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("blur_v_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.blur_v);
            pass.set_bind_group(0, &bind_v, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn create_pipeline(device: &wgpu::Device, source: &str, label: &str) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: None, // Auto layout
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}
