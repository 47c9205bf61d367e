//! wgpu Renderer
//!
//! Presents the CPU canvas in the window. The canvas pixels are uploaded to
//! a texture whenever they change and blitted to the surface each frame,
//! letterboxed so the drawing keeps its aspect ratio. Pointer positions go
//! through the same [`Viewport`] in reverse to land in canvas pixels.

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::debug;
use crate::error::RenderError;
use crate::shape::Point;

/// Uniforms for blit shader (quad scale in NDC)
#[repr(C, align(16))] // Force 16-byte alignment for WebGL compatibility
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitUniforms {
    scale: [f32; 2],
    _padding: [f32; 2],
}

/// Where the canvas sits inside the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Window pixels per canvas pixel
    pub scale: f32,
    /// Top-left of the canvas in window pixels
    pub offset: [f32; 2],
    /// Window size in pixels
    pub surface: [f32; 2],
}

impl Viewport {
    /// Fit a `canvas_size` canvas centered in a `surface_size` window
    pub fn fit(canvas_size: (u32, u32), surface_size: (u32, u32)) -> Self {
        let (cw, ch) = (canvas_size.0.max(1) as f32, canvas_size.1.max(1) as f32);
        let (sw, sh) = (surface_size.0.max(1) as f32, surface_size.1.max(1) as f32);
        let scale = (sw / cw).min(sh / ch);
        Self {
            scale,
            offset: [(sw - cw * scale) / 2.0, (sh - ch * scale) / 2.0],
            surface: [sw, sh],
        }
    }

    /// Map a window position to canvas pixels
    pub fn to_canvas(&self, x: f64, y: f64) -> Point {
        Point::new(
            (x as f32 - self.offset[0]) / self.scale,
            (y as f32 - self.offset[1]) / self.scale,
        )
    }

    /// Half-extent of the canvas quad in normalized device coordinates
    fn ndc_scale(&self) -> [f32; 2] {
        [
            1.0 - 2.0 * self.offset[0] / self.surface[0],
            1.0 - 2.0 * self.offset[1] / self.surface[1],
        ]
    }
}

/// Renderer wraps the wgpu device, queue, and surface
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    max_texture_dimension: u32,

    // Canvas pixels as last uploaded
    canvas_texture: wgpu::Texture,
    canvas_view: wgpu::TextureView,
    canvas_size: (u32, u32),

    // Blit pipeline for copying canvas to surface
    blit_pipeline: wgpu::RenderPipeline,
    blit_uniform_buffer: wgpu::Buffer,
    blit_bind_group: wgpu::BindGroup,
    canvas_sampler: wgpu::Sampler,
}

impl Renderer {
    /// Create a renderer for `window`, sized for a `canvas_size` canvas
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        size: winit::dpi::PhysicalSize<u32>,
        canvas_size: (u32, u32),
    ) -> Result<Self, RenderError> {
        debug::update_status("Creating wgpu instance...");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all() & !wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;
        debug::update_status("Requesting adapter...");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!("Adapter acquired: {:?} (backend: {:?})", adapter_info.name, adapter_info.backend);
        debug::update_status(&format!("Using: {:?}", adapter_info.backend));

        let adapter_limits = adapter.limits();
        let max_texture_dimension = adapter_limits.max_texture_dimension_2d;

        let mut device_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults()
        } else {
            wgpu::Limits::default()
        };
        device_limits.max_texture_dimension_2d = adapter_limits.max_texture_dimension_2d;
        device_limits.max_texture_dimension_1d = adapter_limits.max_texture_dimension_1d;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Sketch Canvas Device"),
                required_features: wgpu::Features::empty(),
                required_limits: device_limits,
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Prefer sRGB formats so the sRGB canvas texture round-trips unchanged
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        log::info!("Selected surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.min(max_texture_dimension),
            height: size.height.min(max_texture_dimension),
            present_mode,
            // Use Opaque alpha mode to prevent canvas transparency showing HTML background
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // Only configure if size is valid, otherwise wait for resize
        if config.width > 0 && config.height > 0 {
            surface.configure(&device, &config);
        } else {
            log::warn!("Skipping surface configuration (invalid size: {}x{})", config.width, config.height);
        }

        let canvas_size = (
            canvas_size.0.min(max_texture_dimension),
            canvas_size.1.min(max_texture_dimension),
        );
        let (canvas_texture, canvas_view) = Self::create_canvas_texture(&device, canvas_size);

        let (blit_pipeline, blit_bind_group_layout) = Self::create_blit_pipeline(&device, surface_format);
        let canvas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let viewport = Viewport::fit(canvas_size, (config.width, config.height));
        let blit_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blit Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BlitUniforms {
                scale: viewport.ndc_scale(),
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let blit_bind_group = Self::create_blit_bind_group(
            &device,
            &blit_bind_group_layout,
            &canvas_view,
            &canvas_sampler,
            &blit_uniform_buffer,
        );

        log::info!(
            "Renderer initialized: surface {}x{}, canvas {}x{}",
            size.width,
            size.height,
            canvas_size.0,
            canvas_size.1
        );
        debug::update_status("Ready");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            max_texture_dimension,
            canvas_texture,
            canvas_view,
            canvas_size,
            blit_pipeline,
            blit_uniform_buffer,
            blit_bind_group,
            canvas_sampler,
        })
    }

    fn create_canvas_texture(device: &wgpu::Device, (width, height): (u32, u32)) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        canvas_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the blit pipeline for copying canvas to surface
    fn create_blit_pipeline(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    /// Current placement of the canvas in the window
    pub fn viewport(&self) -> Viewport {
        Viewport::fit(self.canvas_size, (self.config.width, self.config.height))
    }

    fn write_viewport(&self) {
        let uniforms = BlitUniforms {
            scale: self.viewport().ndc_scale(),
            _padding: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.blit_uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Resize the surface
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width.min(self.max_texture_dimension);
        self.config.height = new_size.height.min(self.max_texture_dimension);
        self.surface.configure(&self.device, &self.config);
        self.write_viewport();
        log::debug!("Surface resized to: {}x{}", self.config.width, self.config.height);
    }

    /// Copy the canvas pixels into the texture shown on screen
    pub fn upload_canvas(&mut self, pixels: &RgbaImage) {
        let size = pixels.dimensions();
        if size.0 > self.max_texture_dimension || size.1 > self.max_texture_dimension {
            log::warn!(
                "Canvas {}x{} exceeds max texture size {}, not displayed",
                size.0,
                size.1,
                self.max_texture_dimension
            );
            return;
        }
        if size != self.canvas_size {
            let (texture, view) = Self::create_canvas_texture(&self.device, size);
            self.canvas_texture = texture;
            self.canvas_view = view;
            self.canvas_size = size;
            self.blit_bind_group = Self::create_blit_bind_group(
                &self.device,
                &self.blit_pipeline.get_bind_group_layout(0),
                &self.canvas_view,
                &self.canvas_sampler,
                &self.blit_uniform_buffer,
            );
            self.write_viewport();
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.canvas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.0),
                rows_per_image: Some(size.1),
            },
            wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Render a frame (blit canvas to surface)
    pub fn render(&mut self) {
        if self.config.width == 0 || self.config.height == 0 {
            return;
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Failed to get surface texture: {:?}", e);
                return;
            }
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Letterbox bars
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.2,
                            g: 0.2,
                            b: 0.2,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.blit_pipeline);
            render_pass.set_bind_group(0, &self.blit_bind_group, &[]);
            render_pass.draw(0..6, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_aspect_fills_window() {
        let viewport = Viewport::fit((800, 600), (1600, 1200));
        assert_eq!(viewport.scale, 2.0);
        assert_eq!(viewport.offset, [0.0, 0.0]);
        assert_eq!(viewport.ndc_scale(), [1.0, 1.0]);
        assert_eq!(viewport.to_canvas(800.0, 600.0), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_wide_window_pillarboxes() {
        let viewport = Viewport::fit((100, 100), (400, 200));
        assert_eq!(viewport.scale, 2.0);
        assert_eq!(viewport.offset, [100.0, 0.0]);
        assert_eq!(viewport.ndc_scale(), [0.5, 1.0]);
        assert_eq!(viewport.to_canvas(100.0, 0.0), Point::new(0.0, 0.0));
        assert_eq!(viewport.to_canvas(300.0, 200.0), Point::new(100.0, 100.0));
        // Bars map outside the canvas
        assert!(viewport.to_canvas(50.0, 100.0).x < 0.0);
    }

    #[test]
    fn test_tall_window_letterboxes() {
        let viewport = Viewport::fit((200, 100), (200, 300));
        assert_eq!(viewport.scale, 1.0);
        assert_eq!(viewport.offset, [0.0, 100.0]);
        assert_eq!(viewport.to_canvas(20.0, 150.0), Point::new(20.0, 50.0));
    }

    #[test]
    fn test_degenerate_sizes_do_not_divide_by_zero() {
        let viewport = Viewport::fit((0, 0), (0, 0));
        assert!(viewport.scale.is_finite());
        assert!(viewport.to_canvas(1.0, 1.0).x.is_finite());
    }
}
