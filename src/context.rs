use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::CameraResources,
    data_structures::texture,
    pipelines::{mesh::MeshPipeline, overlay::mk_overlay_pipeline},
};

/// The window, the configured surface and everything created from the device
/// once at start-up.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub mesh_pipeline: MeshPipeline,
    pub overlay_pipeline: wgpu::RenderPipeline,
    is_surface_configured: bool,
}

impl Context {
    /// `size` is the output buffer size in physical pixels.
    pub async fn new(window: Arc<Window>, size: (u32, u32)) -> anyhow::Result<Self> {
        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter can present to this window")?;
        log::debug!("adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("cannot open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Matcaps and model textures carry display-ready colours, keep them as they are.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = CameraResources::new(&device);
        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );
        let mesh_pipeline = MeshPipeline::new(&device, &config, &camera.bind_group_layout);
        let overlay_pipeline = mk_overlay_pipeline(&device, &config);

        let mut ctx = Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            mesh_pipeline,
            overlay_pipeline,
            is_surface_configured: false,
        };
        ctx.resize(size.0, size.1);
        Ok(ctx)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    /// Reconfigure the surface and depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.is_surface_configured = true;
    }
}
