//! Frame scheduling and the application event loop.
//!
//! The [`FrameScheduler`] runs one tick per display refresh. Each tick, in
//! this order:
//! 1. commits scene additions/removals staged since the previous tick
//! 2. samples the clock once
//! 3. runs every registered [`TickMutator`] in registration order
//! 4. renders the scene through a [`RenderTarget`]
//! 5. asks for the next tick, unless it was stopped
//!
//! [`run`] wires the scheduler to a winit window: asset continuations are
//! delivered right before each tick, pointer input goes to the overlay and the
//! orbit controls, and resizes are forwarded to the scene and the surface.

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    camera::Viewport,
    clock::{Clock, FrameTime},
    config::Config,
    context::Context,
    controls::PointerInput,
    debug::DebugPanel,
    greeting,
    render::{RenderTarget, Renderer},
    resources::{AssetLoader, AssetSource, Spawner},
    scene::Scene,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Per-tick behaviour: animation, controls, anything that mutates the scene
/// as a function of time.
pub trait TickMutator {
    fn name(&self) -> &str;
    fn tick(&mut self, scene: &mut Scene, time: &FrameTime);
}

/// A named closure used as a [`TickMutator`].
pub struct FnMutator<F> {
    name: String,
    f: F,
}

impl<F> FnMutator<F>
where
    F: FnMut(&mut Scene, &FrameTime),
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> TickMutator for FnMutator<F>
where
    F: FnMut(&mut Scene, &FrameTime),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, scene: &mut Scene, time: &FrameTime) {
        (self.f)(scene, time)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

pub struct FrameScheduler {
    clock: Clock,
    mutators: Vec<Box<dyn TickMutator>>,
    state: SchedulerState,
}

impl Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("mutators", &self.mutator_names())
            .field("state", &self.state)
            .finish()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            mutators: Vec::new(),
            state: SchedulerState::Running,
        }
    }

    /// Mutators run in the order they were added.
    pub fn add_mutator(&mut self, mutator: impl TickMutator + 'static) {
        self.mutators.push(Box::new(mutator));
    }

    pub fn add_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnMut(&mut Scene, &FrameTime) + 'static,
    {
        self.add_mutator(FnMutator::new(name, f));
    }

    pub fn mutator_names(&self) -> Vec<&str> {
        self.mutators.iter().map(|m| m.name()).collect()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// No further ticks are requested. Stopping twice is harmless.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Running {
            log::info!("frame scheduler stopped");
        }
        self.state = SchedulerState::Stopped;
    }

    /// Run one tick against the real clock.
    ///
    /// Returns whether the next tick should be requested.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        target: &mut dyn RenderTarget,
    ) -> Result<bool, wgpu::SurfaceError> {
        if !self.is_running() {
            return Ok(false);
        }
        let time = self.clock.tick();
        self.tick_at(time, scene, target)
    }

    /// Run one tick at a given time. A stopped scheduler does nothing.
    pub fn tick_at(
        &mut self,
        time: FrameTime,
        scene: &mut Scene,
        target: &mut dyn RenderTarget,
    ) -> Result<bool, wgpu::SurfaceError> {
        if !self.is_running() {
            return Ok(false);
        }
        let report = scene.commit();
        if report.added + report.removed + report.dropped > 0 {
            log::debug!("frame {}: {report:?}", time.frame);
        }
        for mutator in self.mutators.iter_mut() {
            mutator.tick(scene, &time);
        }
        target.render(scene)?;
        Ok(self.is_running())
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that exists once the window and the GPU are up.
pub struct AppState {
    renderer: Renderer,
    scene: Scene,
    loader: AssetLoader,
    scheduler: FrameScheduler,
    debug: Option<DebugPanel>,
    cursor: (f64, f64),
}

impl AppState {
    fn new(ctx: Context, config: &Config, spawner: Spawner) -> Self {
        let viewport = window_viewport(ctx.window());
        let mut scene = Scene::new(config, viewport);
        let mut loader = AssetLoader::new(AssetSource::new(config.asset_root.clone()), spawner);
        greeting::assemble(config, &mut scene, &mut loader);

        let mut scheduler = FrameScheduler::new();
        greeting::install_mutators(config, &mut scheduler);
        log::info!("tick mutators: {:?}", scheduler.mutator_names());

        let debug = config.debug_panel.then(greeting::debug_panel);

        ctx.window().request_redraw();
        Self {
            renderer: Renderer::new(ctx),
            scene,
            loader,
            scheduler,
            debug,
            cursor: (0.0, 0.0),
        }
    }

    fn window(&self) -> &Arc<Window> {
        self.renderer.ctx().window()
    }

    fn resize(&mut self) {
        let viewport = window_viewport(self.window());
        let (width, height) =
            self.scene
                .resize(viewport.width, viewport.height, viewport.device_pixel_ratio);
        self.renderer.resize(width, height);
    }

    fn redraw(&mut self) {
        let report = self.loader.poll(&mut self.scene);
        if report.loaded + report.failed > 0 {
            log::debug!(
                "assets: {report:?}, {} in flight, {} failed",
                self.loader.in_flight(),
                self.loader.failed()
            );
        }

        match self.scheduler.tick(&mut self.scene, &mut self.renderer) {
            Ok(true) => self.window().request_redraw(),
            Ok(false) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize();
                self.window().request_redraw();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of memory, no further frames will be drawn");
                self.scheduler.stop();
            }
            Err(e) => {
                log::warn!("Unable to render {}", e);
                if self.scheduler.is_running() {
                    self.window().request_redraw();
                }
            }
        }
    }
}

fn window_viewport(window: &Window) -> Viewport {
    let scale = window.scale_factor();
    let size: LogicalSize<u32> = window.inner_size().to_logical(scale);
    Viewport::new(size.width, size.height, scale)
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: Config,
    state: Option<AppState>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            state: None,
        })
    }

    fn spawner(&self) -> Spawner {
        #[cfg(not(target_arch = "wasm32"))]
        return Spawner::new(self.async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        return Spawner::new();
    }
}

pub enum FlowEvent {
    /// The GPU context finished initialising on the web.
    #[allow(dead_code)]
    Initialized(Box<anyhow::Result<Context>>),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create the window: {e}");
                event_loop.exit();
                return;
            }
        };
        let size = window_viewport(&window).buffer_size();
        let init_future = Context::new(window, size);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(ctx) => self.state = Some(AppState::new(ctx, &self.config, self.spawner())),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = init_future.await;
                if proxy.send_event(FlowEvent::Initialized(Box::new(ctx))).is_err() {
                    log::error!("the event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(ctx) => match *ctx {
                Ok(ctx) => {
                    let mut state = AppState::new(ctx, &self.config, self.spawner());
                    // The canvas may have been laid out while the device was being created
                    state.resize();
                    self.state = Some(state);
                }
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if let WindowEvent::CursorMoved { position, .. } = event {
            state.cursor = (position.x, position.y);
        }
        if let Some(input) = PointerInput::from_window_event(&event, state.cursor) {
            state.scene.handle_pointer(input);
        }

        match event {
            WindowEvent::CloseRequested => {
                state.scheduler.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => state.resize(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(debug) = &mut state.debug {
                    if debug.handle_key(code, &mut state.scene) {
                        for line in debug.lines(&state.scene) {
                            log::info!("{line}");
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => state.redraw(),
            _ => {}
        }
    }
}

pub fn run(config: Config) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
