//! The winit host.
//!
//! Owns the window and the GPU renderer, boots the [`Experience`] once the GPU context is
//! ready and drives the frame loop from `RedrawRequested`. Scene setup futures handed out
//! by the orchestrator run on a local executor (a `LocalPool` inside the tokio runtime
//! natively, `spawn_local` in the browser) and report back through user events, so the
//! preloader keeps animating while the next scene loads.

use std::{rc::Rc, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::UnwrapThrowExt;

use crate::{
    app_state::AppState,
    context::Context,
    experience::Experience,
    gui::panel_for,
    orchestrator::{Orchestrator, SetupOutcome, SetupTask},
    renderer::{GpuRenderer, GpuTarget},
    resources::{AssetLoader, AssetManager, default_fetcher},
    scene::{SceneRegistry, SetupContext},
    settings::{Settings, SettingsChange},
};

pub(crate) enum AppEvent {
    /// The GPU context is ready (wasm initialises it asynchronously).
    Initialized(anyhow::Result<Context>),
    SetupDone(SetupOutcome),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(ctx) => f
                .debug_tuple("Initialized")
                .field(&ctx.as_ref().map(|_| "Context"))
                .finish(),
            Self::SetupDone(outcome) => f.debug_tuple("SetupDone").field(&outcome.scene.id()).finish(),
        }
    }
}

/// Everything that exists once the GPU context is up.
struct Host {
    renderer: GpuRenderer,
    experience: Experience<GpuTarget>,
}

impl Host {
    fn new(ctx: Context) -> anyhow::Result<Self> {
        let settings = Rc::new(Settings::from_env());
        let tier = ctx.quality_tier(settings.graphics);
        log::info!("quality tier: {tier:?}");
        let window = ctx.window.clone();
        let size = window.inner_size();
        let dpr = window.scale_factor();

        let mut renderer = GpuRenderer::new(ctx);
        let loader = AssetLoader::new(default_fetcher(), settings.device_class)
            .with_gpu(renderer.gpu_handles());
        let setup_ctx = SetupContext {
            loader: Rc::new(loader),
            assets: Rc::new(std::cell::RefCell::new(AssetManager::new())),
            panel: panel_for(&settings),
            settings,
        };
        let orchestrator = Orchestrator::new(
            &mut renderer,
            SceneRegistry::with_builtin(),
            setup_ctx,
            tier.config(),
            (size.width, size.height),
            dpr,
        );
        let mut experience = Experience::new(orchestrator);
        experience.setup()?;
        Ok(Self {
            renderer,
            experience,
        })
    }

    fn window(&self) -> &Window {
        self.renderer.context().window()
    }
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg(not(target_arch = "wasm32"))]
    local_pool: futures::executor::LocalPool,
    proxy: EventLoopProxy<AppEvent>,
    host: Option<Host>,
}

impl App {
    fn new(event_loop: &EventLoop<AppEvent>) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            #[cfg(not(target_arch = "wasm32"))]
            local_pool: futures::executor::LocalPool::new(),
            proxy: event_loop.create_proxy(),
            host: None,
        })
    }

    /// Run every pending scene setup to completion and report the outcome as an event.
    fn spawn_setup_tasks(&mut self) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        for task in host.experience.orchestrator_mut().drain_setup_tasks() {
            self.spawn_setup(task);
        }
    }

    fn spawn_setup(&self, task: SetupTask) {
        let proxy = self.proxy.clone();
        let report = async move {
            let outcome = task.await;
            if proxy.send_event(AppEvent::SetupDone(outcome)).is_err() {
                log::warn!("event loop closed before a scene setup finished");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            use futures::task::LocalSpawnExt;
            if let Err(e) = self.local_pool.spawner().spawn_local(report) {
                log::error!("scheduling scene setup failed: {e}");
            }
        }

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(report);
    }

    /// Poll the native setup futures. Loader I/O runs on the tokio runtime.
    fn poll_setup(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _guard = self.async_runtime.enter();
            self.local_pool.run_until_stalled();
        }
    }

    fn on_initialized(&mut self, ctx: anyhow::Result<Context>) {
        let host = match ctx.and_then(Host::new) {
            Ok(host) => host,
            Err(e) => {
                log::error!("initialisation failed: {e:#}");
                return;
            }
        };
        host.window().request_redraw();
        self.host = Some(host);
        self.spawn_setup_tasks();
    }

    fn redraw(&mut self) {
        self.poll_setup();
        let Some(host) = self.host.as_mut() else {
            return;
        };
        let Host {
            renderer,
            experience,
        } = host;

        if !experience.state().ready && experience.preloader_settled() {
            match experience.set_state(AppState::new(true)) {
                Ok(request) => log::debug!("app ready: {request:?}"),
                Err(e) => log::error!("{e:#}"),
            }
        }
        if let Err(e) = experience
            .orchestrator_mut()
            .tick(renderer, instant::Instant::now())
        {
            log::error!("Unable to render {e:#}");
        }
        renderer.context().window().request_redraw();
        self.spawn_setup_tasks();
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("stage-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("creating the window failed: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = self.async_runtime.block_on(Context::new(window));
            self.on_initialized(ctx);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = Context::new(window).await;
                if proxy.send_event(AppEvent::Initialized(ctx)).is_err() {
                    log::error!("event loop closed during initialisation");
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Initialized(ctx) => self.on_initialized(ctx),
            AppEvent::SetupDone(outcome) => {
                let Some(host) = self.host.as_mut() else {
                    return;
                };
                if let Err(e) = host
                    .experience
                    .orchestrator_mut()
                    .finish_setup(&mut host.renderer, outcome)
                {
                    log::error!("{e:#}");
                }
                // A failed setup may have started the queued scene.
                self.spawn_setup_tasks();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        if host.experience.orchestrator_mut().handle_input(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                host.experience.orchestrator_mut().shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let dpr = host.window().scale_factor();
                host.experience
                    .orchestrator_mut()
                    .resize(&mut host.renderer, size.width, size.height, dpr);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = host.window().inner_size();
                host.experience
                    .orchestrator_mut()
                    .resize(&mut host.renderer, size.width, size.height, scale_factor);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                let settings = host.experience.orchestrator().settings();
                if !settings.is_development {
                    return;
                }
                use winit::keyboard::{KeyCode, PhysicalKey};
                let change = match event.physical_key {
                    PhysicalKey::Code(KeyCode::F1) => SettingsChange::DevCamera(!settings.dev_camera),
                    PhysicalKey::Code(KeyCode::F2) => SettingsChange::Helpers(!settings.helpers),
                    _ => return,
                };
                host.experience
                    .orchestrator_mut()
                    .apply_settings(&mut host.renderer, change);
                crate::settings::persist(change);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.poll_setup();
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = run() {
        log::error!("{e:#}");
    }
}
