#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context as TaskContext, Poll},
};

use anyhow::{Context, bail};
use futures::future::LocalBoxFuture;
use stage_ngin::{
    camera::Eye,
    data_structures::{
        geometry::Geometry,
        scene_graph::{Material, Mesh, Node},
    },
    graphics::QualityTier,
    gui::{LogPanel, SharedPanel},
    orchestrator::{Orchestrator, SwitchRequest},
    post_processing::final_pass::FinalUniforms,
    render::{FrameInfo, Output, RenderBackend, RenderTarget},
    resources::{Asset, AssetLoader, AssetManager, Fetch},
    scene::{Scene, SceneKit, SceneRegistry, SetupContext},
    settings::{DeviceClass, Settings},
    tween::Signal,
    viewport::{BufferSize, Rect},
};

pub const WINDOW: (u32, u32) = (800, 600);
pub const SCREEN: &str = "screen";

// ---------------------------------------------------------------------------
// Render backend
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MockTarget {
    pub label: String,
    pub size: BufferSize,
}

impl RenderTarget for MockTarget {
    fn size(&self) -> BufferSize {
        self.size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTarget(String, BufferSize),
    ResizeTarget(String, BufferSize),
    BeginFrame,
    Draw {
        scene: String,
        eye: Eye,
        output: String,
    },
    Prewarm(String),
    Blend {
        a: String,
        b: String,
        factor: f32,
        out: String,
    },
    FinalPass {
        source: String,
        viewport: Rect,
    },
    ClearScreen(wgpu::Color),
    EndFrame,
    ResizeSurface(BufferSize),
}

/// Records every backend operation instead of talking to a GPU.
pub struct MockBackend {
    pub calls: Vec<Call>,
    pub surface_ready: bool,
    pub fail_prewarm: HashSet<String>,
    draws_this_frame: u32,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            surface_ready: true,
            fail_prewarm: HashSet::new(),
            draws_this_frame: 0,
        }
    }
}

impl MockBackend {
    /// Calls recorded since the last `BeginFrame`.
    pub fn last_frame(&self) -> &[Call] {
        let start = self
            .calls
            .iter()
            .rposition(|call| *call == Call::BeginFrame)
            .unwrap_or(0);
        &self.calls[start..]
    }

    /// `(scene, eye, output)` of every draw in the last frame.
    pub fn last_frame_draws(&self) -> Vec<(String, Eye, String)> {
        self.last_frame()
            .iter()
            .filter_map(|call| match call {
                Call::Draw { scene, eye, output } => Some((scene.clone(), *eye, output.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn drawn_scenes(&self) -> Vec<String> {
        let mut scenes: Vec<String> = self
            .last_frame_draws()
            .into_iter()
            .map(|(scene, _, _)| scene)
            .collect();
        scenes.dedup();
        scenes
    }

    pub fn prewarmed(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Prewarm(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> usize {
        self.calls.iter().filter(|call| **call == Call::EndFrame).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for MockBackend {
    type Target = MockTarget;

    fn create_target(&mut self, label: &str, size: BufferSize) -> MockTarget {
        self.calls.push(Call::CreateTarget(label.to_string(), size));
        MockTarget {
            label: label.to_string(),
            size,
        }
    }

    fn resize_target(&mut self, target: &mut MockTarget, size: BufferSize) {
        self.calls.push(Call::ResizeTarget(target.label.clone(), size));
        target.size = size;
    }

    fn begin_frame(&mut self) -> anyhow::Result<bool> {
        if self.surface_ready {
            self.calls.push(Call::BeginFrame);
            self.draws_this_frame = 0;
        }
        Ok(self.surface_ready)
    }

    fn draw_scene(
        &mut self,
        scene: &dyn Scene,
        eye: Eye,
        output: Output<'_, MockTarget>,
    ) -> anyhow::Result<()> {
        let output = match output {
            Output::Target(target) => target.label.clone(),
            Output::Screen(_) => SCREEN.to_string(),
        };
        self.draws_this_frame += 1;
        self.calls.push(Call::Draw {
            scene: scene.id().to_string(),
            eye,
            output,
        });
        Ok(())
    }

    fn prewarm(&mut self, scene: &dyn Scene) -> anyhow::Result<()> {
        self.calls.push(Call::Prewarm(scene.id().to_string()));
        if self.fail_prewarm.contains(scene.id()) {
            bail!("shader compilation failed for {}", scene.id());
        }
        Ok(())
    }

    fn blend(
        &mut self,
        a: &MockTarget,
        b: &MockTarget,
        factor: f32,
        out: &MockTarget,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Blend {
            a: a.label.clone(),
            b: b.label.clone(),
            factor,
            out: out.label.clone(),
        });
        Ok(())
    }

    fn final_pass(
        &mut self,
        source: &MockTarget,
        _uniforms: &FinalUniforms,
        viewport: Rect,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::FinalPass {
            source: source.label.clone(),
            viewport,
        });
        Ok(())
    }

    fn clear_screen(&mut self, color: wgpu::Color) -> anyhow::Result<()> {
        self.calls.push(Call::ClearScreen(color));
        Ok(())
    }

    fn end_frame(&mut self) -> FrameInfo {
        self.calls.push(Call::EndFrame);
        FrameInfo {
            draw_calls: self.draws_this_frame,
            ..FrameInfo::default()
        }
    }

    fn resize_surface(&mut self, size: BufferSize) {
        self.calls.push(Call::ResizeSurface(size));
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Pending on the first poll, ready on the second.
#[derive(Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// In-memory files. Every fetch yields once so concurrent fetches overlap.
#[derive(Default)]
pub struct MockFetcher {
    files: RefCell<HashMap<String, Vec<u8>>>,
    failing: RefCell<HashSet<String>>,
    requests: RefCell<Vec<String>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

impl MockFetcher {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn insert(&self, src: &str, bytes: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(src.to_string(), bytes.into());
    }

    pub fn fail(&self, src: &str) {
        self.failing.borrow_mut().insert(src.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }
}

impl Fetch for MockFetcher {
    fn fetch<'a>(&'a self, src: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        Box::pin(async move {
            self.requests.borrow_mut().push(src.to_string());
            self.in_flight.set(self.in_flight.get() + 1);
            self.max_in_flight
                .set(self.max_in_flight.get().max(self.in_flight.get()));
            YieldNow::default().await;
            self.in_flight.set(self.in_flight.get() - 1);
            if self.failing.borrow().contains(src) {
                bail!("404 Not Found: {src}");
            }
            self.files
                .borrow()
                .get(src)
                .cloned()
                .with_context(|| format!("no such file {src}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Ordered log of lifecycle calls, shared by every test scene of a harness.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    /// Everything except the per-frame updates.
    pub fn lifecycle(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|entry| !entry.ends_with(":update"))
            .cloned()
            .collect()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.lifecycle().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// How a test scene behaves. Signals left as `None` resolve immediately.
#[derive(Clone, Default)]
pub struct Behaviour {
    pub fail_setup: bool,
    pub manifest: Vec<Asset>,
    pub animate_in: Option<Signal>,
    pub animate_out: Option<Signal>,
}

pub type Script = Rc<RefCell<HashMap<String, Behaviour>>>;

pub struct TestScene {
    kit: SceneKit,
    journal: Journal,
    behaviour: Behaviour,
}

impl TestScene {
    pub fn new(id: &str, ctx: &SetupContext, journal: Journal, behaviour: Behaviour) -> Self {
        Self {
            kit: SceneKit::new(id, ctx).with_manifest(behaviour.manifest.clone()),
            journal,
            behaviour,
        }
    }

    fn record(&self, what: &str) {
        self.journal.record(format!("{}:{what}", self.kit.id()));
    }
}

impl Scene for TestScene {
    fn kit(&self) -> &SceneKit {
        &self.kit
    }

    fn kit_mut(&mut self) -> &mut SceneKit {
        &mut self.kit
    }

    fn setup<'a>(&'a mut self, ctx: &'a SetupContext) -> LocalBoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.record("setup");
            let group = self.kit.id().to_string();
            let loaded = ctx.loader.load(&group, self.kit.manifest.clone()).await?;
            ctx.assets.borrow_mut().add(&group, loaded);
            if self.behaviour.fail_setup {
                bail!("{group} failed to build");
            }
            self.kit.create_helpers(ctx.settings.helpers);
            self.kit.root.add_child(Node::with_mesh(
                "body",
                Mesh::new(Geometry::sphere(1.0, 8, 4, [1.0; 3]), Material::default()),
            ));
            Ok(())
        })
    }

    fn animate_in(&mut self) -> anyhow::Result<Signal> {
        self.record("animate_in");
        Ok(self.behaviour.animate_in.clone().unwrap_or_else(Signal::resolved))
    }

    fn animate_out(&mut self) -> anyhow::Result<Signal> {
        self.record("animate_out");
        Ok(self.behaviour.animate_out.clone().unwrap_or_else(Signal::resolved))
    }

    fn update(&mut self, _dt: f32) {
        self.record("update");
    }

    fn dispose(&mut self) {
        self.record("dispose");
        self.kit.dispose();
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn setup_context(settings: Settings, fetcher: Rc<dyn Fetch>, panel: SharedPanel) -> SetupContext {
    SetupContext {
        loader: Rc::new(AssetLoader::new(fetcher, DeviceClass::Desktop)),
        assets: Rc::new(RefCell::new(AssetManager::new())),
        settings: Rc::new(settings),
        panel,
    }
}

/// An orchestrator over a recording backend, with one scripted test scene per id.
pub struct Harness {
    pub backend: MockBackend,
    pub orchestrator: Orchestrator<MockTarget>,
    pub journal: Journal,
    pub script: Script,
    pub fetcher: Rc<MockFetcher>,
    pub panel: Rc<LogPanel>,
}

impl Harness {
    pub fn new(ids: &[&str]) -> Self {
        Self::with_settings(ids, Settings::default())
    }

    pub fn with_settings(ids: &[&str], settings: Settings) -> Self {
        let journal = Journal::default();
        let script: Script = Rc::default();
        let fetcher = MockFetcher::new();
        let panel = Rc::new(LogPanel::default());
        let ctx = setup_context(settings, fetcher.clone(), panel.clone());

        let mut registry = SceneRegistry::new();
        for id in ids {
            let id = id.to_string();
            let journal = journal.clone();
            let script = script.clone();
            registry.register(id.clone(), move |ctx| {
                let behaviour = script.borrow().get(&id).cloned().unwrap_or_default();
                Box::new(TestScene::new(&id, ctx, journal.clone(), behaviour)) as Box<dyn Scene>
            });
        }

        let mut backend = MockBackend::default();
        let orchestrator = Orchestrator::new(
            &mut backend,
            registry,
            ctx,
            QualityTier::High.config(),
            WINDOW,
            1.0,
        );
        Self {
            backend,
            orchestrator,
            journal,
            script,
            fetcher,
            panel,
        }
    }

    pub fn script(&self, id: &str, behaviour: Behaviour) {
        self.script.borrow_mut().insert(id.to_string(), behaviour);
    }

    pub fn request(&mut self, id: &str) -> SwitchRequest {
        self.orchestrator
            .request_scene(id)
            .expect("registered scene")
    }

    /// Run every pending setup to completion and feed the outcomes back.
    pub fn finish_setups(&mut self) -> Vec<anyhow::Result<()>> {
        let tasks = self.orchestrator.drain_setup_tasks();
        tasks
            .into_iter()
            .map(|task| {
                let outcome = futures::executor::block_on(task);
                self.orchestrator.finish_setup(&mut self.backend, outcome)
            })
            .collect()
    }

    pub fn frame(&mut self, dt: f32) {
        self.orchestrator
            .frame(&mut self.backend, dt)
            .expect("frame renders");
    }

    /// Drive setups and frames until no switch is in flight or queued.
    pub fn settle(&mut self) {
        for _ in 0..200 {
            self.finish_setups();
            if self.orchestrator.is_idle() && self.orchestrator.queued().is_none() {
                self.frame(0.0);
                return;
            }
            self.frame(0.25);
        }
        panic!("orchestrator did not settle, phase {:?}", self.orchestrator.phase());
    }

    /// Request a scene and drive the switch to completion.
    pub fn switch_to(&mut self, id: &str) {
        self.request(id);
        self.settle();
    }
}
