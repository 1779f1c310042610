use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use firstlight_engine::{
    AcquireOptions, Device, Surface, SurfaceOptions, WgpuBackend, WgpuPlatform,
};

use crate::scenes::{Prepared, Scene};

/// Window and GPU configuration of a demo.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub acquire: AcquireOptions,
    pub surface: SurfaceOptions,
}

impl DemoConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "firstlight".to_string(),
            initial_size: LogicalSize::new(512.0, 512.0),
            acquire: AcquireOptions::default(),
            surface: SurfaceOptions::default(),
        }
    }
}

/// Opens a window, prepares `scene` on it and submits it once on the first
/// redraw. Returns when the window is closed.
pub fn run<S: Scene + 'static>(config: DemoConfig, scene: S) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut state = DemoState::new(config, scene);

    event_loop
        .run_app(&mut state)
        .context("winit event loop terminated with error")?;

    match state.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct Presentation {
    window: Arc<Window>,
    device: Device<WgpuBackend>,
    surface: Surface<WgpuBackend>,
    prepared: Prepared<WgpuBackend>,
    submitted: bool,
}

struct DemoState<S: Scene> {
    config: DemoConfig,
    scene: S,
    presentation: Option<Presentation>,
    failure: Option<anyhow::Error>,
}

impl<S: Scene> DemoState<S> {
    fn new(config: DemoConfig, scene: S) -> Self {
        Self {
            config,
            scene,
            presentation: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        log::error!("{e:#}");
        self.failure = Some(e);
        event_loop.exit();
    }

    fn present(&mut self, event_loop: &ActiveEventLoop) -> Result<Presentation> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let platform = WgpuPlatform::new()?;
        let size = window.inner_size();
        let mut surface = platform.create_surface(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
            &self.config.surface,
        )?;

        let device =
            pollster::block_on(platform.acquire_device(&self.config.acquire, Some(&surface)))?;

        let format = surface
            .preferred_format(&device, self.config.surface.prefer_srgb)
            .ok_or_else(|| anyhow!("the surface reports no usable format"))?;
        surface.configure(&device, format)?;

        let prepared = self
            .scene
            .prepare(&device, format)
            .with_context(|| format!("failed to prepare scene `{}`", self.scene.name()))?;

        Ok(Presentation {
            window,
            device,
            surface,
            prepared,
            submitted: false,
        })
    }
}

impl<S: Scene> ApplicationHandler for DemoState<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presentation.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        match self.present(event_loop) {
            Ok(presentation) => {
                presentation.window.request_redraw();
                self.presentation = Some(presentation);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(presentation) = self.presentation.as_mut() else {
            return;
        };
        if presentation.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.presentation = None;
                event_loop.exit();
            }

            // One submission; later redraws leave the presented image alone.
            WindowEvent::RedrawRequested if !presentation.submitted => {
                let result = presentation
                    .prepared
                    .submit(&presentation.device, &presentation.surface);
                match result {
                    Ok(state) => {
                        presentation.submitted = true;
                        log::info!("`{}` submitted ({state:?})", self.scene.name());
                    }
                    Err(e) => {
                        let e = anyhow::Error::new(e).context("failed to submit the frame");
                        self.fail(event_loop, e);
                    }
                }
            }

            _ => {}
        }
    }
}
