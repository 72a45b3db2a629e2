//! Application main loop

use anyhow::Result;
use app_core::{ExportJob, Flow, InputEvent, Session, ViewStateMachine};
use app_ui::{EguiCanvas, GpuContext, InputTranslator, TextureCache, Theme, TEXTURE_CACHE_CAPACITY};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

const STATUS_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq)]
enum StatusKind {
    Info,
    Success,
    Error,
}

/// Toast shown in the bottom-right corner
struct Status {
    text: String,
    kind: StatusKind,
    /// `None` keeps the message until it is replaced
    expires: Option<Instant>,
}

impl Status {
    fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            expires: Some(Instant::now() + STATUS_DURATION),
        }
    }

    fn sticky(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
            expires: None,
        }
    }
}

/// Main application state for the event loop
struct App {
    session: Session,
    machine: ViewStateMachine,
    theme: Theme,
    frame_delay: Duration,
    export_path: PathBuf,

    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    egui_ctx: egui::Context,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,

    input: InputTranslator,
    pending: Vec<InputEvent>,
    textures: TextureCache,

    export: Option<ExportJob>,
    status: Option<Status>,
    next_frame: Instant,
}

impl App {
    fn new(session: Session, export_path: PathBuf) -> Result<Self> {
        let settings = session.settings();
        let machine = session.view()?;

        Ok(Self {
            theme: Theme::for_name(settings.theme),
            frame_delay: Duration::from_millis(settings.frame_delay_ms.max(1)),
            machine,
            session,
            export_path,

            window: None,
            gpu: None,
            egui_ctx: egui::Context::default(),
            egui_state: None,
            egui_renderer: None,

            input: InputTranslator::new(1.0),
            pending: Vec::new(),
            textures: TextureCache::new(TEXTURE_CACHE_CAPACITY),

            export: None,
            status: None,
            next_frame: Instant::now(),
        })
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title(format!("Portfolio - {} images", self.session.catalog().len()))
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        self.theme.apply(&self.egui_ctx);
        self.input.set_scale_factor(window.scale_factor());

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        Ok(())
    }

    /// Pick up a finished export and start a requested one
    fn update_export(&mut self) {
        if let Some(job) = &mut self.export {
            if let Some(result) = job.try_result() {
                self.status = Some(match result {
                    Ok(report) => Status::new(
                        format!("Exported {} pages to {}", report.pages, report.path.display()),
                        StatusKind::Success,
                    ),
                    Err(e) => {
                        tracing::error!("{}", e);
                        Status::new(e.user_message(), StatusKind::Error)
                    }
                });
                self.export = None;
            }
        }

        if !self.machine.take_export_request() {
            return;
        }
        if self.export.is_some() {
            self.status = Some(Status::new("An export is already running", StatusKind::Info));
            return;
        }

        let job = self.session.start_export(self.export_path.clone());
        self.status = Some(Status::sticky(format!("Exporting to {}...", job.path().display())));
        self.export = Some(job);
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };

        if self.status.as_ref().and_then(|s| s.expires).is_some_and(|t| Instant::now() >= t) {
            self.status = None;
        }

        let raw_input = egui_state.take_egui_input(&window);
        let mut events = std::mem::take(&mut self.pending);
        let mut flow = Flow::Continue;

        let machine = &mut self.machine;
        let textures = &mut self.textures;
        let status = self.status.as_ref();
        let theme = &self.theme;

        let mut ticked = false;

        // egui may run this closure more than once per frame; only the first pass steps the view.
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            let viewport = ctx.screen_rect();
            let mut canvas = EguiCanvas::new(ctx, textures);
            if ticked {
                machine.redraw(viewport.width(), viewport.height(), &mut canvas);
            } else {
                flow = machine.tick(viewport.width(), viewport.height(), std::mem::take(&mut events), &mut canvas);
                ticked = true;
            }

            if let Some(status) = status {
                show_status(ctx, theme, status);
            }
        });

        egui_state.handle_platform_output(&window, full_output.platform_output);

        if flow == Flow::Exit {
            self.shutdown();
            event_loop.exit();
            return;
        }

        self.update_export();

        let (Some(gpu), Some(egui_renderer)) = (&mut self.gpu, &mut self.egui_renderer) else {
            return;
        };
        let primitives = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let background = self.machine.settings().background_color;

        match gpu.paint(
            egui_renderer,
            &primitives,
            &full_output.textures_delta,
            full_output.pixels_per_point,
            background,
        ) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory");
                self.shutdown();
                event_loop.exit();
            }
            Err(e) => tracing::warn!("Frame dropped: {:?}", e),
        }
    }

    /// Stop background work before the window goes away
    fn shutdown(&mut self) {
        if let Some(job) = self.export.take() {
            tracing::info!("Cancelling export to {:?}", job.path());
            job.cancel();
            if let Err(e) = job.wait() {
                tracing::info!("Export stopped: {}", e);
            }
        }
        tracing::info!("Portfolio closed");
    }
}

fn show_status(ctx: &egui::Context, theme: &Theme, status: &Status) {
    let color = match status.kind {
        StatusKind::Info => theme.text,
        StatusKind::Success => theme.success,
        StatusKind::Error => theme.error,
    };

    egui::Area::new(egui::Id::new("status"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).fill(theme.surface).show(ui, |ui| {
                ui.colored_label(color, &status.text);
            });
        });
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_window(event_loop) {
                tracing::error!("Failed to initialize window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            let _ = egui_state.on_window_event(window, &event);
        }

        if let Some(input) = self.input.translate(&event) {
            self.pending.push(input);
        }

        match event {
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize((size.width, size.height));
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame = now + self.frame_delay;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

/// Run the viewer until the user quits
pub fn run(session: Session, export_path: PathBuf) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(session, export_path)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
