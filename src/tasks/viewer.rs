mod renderer;
mod slider;
mod text;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbaImage;
use renderer::Renderer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::coefficient::Coefficient;
use crate::config::Configuration;
use crate::events::ImageEvent;
use crate::grain::GrainUniforms;
use crate::layout::ScreenLayout;

#[derive(Debug)]
pub enum ViewerEvent {
    Image(ImageEvent),
    Cancelled,
}

#[derive(Debug)]
enum RenderError {
    Surface(SurfaceError),
    Glyph(String),
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    coefficient: Coefficient,
    started: Instant,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    /// Image that arrived before the GPU was ready.
    pending_image: Option<RgbaImage>,
    cursor: Option<PhysicalPosition<f64>>,
    dragging: bool,
}

impl ViewerApp {
    fn new(cfg: Configuration, coefficient: Coefficient, cancel: CancellationToken) -> Self {
        Self {
            cfg,
            cancel,
            coefficient,
            started: Instant::now(),
            window: None,
            renderer: None,
            pending_image: None,
            cursor: None,
            dragging: false,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let opts = &self.cfg.window;
        let mut attrs = WindowAttributes::default()
            .with_title(opts.title.clone())
            .with_inner_size(LogicalSize::new(opts.width, opts.height));
        if opts.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let mut renderer = Renderer::new(window, &self.cfg)?;
        if let Some(image) = self.pending_image.take() {
            renderer.set_image(&image);
        }
        self.renderer = Some(renderer);
        Ok(())
    }

    fn layout(&self) -> Option<ScreenLayout> {
        let renderer = self.renderer.as_ref()?;
        let (w, h) = renderer.size();
        Some(ScreenLayout::compute(w, h, &self.cfg.slider))
    }

    fn handle_image(&mut self, event: ImageEvent) {
        match event {
            ImageEvent::Loaded(prepared) => {
                let source = prepared.source.clone();
                let Some(image) = prepared.into_rgba() else {
                    warn!(%source, "loaded image has inconsistent dimensions");
                    return;
                };
                match self.renderer.as_mut() {
                    Some(renderer) => renderer.set_image(&image),
                    None => self.pending_image = Some(image),
                }
                info!(%source, "image ready for display");
                self.request_redraw();
            }
            ImageEvent::Failed { source, reason } => {
                warn!(%source, %reason, "no image to display");
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Released {
            let quit = match &event.logical_key {
                Key::Named(NamedKey::Escape) => true,
                Key::Character(c) => c.eq_ignore_ascii_case("q"),
                _ => false,
            };
            if quit {
                info!("quit requested from keyboard");
                event_loop.exit();
            }
            return;
        }

        let changed = match &event.logical_key {
            Key::Named(NamedKey::ArrowRight | NamedKey::ArrowUp) => self.coefficient.increment(),
            Key::Named(NamedKey::ArrowLeft | NamedKey::ArrowDown) => self.coefficient.decrement(),
            Key::Named(NamedKey::Home) => self.coefficient.to_min(),
            Key::Named(NamedKey::End) => self.coefficient.to_max(),
            _ => false,
        };
        if changed {
            self.coefficient_changed();
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let has_image = self.renderer.as_ref().is_some_and(Renderer::has_image);
                let (Some(layout), Some(cursor)) = (self.layout(), self.cursor) else {
                    return;
                };
                let (x, y) = (cursor.x as f32, cursor.y as f32);
                if has_image && layout.hits_slider(x, y) {
                    self.dragging = true;
                    self.drag_to(&layout, x);
                }
            }
            ElementState::Released => self.dragging = false,
        }
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
        if !self.dragging {
            return;
        }
        if let Some(layout) = self.layout() {
            self.drag_to(&layout, position.x as f32);
        }
    }

    fn drag_to(&mut self, layout: &ScreenLayout, x: f32) {
        if self
            .coefficient
            .set_from_fraction(layout.slider_fraction_at(x))
        {
            self.coefficient_changed();
        }
    }

    fn coefficient_changed(&mut self) {
        debug!(coefficient = self.coefficient.value(), "coefficient changed");
        self.request_redraw();
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.resize(new_size);
        debug!(
            width = new_size.width,
            height = new_size.height,
            "viewer surface resized"
        );
        self.request_redraw();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(layout) = self.layout() else {
            return;
        };
        let Some(resolution) = layout.canvas_resolution() else {
            return;
        };
        let uniforms = GrainUniforms::new(resolution, self.coefficient.value())
            .with_time(self.started.elapsed().as_secs_f32());
        let fraction = self.coefficient.fraction();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.render(&layout, &uniforms, fraction) {
            Ok(()) => {}
            Err(RenderError::Surface(SurfaceError::Outdated | SurfaceError::Lost)) => {
                info!("viewer surface lost; reconfiguring");
                self.reconfigure();
            }
            Err(RenderError::Surface(SurfaceError::OutOfMemory)) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
            }
            Err(RenderError::Surface(SurfaceError::Timeout)) => {
                warn!("viewer surface acquisition timed out");
            }
            Err(RenderError::Surface(SurfaceError::Other)) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.reconfigure();
            }
            Err(RenderError::Glyph(err)) => {
                warn!(error = %err, "failed to draw text overlay");
            }
        }
    }

    fn reconfigure(&mut self) {
        if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
            self.handle_resize(size);
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.renderer.is_none()
            && let Err(err) = self.init_gpu(window)
        {
            error!(error = ?err, "failed to initialize GPU state");
            event_loop.exit();
            return;
        }

        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::CursorMoved { position, .. } => self.handle_cursor(position),
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.dragging = false;
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.handle_mouse_button(state),
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Image(image) => self.handle_image(image),
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }
}

/// Runs the window on the calling thread until it is closed or `cancel` fires.
pub fn run_windowed(
    cfg: Configuration,
    coefficient: Coefficient,
    mut from_loader: mpsc::Receiver<ImageEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = proxy.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let forward_task = tokio::spawn(async move {
        while let Some(event) = from_loader.recv().await {
            if proxy.send_event(ViewerEvent::Image(event)).is_err() {
                break;
            }
        }
    });

    let mut app = ViewerApp::new(cfg, coefficient, cancel);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    forward_task.abort();

    run_result.context("viewer event loop failed")
}
