/// WindowSurface - winit window driven by event pumping
///
/// The frame loop owns the control flow, so the event loop is pumped
/// (`pump_app_events`) instead of being handed over with `run_app`:
/// a zero timeout polls, no timeout blocks until the OS delivers an event.

use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::device::Extent2D;
use crate::error::{Error, Result};
use crate::surface::PresentableSurface;
use crate::{engine_error, engine_info, engine_trace};

/// Maximum number of pumps waiting for the platform to create the window
const WINDOW_CREATION_PUMPS: u32 = 100;

/// Event handler state shared with winit during a pump
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    creation_error: Option<String>,
    resized: bool,
    close_requested: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                engine_trace!("galaxy3d::WindowSurface", "Resized to {}x{}", size.width, size.height);
                self.resized = true;
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            _ => {}
        }
    }
}

/// Resizable OS window used as the presentation surface
pub struct WindowSurface {
    event_loop: EventLoop<()>,
    state: WindowState,
    window: Arc<Window>,
}

impl WindowSurface {
    /// Create the event loop and a resizable window
    ///
    /// # Arguments
    ///
    /// * `title` - Window title
    /// * `width` - Initial inner width in logical pixels
    /// * `height` - Initial inner height in logical pixels
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the event loop cannot be created or the
    /// platform never produces a window.
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let mut event_loop = EventLoop::new().map_err(|e| {
            engine_error!("galaxy3d::WindowSurface", "Failed to create event loop: {}", e);
            Error::InitializationFailed(format!("Failed to create event loop: {}", e))
        })?;

        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(winit::dpi::LogicalSize::new(width, height))
            .with_resizable(true);

        let mut state = WindowState {
            attributes,
            window: None,
            creation_error: None,
            resized: false,
            close_requested: false,
        };

        // Window creation happens in `resumed`, which arrives during the first pumps
        for _ in 0..WINDOW_CREATION_PUMPS {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut state);
            if state.window.is_some() || state.creation_error.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = status {
                engine_error!("galaxy3d::WindowSurface", "Event loop exited during window creation ({})", code);
                break;
            }
        }

        if let Some(e) = state.creation_error.take() {
            engine_error!("galaxy3d::WindowSurface", "Failed to create window: {}", e);
            return Err(Error::InitializationFailed(format!("Failed to create window: {}", e)));
        }

        let window = match state.window.clone() {
            Some(window) => window,
            None => {
                engine_error!("galaxy3d::WindowSurface", "Platform never created the window");
                return Err(Error::InitializationFailed("Platform never created the window".to_string()));
            }
        };

        let size = window.inner_size();
        engine_info!("galaxy3d::WindowSurface", "Window '{}' created ({}x{})", title, size.width, size.height);

        // The initial configure event is not a resize the chain has to react to
        state.resized = false;

        Ok(Self { event_loop, state, window })
    }

    /// The underlying winit window (used to create the backend surface)
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// True once the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    /// Process pending OS events without blocking
    pub fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(_) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            self.state.close_requested = true;
        }
    }
}

impl PresentableSurface for WindowSurface {
    fn extent(&self) -> Extent2D {
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn was_resized(&self) -> bool {
        self.state.resized
    }

    fn reset_resized_flag(&mut self) {
        self.state.resized = false;
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }
}
