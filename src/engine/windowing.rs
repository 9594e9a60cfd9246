//! Platform event pump, called once per tick before runtime events are drained.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineResult;
use crate::engine::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Nothing to pump (plain desktop process).
    None,
    /// winit event loop with a mirror window.
    Winit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformStatus {
    Continue,
    /// The platform is tearing the process down.
    Exit,
}

/// OS-side event source. Passed to the lifecycle loop explicitly.
pub trait PlatformContext {
    /// Process every pending platform event. May block up to a bounded
    /// timeout while the app is in the background and no session runs.
    fn pump_events(&mut self, session_running: bool) -> EngineResult<PlatformStatus>;
}

/// Timeout for one pump: wait while paused with nothing to render, else just poll.
pub fn pump_timeout(resumed: bool, session_running: bool, idle_timeout: Duration) -> Duration {
    if !resumed && !session_running {
        idle_timeout
    } else {
        Duration::ZERO
    }
}

#[derive(Debug, Default)]
pub struct NullPlatform;

impl PlatformContext for NullPlatform {
    fn pump_events(&mut self, _session_running: bool) -> EngineResult<PlatformStatus> {
        Ok(PlatformStatus::Continue)
    }
}

pub fn create_platform(config: &AppConfig) -> EngineResult<Box<dyn PlatformContext>> {
    match config.platform {
        PlatformKind::None => Ok(Box::new(NullPlatform)),
        PlatformKind::Winit => winit_platform::create(config),
    }
}

#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "android"
))]
mod winit_platform {
    use std::time::Duration;

    use winit::application::ApplicationHandler;
    use winit::event::{ElementState, KeyEvent, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, EventLoop};
    use winit::keyboard::{Key, NamedKey};
    use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
    use winit::window::{Window, WindowAttributes, WindowId};

    use super::{PlatformContext, PlatformStatus, pump_timeout};
    use crate::engine::config::AppConfig;
    use crate::engine::{EngineError, EngineResult};

    pub fn create(config: &AppConfig) -> EngineResult<Box<dyn PlatformContext>> {
        let event_loop = EventLoop::new().map_err(|e| EngineError::Platform(e.to_string()))?;
        Ok(Box::new(WinitPlatform {
            event_loop,
            handler: PumpHandler {
                title: config.application.application_name.clone(),
                window: None,
                resumed: false,
                failure: None,
            },
            idle_timeout: Duration::from_millis(config.pump_timeout_ms),
            exited: false,
        }))
    }

    /// winit event loop driven with `pump_app_events` instead of owning the thread.
    pub struct WinitPlatform {
        event_loop: EventLoop<()>,
        handler: PumpHandler,
        idle_timeout: Duration,
        exited: bool,
    }

    struct PumpHandler {
        title: String,
        window: Option<Window>,
        resumed: bool,
        failure: Option<String>,
    }

    impl PlatformContext for WinitPlatform {
        fn pump_events(&mut self, session_running: bool) -> EngineResult<PlatformStatus> {
            if self.exited {
                return Ok(PlatformStatus::Exit);
            }

            let timeout = pump_timeout(self.handler.resumed, session_running, self.idle_timeout);
            let status = self
                .event_loop
                .pump_app_events(Some(timeout), &mut self.handler);

            if let Some(failure) = self.handler.failure.take() {
                return Err(EngineError::Platform(failure));
            }

            match status {
                PumpStatus::Continue => Ok(PlatformStatus::Continue),
                PumpStatus::Exit(code) => {
                    log::info!("winit event loop exited ({code})");
                    self.exited = true;
                    Ok(PlatformStatus::Exit)
                }
            }
        }
    }

    impl ApplicationHandler for PumpHandler {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            self.resumed = true;
            if self.window.is_some() {
                return;
            }

            let attrs: WindowAttributes = Window::default_attributes()
                .with_title(self.title.clone())
                .with_inner_size(winit::dpi::LogicalSize::new(640.0, 480.0));

            match event_loop.create_window(attrs) {
                Ok(window) => self.window = Some(window),
                Err(e) => {
                    self.failure = Some(format!("failed to create window: {e}"));
                    event_loop.exit();
                }
            }
        }

        fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
            self.resumed = false;
        }

        fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            match event {
                WindowEvent::CloseRequested => event_loop.exit(),

                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => event_loop.exit(),

                WindowEvent::Focused(focused) => log::debug!("window focused: {focused}"),

                _ => {}
            }
        }

        fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
            self.window = None;
        }
    }
}

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "android"
)))]
mod winit_platform {
    use super::PlatformContext;
    use crate::engine::config::AppConfig;
    use crate::engine::{EngineError, EngineResult};

    pub fn create(_config: &AppConfig) -> EngineResult<Box<dyn PlatformContext>> {
        Err(EngineError::Platform(
            "winit event pumping is not available on this target".to_string(),
        ))
    }
}
