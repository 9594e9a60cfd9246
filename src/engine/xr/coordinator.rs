//! Instance/session lifecycle: setup, the tick loop, teardown.

use crate::engine::EngineResult;
use crate::engine::config::AppConfig;
use crate::engine::graphics::GraphicsBackend;
use crate::engine::windowing::{PlatformContext, PlatformStatus};
use crate::engine::xr::events::EventDispatcher;
use crate::engine::xr::instance::InstanceManager;
use crate::engine::xr::negotiator::{CapabilityNegotiator, DEBUG_UTILS_EXTENSION_NAME};
use crate::engine::xr::runtime::{SessionState, XrRuntime};
use crate::engine::xr::session::SessionStateMachine;

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks on which the session was running and a frame would be drawn.
    pub frames: u64,
    pub events: u64,
    pub final_state: SessionState,
}

/// Build the request for `config` plus the backend's own extension.
pub fn negotiator_for(config: &AppConfig, backend: &dyn GraphicsBackend) -> CapabilityNegotiator {
    let mut negotiator =
        CapabilityNegotiator::new(config.api_layers.iter().cloned(), config.instance_extensions.iter().cloned());
    if config.debug_utils {
        negotiator.request_extension(DEBUG_UTILS_EXTENSION_NAME);
    }
    negotiator.request_extension(backend.extension_name());
    negotiator
}

/// Drive one full instance/session lifecycle against `runtime`.
///
/// Returns once the application flag drops (terminal session state, instance
/// loss, or the platform asking to quit). The session and then the instance
/// are destroyed on the way out, also when the loop failed. `backend` is
/// borrowed so it outlives the session on every path.
pub fn run<R>(
    runtime: &mut R,
    backend: &mut dyn GraphicsBackend,
    platform: &mut dyn PlatformContext,
    config: &AppConfig,
) -> EngineResult<RunSummary>
where
    R: XrRuntime,
{
    let negotiator = negotiator_for(config, backend);
    let mut instance = {
        let accepted = negotiator.negotiate(runtime)?;
        InstanceManager::create(runtime, &config.application, &accepted)?
    };

    instance.properties(&*runtime)?;
    let system = instance.system_identity(&*runtime, config.form_factor)?.clone();

    backend.initialize(&*runtime, &system)?;
    log::info!("Graphics backend {:?} ready", backend.kind());

    let mut session = SessionStateMachine::create(runtime, &instance, &system, backend.binding())?;
    let dispatcher = EventDispatcher::new(instance.handle());

    let outcome = tick_loop(runtime, platform, &dispatcher, &mut session);

    let handle = session.session();
    let session_teardown = session.destroy(runtime);
    if let Err(e) = &session_teardown {
        log::error!("Failed to destroy session {handle}: {e}");
    }
    let live_session = session_teardown.is_err().then_some(handle);
    let instance_teardown = instance.destroy(runtime, live_session);

    let summary = outcome?;
    session_teardown?;
    instance_teardown?;
    Ok(summary)
}

fn tick_loop<R>(
    runtime: &mut R,
    platform: &mut dyn PlatformContext,
    dispatcher: &EventDispatcher,
    session: &mut SessionStateMachine,
) -> EngineResult<RunSummary>
where
    R: XrRuntime,
{
    let mut ticks = 0;
    let mut frames = 0;
    let mut events = 0;

    while session.application_running() {
        if platform.pump_events(session.session_running())? == PlatformStatus::Exit {
            log::info!("Platform requested exit");
            session.stop_application();
        }

        let report = dispatcher.drain(runtime, session)?;
        events += report.handled as u64;

        if session.session_running() {
            // Frame submission hooks in here.
            log::trace!("frame {frames}");
            frames += 1;
        }
        ticks += 1;
    }

    let final_state = session.state();
    log::info!("Leaving main loop after {ticks} ticks in state {final_state:?}");

    Ok(RunSummary {
        ticks,
        frames,
        events,
        final_state,
    })
}
