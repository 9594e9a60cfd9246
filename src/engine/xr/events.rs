//! Per-tick draining and routing of runtime events.

use crate::engine::EngineResult;
use crate::engine::xr::runtime::{InstanceHandle, RuntimeEvent, XrRuntime};
use crate::engine::xr::session::SessionStateMachine;

/// What one drain did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Poll calls made, including the final empty one.
    pub polled: usize,
    /// Events taken off the queue.
    pub handled: usize,
}

pub struct EventDispatcher {
    instance: InstanceHandle,
}

impl EventDispatcher {
    pub fn new(instance: InstanceHandle) -> Self {
        Self { instance }
    }

    /// Poll until the runtime reports no more events, handling each one in
    /// delivery order.
    pub fn drain<R>(
        &self,
        runtime: &mut R,
        session: &mut SessionStateMachine,
    ) -> EngineResult<DrainReport>
    where
        R: XrRuntime + ?Sized,
    {
        let mut report = DrainReport::default();

        loop {
            report.polled += 1;
            let Some(event) = runtime.poll_event(self.instance)? else {
                break;
            };
            report.handled += 1;
            self.dispatch(runtime, session, event)?;
        }

        Ok(report)
    }

    fn dispatch<R>(
        &self,
        runtime: &mut R,
        session: &mut SessionStateMachine,
        event: RuntimeEvent,
    ) -> EngineResult<()>
    where
        R: XrRuntime + ?Sized,
    {
        match event {
            RuntimeEvent::EventsLost { lost_event_count } => {
                log::info!("OPENXR: Events Lost: {lost_event_count}");
            }

            RuntimeEvent::InstanceLossPending { loss_time } => {
                log::warn!("OPENXR: Instance Loss Pending at: {loss_time}");
                session.instance_loss_pending();
            }

            RuntimeEvent::InteractionProfileChanged { session: target } => {
                log::info!("OPENXR: Interaction Profile changed for Session: {target}");
                if !session.owns(target) {
                    log::warn!("Interaction profile change for unknown session {target}");
                }
            }

            RuntimeEvent::ReferenceSpaceChangePending {
                session: target,
                reference_space_type,
            } => {
                log::info!(
                    "OPENXR: Reference Space Change pending for Session: {target} ({reference_space_type:?})"
                );
                if !session.owns(target) {
                    log::warn!("Reference space change for unknown session {target}");
                }
            }

            RuntimeEvent::SessionStateChanged {
                session: target,
                state,
                time,
            } => {
                if !session.owns(target) {
                    log::warn!("Session state change to {state:?} for unknown session {target}, ignored");
                    return Ok(());
                }
                log::debug!("state change at {time}");
                session.apply_state(runtime, state)?;
            }

            RuntimeEvent::Unrecognized => {}
        }

        Ok(())
    }
}
