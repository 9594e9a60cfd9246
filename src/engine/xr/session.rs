//! Session lifecycle, driven only by state-changed events from the runtime.

use std::ffi::c_void;

use crate::engine::EngineResult;
use crate::engine::xr::instance::InstanceManager;
use crate::engine::xr::runtime::{
    SessionHandle, SessionState, SystemIdentity, ViewConfigurationType, XrRuntime,
};

/// View configuration the session is begun with.
pub const PRIMARY_VIEW_CONFIGURATION: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

/// Outer-loop termination and render gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFlags {
    pub application_running: bool,
    pub session_running: bool,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            application_running: true,
            session_running: false,
        }
    }
}

#[derive(Debug)]
pub struct SessionStateMachine {
    session: SessionHandle,
    state: SessionState,
    flags: RunFlags,
    /// `session_running` initially and after every applied state event.
    flag_trace: Vec<bool>,
}

impl SessionStateMachine {
    /// Create the session. `binding` is the graphics backend's chain entry and
    /// must stay valid until [`SessionStateMachine::destroy`].
    pub fn create<R>(
        runtime: &mut R,
        instance: &InstanceManager,
        system: &SystemIdentity,
        binding: *const c_void,
    ) -> EngineResult<Self>
    where
        R: XrRuntime + ?Sized,
    {
        let session = runtime.create_session(instance.handle(), system.system_id, binding)?;
        log::info!("Created session {session}");
        Ok(Self::from_handle(session))
    }

    pub(crate) fn from_handle(session: SessionHandle) -> Self {
        let flags = RunFlags::default();
        Self {
            session,
            state: SessionState::Unknown,
            flags,
            flag_trace: vec![flags.session_running],
        }
    }

    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn flags(&self) -> RunFlags {
        self.flags
    }

    pub fn application_running(&self) -> bool {
        self.flags.application_running
    }

    pub fn session_running(&self) -> bool {
        self.flags.session_running
    }

    #[cfg(test)]
    pub fn flag_trace(&self) -> &[bool] {
        &self.flag_trace
    }

    pub fn owns(&self, session: SessionHandle) -> bool {
        self.session == session
    }

    /// Apply a state reported for the owned session.
    ///
    /// The caller has already checked that the event names this session.
    pub(crate) fn apply_state<R>(&mut self, runtime: &mut R, new_state: SessionState) -> EngineResult<()>
    where
        R: XrRuntime + ?Sized,
    {
        log::info!("Session state: {:?} -> {:?}", self.state, new_state);

        match new_state {
            SessionState::Ready => {
                runtime.begin_session(self.session, PRIMARY_VIEW_CONFIGURATION)?;
                self.flags.session_running = true;
            }
            SessionState::Stopping => {
                runtime.end_session(self.session)?;
                self.flags.session_running = false;
            }
            SessionState::Exiting | SessionState::LossPending => {
                self.flags.session_running = false;
                self.flags.application_running = false;
            }
            _ => {}
        }

        self.state = new_state;
        self.flag_trace.push(self.flags.session_running);
        Ok(())
    }

    /// The whole instance is going away; shut down without touching the runtime.
    pub(crate) fn instance_loss_pending(&mut self) {
        self.flags.session_running = false;
        self.flags.application_running = false;
    }

    /// The platform asked the process to exit.
    pub fn stop_application(&mut self) {
        self.flags.application_running = false;
    }

    pub fn destroy<R>(self, runtime: &mut R) -> EngineResult<()>
    where
        R: XrRuntime + ?Sized,
    {
        if !self.state.is_terminal() {
            log::debug!("Destroying session {} in state {:?}", self.session, self.state);
        }
        runtime.destroy_session(self.session)?;
        log::info!("Destroyed session {}", self.session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::engine::xr::mock::{Call, MockRuntime};
    use crate::engine::xr::negotiator::CapabilityNegotiator;
    use crate::engine::xr::runtime::{ApplicationInfo, FormFactor};

    fn started(rt: &mut MockRuntime) -> SessionStateMachine {
        let negotiator = CapabilityNegotiator::default();
        let accepted = negotiator.negotiate(rt).unwrap();
        let mut instance = InstanceManager::create(rt, &ApplicationInfo::default(), &accepted).unwrap();
        let system = instance
            .system_identity(&*rt, FormFactor::HeadMountedDisplay)
            .unwrap()
            .clone();
        SessionStateMachine::create(rt, &instance, &system, std::ptr::null()).unwrap()
    }

    fn feed(rt: &mut MockRuntime, sm: &mut SessionStateMachine, states: &[SessionState]) {
        for s in states {
            sm.apply_state(rt, *s).unwrap();
        }
    }

    #[test]
    fn starts_unknown_and_not_running() {
        let mut rt = MockRuntime::new();
        let sm = started(&mut rt);

        assert_eq!(sm.state(), SessionState::Unknown);
        assert_eq!(sm.flags(), RunFlags::default());
        assert!(sm.application_running());
        assert!(!sm.session_running());
        assert_eq!(rt.count(&Call::CreateSession { binding: 0 }), 1);
    }

    #[test]
    fn ready_synchronized_stopping() {
        let mut rt = MockRuntime::new();
        let mut sm = started(&mut rt);

        feed(
            &mut rt,
            &mut sm,
            &[SessionState::Ready, SessionState::Synchronized, SessionState::Stopping],
        );

        assert_eq!(rt.count(&Call::BeginSession(ViewConfigurationType::PrimaryStereo)), 1);
        assert_eq!(rt.count(&Call::EndSession), 1);
        assert_eq!(sm.flag_trace(), &[false, true, true, false]);
        assert_eq!(sm.state(), SessionState::Stopping);
        assert!(sm.application_running());
    }

    #[test]
    fn exiting_and_loss_pending_end_the_application() {
        for terminal in [SessionState::Exiting, SessionState::LossPending] {
            let mut rt = MockRuntime::new();
            let mut sm = started(&mut rt);

            feed(&mut rt, &mut sm, &[SessionState::Ready, SessionState::Focused, terminal]);

            assert!(!sm.session_running());
            assert!(!sm.application_running());
            assert!(sm.state().is_terminal());
            // No runtime call for the terminal state itself.
            assert_eq!(rt.count(&Call::EndSession), 0);
        }
    }

    #[test]
    fn running_only_after_ready_not_followed_by_stop() {
        use SessionState::*;
        let scripts: &[(&[SessionState], bool)] = &[
            (&[Idle], false),
            (&[Idle, Ready], true),
            (&[Idle, Ready, Synchronized, Visible, Focused], true),
            (&[Ready, Stopping], false),
            (&[Ready, Stopping, Idle, Ready], true),
            (&[Ready, Visible, Exiting], false),
            (&[Ready, LossPending], false),
        ];

        for (script, expected) in scripts {
            let mut rt = MockRuntime::new();
            let mut sm = started(&mut rt);
            feed(&mut rt, &mut sm, script);
            assert_eq!(sm.session_running(), *expected, "script {script:?}");
        }
    }

    #[test]
    fn begin_failure_is_fatal() {
        let mut rt = MockRuntime::new();
        let mut sm = started(&mut rt);
        rt.fail_on = Some("xrBeginSession");

        let res = sm.apply_state(&mut rt, SessionState::Ready);

        assert!(matches!(res, Err(EngineError::Runtime { call: "xrBeginSession", .. })));
        assert!(!sm.session_running());
    }

    #[test]
    fn end_failure_is_fatal() {
        let mut rt = MockRuntime::new();
        let mut sm = started(&mut rt);
        feed(&mut rt, &mut sm, &[SessionState::Ready]);
        rt.fail_on = Some("xrEndSession");

        assert!(sm.apply_state(&mut rt, SessionState::Stopping).is_err());
    }

    #[test]
    fn instance_loss_clears_both_flags() {
        let mut rt = MockRuntime::new();
        let mut sm = started(&mut rt);
        feed(&mut rt, &mut sm, &[SessionState::Ready]);

        sm.instance_loss_pending();

        assert_eq!(
            sm.flags(),
            RunFlags {
                application_running: false,
                session_running: false,
            }
        );
    }

    #[test]
    fn destroy_releases_session() {
        let mut rt = MockRuntime::new();
        let sm = started(&mut rt);

        sm.destroy(&mut rt).unwrap();

        assert!(!rt.session_alive());
        assert_eq!(rt.count(&Call::DestroySession), 1);
    }
}
