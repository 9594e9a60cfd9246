//! Scripted runtime used by the unit and scenario tests.

use std::collections::VecDeque;
use std::ffi::c_void;

use crate::engine::xr::runtime::{
    ApplicationInfo, Enumerated, FormFactor, InstanceHandle, InstanceProperties, RuntimeEvent,
    SessionHandle, SessionState, SystemId, SystemProperties, Version, ViewConfigurationType,
    XrRuntime,
};
use crate::engine::{EngineError, EngineResult};

/// Calls observed by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateInstance {
        layers: Vec<String>,
        extensions: Vec<String>,
    },
    CreateDebugMessenger,
    CreateSession {
        binding: usize,
    },
    BeginSession(ViewConfigurationType),
    EndSession,
    DestroySession,
    DestroyDebugMessenger,
    DestroyInstance,
}

pub struct MockRuntime {
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    /// Added to the advertised extensions right after the first size query.
    pub grow_extensions_once: Option<String>,
    queue: VecDeque<RuntimeEvent>,
    later_ticks: VecDeque<Vec<RuntimeEvent>>,
    pub polls: usize,
    pub calls: Vec<Call>,
    /// Name of a call that should fail, e.g. `"xrBeginSession"`.
    pub fail_on: Option<&'static str>,
    instance: Option<InstanceHandle>,
    session: Option<SessionHandle>,
}

impl MockRuntime {
    pub const INSTANCE: InstanceHandle = InstanceHandle(0x1);
    pub const SESSION: SessionHandle = SessionHandle(0x5e55);
    pub const FOREIGN_SESSION: SessionHandle = SessionHandle(0xbad);
    pub const SYSTEM: SystemId = SystemId(0x42);

    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            extensions: vec!["XR_EXT_debug_utils".to_string(), "XR_MND_headless".to_string()],
            grow_extensions_once: None,
            queue: VecDeque::new(),
            later_ticks: VecDeque::new(),
            polls: 0,
            calls: Vec::new(),
            fail_on: None,
            instance: None,
            session: None,
        }
    }

    pub fn with_layers(mut self, layers: &[&str]) -> Self {
        self.layers = layers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Queue events for the current tick.
    pub fn push_events(&mut self, events: impl IntoIterator<Item = RuntimeEvent>) {
        self.queue.extend(events);
    }

    /// One batch per tick: the first is visible immediately, each following
    /// batch becomes visible after the queue has been drained empty once.
    pub fn with_event_batches(mut self, batches: Vec<Vec<RuntimeEvent>>) -> Self {
        let mut batches: VecDeque<_> = batches.into();
        if let Some(first) = batches.pop_front() {
            self.queue.extend(first);
        }
        self.later_ticks = batches;
        self
    }

    pub fn state_changed(state: SessionState) -> RuntimeEvent {
        RuntimeEvent::SessionStateChanged {
            session: Self::SESSION,
            state,
            time: 0,
        }
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn session_alive(&self) -> bool {
        self.session.is_some()
    }

    pub fn instance_alive(&self) -> bool {
        self.instance.is_some()
    }

    fn check(&self, call: &'static str) -> EngineResult<()> {
        if self.fail_on == Some(call) {
            return Err(EngineError::runtime(call, "XR_ERROR_RUNTIME_FAILURE"));
        }
        Ok(())
    }

    fn fill(source: &[String], buffer: &mut [String]) -> Enumerated {
        if buffer.is_empty() {
            return Enumerated::Count(source.len() as u32);
        }
        if buffer.len() < source.len() {
            return Enumerated::SizeInsufficient(source.len() as u32);
        }
        for (slot, name) in buffer.iter_mut().zip(source) {
            *slot = name.clone();
        }
        Enumerated::Count(source.len() as u32)
    }

    fn expect_instance(&self, instance: InstanceHandle) -> EngineResult<()> {
        if self.instance != Some(instance) {
            return Err(EngineError::ContractViolation("unknown instance handle"));
        }
        Ok(())
    }

    fn expect_session(&self, session: SessionHandle) -> EngineResult<()> {
        if self.session != Some(session) {
            return Err(EngineError::ContractViolation("unknown session handle"));
        }
        Ok(())
    }
}

impl XrRuntime for MockRuntime {
    fn enumerate_api_layers(&mut self, buffer: &mut [String]) -> EngineResult<Enumerated> {
        self.check("xrEnumerateApiLayerProperties")?;
        Ok(Self::fill(&self.layers, buffer))
    }

    fn enumerate_instance_extensions(&mut self, buffer: &mut [String]) -> EngineResult<Enumerated> {
        self.check("xrEnumerateInstanceExtensionProperties")?;
        if !buffer.is_empty() {
            if let Some(extra) = self.grow_extensions_once.take() {
                self.extensions.push(extra);
            }
        }
        Ok(Self::fill(&self.extensions, buffer))
    }

    fn create_instance(
        &mut self,
        _app: &ApplicationInfo,
        layers: &[&str],
        extensions: &[&str],
    ) -> EngineResult<InstanceHandle> {
        self.check("xrCreateInstance")?;
        if self.instance.is_some() {
            return Err(EngineError::ContractViolation("instance already exists"));
        }
        self.calls.push(Call::CreateInstance {
            layers: layers.iter().map(|s| s.to_string()).collect(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
        });
        self.instance = Some(Self::INSTANCE);
        Ok(Self::INSTANCE)
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.check("xrDestroyInstance")?;
        self.expect_instance(instance)?;
        self.calls.push(Call::DestroyInstance);
        self.instance = None;
        Ok(())
    }

    fn create_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.check("xrCreateDebugUtilsMessengerEXT")?;
        self.expect_instance(instance)?;
        self.calls.push(Call::CreateDebugMessenger);
        Ok(())
    }

    fn destroy_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.expect_instance(instance)?;
        self.calls.push(Call::DestroyDebugMessenger);
        Ok(())
    }

    fn instance_properties(&self, instance: InstanceHandle) -> EngineResult<InstanceProperties> {
        self.check("xrGetInstanceProperties")?;
        self.expect_instance(instance)?;
        Ok(InstanceProperties {
            runtime_name: "Mock Runtime".to_string(),
            runtime_version: Version::new(1, 2, 3),
        })
    }

    fn system(&self, instance: InstanceHandle, _form_factor: FormFactor) -> EngineResult<SystemId> {
        self.check("xrGetSystem")?;
        self.expect_instance(instance)?;
        Ok(Self::SYSTEM)
    }

    fn system_properties(
        &self,
        instance: InstanceHandle,
        _system: SystemId,
    ) -> EngineResult<SystemProperties> {
        self.check("xrGetSystemProperties")?;
        self.expect_instance(instance)?;
        Ok(SystemProperties {
            system_name: "Mock HMD".to_string(),
            vendor_id: 0x1234,
            max_swapchain_image_width: 2048,
            max_swapchain_image_height: 2048,
            max_layer_count: 16,
            orientation_tracking: true,
            position_tracking: true,
        })
    }

    fn create_session(
        &mut self,
        instance: InstanceHandle,
        _system: SystemId,
        binding: *const c_void,
    ) -> EngineResult<SessionHandle> {
        self.check("xrCreateSession")?;
        self.expect_instance(instance)?;
        self.calls.push(Call::CreateSession {
            binding: binding as usize,
        });
        self.session = Some(Self::SESSION);
        Ok(Self::SESSION)
    }

    fn destroy_session(&mut self, session: SessionHandle) -> EngineResult<()> {
        self.check("xrDestroySession")?;
        self.expect_session(session)?;
        self.calls.push(Call::DestroySession);
        self.session = None;
        Ok(())
    }

    fn poll_event(&mut self, instance: InstanceHandle) -> EngineResult<Option<RuntimeEvent>> {
        self.check("xrPollEvent")?;
        self.expect_instance(instance)?;
        self.polls += 1;
        match self.queue.pop_front() {
            Some(event) => Ok(Some(event)),
            None => {
                if let Some(next) = self.later_ticks.pop_front() {
                    self.queue.extend(next);
                }
                Ok(None)
            }
        }
    }

    fn begin_session(
        &mut self,
        session: SessionHandle,
        view_configuration: ViewConfigurationType,
    ) -> EngineResult<()> {
        self.check("xrBeginSession")?;
        self.expect_session(session)?;
        self.calls.push(Call::BeginSession(view_configuration));
        Ok(())
    }

    fn end_session(&mut self, session: SessionHandle) -> EngineResult<()> {
        self.check("xrEndSession")?;
        self.expect_session(session)?;
        self.calls.push(Call::EndSession);
        Ok(())
    }
}
