//! The runtime service boundary.
//!
//! `XrRuntime` is the only way the lifecycle code talks to an XR runtime. The
//! production implementation sits on the `openxr` crate; tests drive the same
//! code through a scripted mock.

use std::ffi::c_void;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::EngineResult;

/// Opaque runtime instance handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(pub u64);

/// Opaque session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u64);

/// Result of one call of a two-call enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumerated {
    /// With an empty buffer: the number of elements available.
    /// With a non-empty buffer: the number of elements written.
    Count(u32),
    /// The buffer was too small; carries the count required now.
    SizeInsufficient(u32),
}

/// Application identity handed to the runtime at instance creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: Version,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            application_name: "OpenXR Tutorial".to_string(),
            application_version: 1,
            engine_name: "OpenXR Engine".to_string(),
            engine_version: 1,
            api_version: Version::new(1, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProperties {
    pub runtime_name: String,
    pub runtime_version: Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FormFactor {
    HeadMountedDisplay,
    HandheldDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewConfigurationType {
    PrimaryStereo,
}

/// Hardware and vendor properties of the selected system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemProperties {
    pub system_name: String,
    pub vendor_id: u32,
    pub max_swapchain_image_width: u32,
    pub max_swapchain_image_height: u32,
    pub max_layer_count: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
}

/// Immutable record fetched once after instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIdentity {
    pub form_factor: FormFactor,
    pub system_id: SystemId,
    pub properties: SystemProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl SessionState {
    /// States after which the application loop must end.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Exiting | SessionState::LossPending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
    Other(i32),
}

/// One record taken off the runtime event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    EventsLost {
        lost_event_count: u32,
    },
    InstanceLossPending {
        loss_time: i64,
    },
    InteractionProfileChanged {
        session: SessionHandle,
    },
    ReferenceSpaceChangePending {
        session: SessionHandle,
        reference_space_type: ReferenceSpaceType,
    },
    SessionStateChanged {
        session: SessionHandle,
        state: SessionState,
        time: i64,
    },
    /// A type tag this coordinator does not handle.
    Unrecognized,
}

/// Query/command protocol of an XR runtime service.
///
/// All calls are blocking and return immediately. Methods that take a handle
/// expect it to come from the same runtime.
pub trait XrRuntime {
    /// Two-call enumeration of API layer names. See [`Enumerated`].
    fn enumerate_api_layers(&mut self, buffer: &mut [String]) -> EngineResult<Enumerated>;

    /// Two-call enumeration of instance extension names. See [`Enumerated`].
    fn enumerate_instance_extensions(&mut self, buffer: &mut [String])
    -> EngineResult<Enumerated>;

    fn create_instance(
        &mut self,
        app: &ApplicationInfo,
        layers: &[&str],
        extensions: &[&str],
    ) -> EngineResult<InstanceHandle>;

    fn destroy_instance(&mut self, instance: InstanceHandle) -> EngineResult<()>;

    /// Install a messenger that forwards runtime debug output to the log.
    /// Only valid when `XR_EXT_debug_utils` was enabled on the instance.
    fn create_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()>;

    fn destroy_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()>;

    fn instance_properties(&self, instance: InstanceHandle) -> EngineResult<InstanceProperties>;

    fn system(&self, instance: InstanceHandle, form_factor: FormFactor) -> EngineResult<SystemId>;

    fn system_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> EngineResult<SystemProperties>;

    /// `binding` is placed on the create-info `next` chain untouched.
    fn create_session(
        &mut self,
        instance: InstanceHandle,
        system: SystemId,
        binding: *const c_void,
    ) -> EngineResult<SessionHandle>;

    fn destroy_session(&mut self, session: SessionHandle) -> EngineResult<()>;

    /// Non-blocking; `Ok(None)` when the queue is empty.
    fn poll_event(&mut self, instance: InstanceHandle) -> EngineResult<Option<RuntimeEvent>>;

    fn begin_session(
        &mut self,
        session: SessionHandle,
        view_configuration: ViewConfigurationType,
    ) -> EngineResult<()>;

    fn end_session(&mut self, session: SessionHandle) -> EngineResult<()>;

    /// The live `openxr` instance, for backends that need runtime-side graphics queries.
    fn openxr_instance(&self) -> Option<&openxr::Instance> {
        None
    }
}
