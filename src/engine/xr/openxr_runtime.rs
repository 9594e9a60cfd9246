//! `XrRuntime` on top of the system OpenXR loader.

use std::ffi::{CStr, c_char, c_void};
use std::ptr;

use openxr as xr;
use openxr::sys;

use crate::engine::xr::runtime::{
    ApplicationInfo, Enumerated, FormFactor, InstanceHandle, InstanceProperties,
    ReferenceSpaceType, RuntimeEvent, SessionHandle, SessionState, SystemId, SystemProperties,
    Version, ViewConfigurationType, XrRuntime,
};
use crate::engine::{EngineError, EngineResult};

pub struct OpenXrRuntime {
    entry: xr::Entry,
    instance: Option<xr::Instance>,
    debug_messenger: Option<sys::DebugUtilsMessengerEXT>,
    event_storage: xr::EventDataBuffer,
}

impl OpenXrRuntime {
    /// Load the OpenXR loader. A missing loader is fatal.
    pub fn load() -> EngineResult<Self> {
        let entry = unsafe { xr::Entry::load() }
            .map_err(|e| EngineError::LoaderMissing(format!("{e:?}")))?;

        #[cfg(target_os = "android")]
        entry
            .initialize_android_loader()
            .map_err(|e| EngineError::runtime("xrInitializeLoaderKHR", e))?;

        Ok(Self {
            entry,
            instance: None,
            debug_messenger: None,
            event_storage: xr::EventDataBuffer::new(),
        })
    }

    fn instance(&self, handle: InstanceHandle) -> EngineResult<&xr::Instance> {
        match &self.instance {
            Some(instance) if instance.as_raw().into_raw() == handle.0 => Ok(instance),
            _ => Err(EngineError::ContractViolation("unknown instance handle")),
        }
    }

    fn live_instance(&self) -> EngineResult<&xr::Instance> {
        self.instance
            .as_ref()
            .ok_or(EngineError::ContractViolation("no live instance"))
    }
}

impl Drop for OpenXrRuntime {
    fn drop(&mut self) {
        // Only reached with a live messenger when the lifecycle aborted.
        if let (Some(instance), Some(messenger)) = (&self.instance, self.debug_messenger.take()) {
            if let Some(debug_utils) = instance.exts().ext_debug_utils.as_ref() {
                let _ = unsafe { (debug_utils.destroy_debug_utils_messenger)(messenger) };
            }
        }
    }
}

/// Map a raw result to an error when it is a failure code.
pub(crate) fn cvt(call: &'static str, result: sys::Result) -> EngineResult<sys::Result> {
    if result.into_raw() < 0 {
        Err(EngineError::runtime(call, result))
    } else {
        Ok(result)
    }
}

/// Interpret the result of one call of a two-call enumeration.
pub(crate) fn enumerated(
    call: &'static str,
    result: sys::Result,
    count: u32,
) -> EngineResult<Enumerated> {
    if result == sys::Result::ERROR_SIZE_INSUFFICIENT {
        return Ok(Enumerated::SizeInsufficient(count));
    }
    cvt(call, result)?;
    Ok(Enumerated::Count(count))
}

pub(crate) fn fixed_str(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn extension_set(names: &[&str]) -> xr::ExtensionSet {
    let mut set = xr::ExtensionSet::default();
    for name in names {
        match *name {
            "XR_EXT_debug_utils" => set.ext_debug_utils = true,
            "XR_KHR_vulkan_enable" => set.khr_vulkan_enable = true,
            "XR_MND_headless" => set.mnd_headless = true,
            other => set.other.push(other.to_string()),
        }
    }
    set
}

fn session_state(state: xr::SessionState) -> SessionState {
    match state {
        xr::SessionState::IDLE => SessionState::Idle,
        xr::SessionState::READY => SessionState::Ready,
        xr::SessionState::SYNCHRONIZED => SessionState::Synchronized,
        xr::SessionState::VISIBLE => SessionState::Visible,
        xr::SessionState::FOCUSED => SessionState::Focused,
        xr::SessionState::STOPPING => SessionState::Stopping,
        xr::SessionState::LOSS_PENDING => SessionState::LossPending,
        xr::SessionState::EXITING => SessionState::Exiting,
        _ => SessionState::Unknown,
    }
}

fn reference_space_type(ty: xr::ReferenceSpaceType) -> ReferenceSpaceType {
    match ty {
        xr::ReferenceSpaceType::VIEW => ReferenceSpaceType::View,
        xr::ReferenceSpaceType::LOCAL => ReferenceSpaceType::Local,
        xr::ReferenceSpaceType::STAGE => ReferenceSpaceType::Stage,
        other => ReferenceSpaceType::Other(other.into_raw()),
    }
}

fn runtime_event(event: xr::Event<'_>) -> RuntimeEvent {
    use xr::Event;

    match event {
        Event::EventsLost(e) => RuntimeEvent::EventsLost {
            lost_event_count: e.lost_event_count(),
        },
        Event::InstanceLossPending(e) => RuntimeEvent::InstanceLossPending {
            loss_time: e.loss_time().as_nanos(),
        },
        Event::InteractionProfileChanged(e) => RuntimeEvent::InteractionProfileChanged {
            session: SessionHandle(e.session().into_raw()),
        },
        Event::ReferenceSpaceChangePending(e) => RuntimeEvent::ReferenceSpaceChangePending {
            session: SessionHandle(e.session().into_raw()),
            reference_space_type: reference_space_type(e.reference_space_type()),
        },
        Event::SessionStateChanged(e) => RuntimeEvent::SessionStateChanged {
            session: SessionHandle(e.session().into_raw()),
            state: session_state(e.state()),
            time: e.time().as_nanos(),
        },
        _ => RuntimeEvent::Unrecognized,
    }
}

unsafe extern "system" fn log_debug_message(
    severity: sys::DebugUtilsMessageSeverityFlagsEXT,
    _types: sys::DebugUtilsMessageTypeFlagsEXT,
    data: *const sys::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> sys::Bool32 {
    let level = if severity.contains(sys::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(sys::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(sys::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Info
    } else {
        log::Level::Debug
    };

    let message = unsafe { data.as_ref() }
        .filter(|d| !d.message.is_null())
        .map(|d| unsafe { CStr::from_ptr(d.message) }.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::log!(target: "openxr", level, "{message}");

    false.into()
}

impl XrRuntime for OpenXrRuntime {
    fn enumerate_api_layers(&mut self, buffer: &mut [String]) -> EngineResult<Enumerated> {
        const CALL: &str = "xrEnumerateApiLayerProperties";
        let enumerate = self.entry.fp().enumerate_api_layer_properties;
        let mut count = 0u32;

        if buffer.is_empty() {
            let result = unsafe { enumerate(0, &mut count, ptr::null_mut()) };
            return enumerated(CALL, result, count);
        }

        let mut properties: Vec<sys::ApiLayerProperties> = (0..buffer.len())
            .map(|_| {
                let mut p: sys::ApiLayerProperties = unsafe { std::mem::zeroed() };
                p.ty = sys::ApiLayerProperties::TYPE;
                p
            })
            .collect();
        let result = unsafe {
            enumerate(
                properties.len() as u32,
                &mut count,
                properties.as_mut_ptr(),
            )
        };
        let outcome = enumerated(CALL, result, count)?;
        if let Enumerated::Count(written) = outcome {
            for (slot, p) in buffer.iter_mut().zip(properties.iter().take(written as usize)) {
                *slot = fixed_str(&p.layer_name);
            }
        }
        Ok(outcome)
    }

    fn enumerate_instance_extensions(&mut self, buffer: &mut [String]) -> EngineResult<Enumerated> {
        const CALL: &str = "xrEnumerateInstanceExtensionProperties";
        let enumerate = self.entry.fp().enumerate_instance_extension_properties;
        let mut count = 0u32;

        if buffer.is_empty() {
            let result = unsafe { enumerate(ptr::null(), 0, &mut count, ptr::null_mut()) };
            return enumerated(CALL, result, count);
        }

        let mut properties: Vec<sys::ExtensionProperties> = (0..buffer.len())
            .map(|_| {
                let mut p: sys::ExtensionProperties = unsafe { std::mem::zeroed() };
                p.ty = sys::ExtensionProperties::TYPE;
                p
            })
            .collect();
        let result = unsafe {
            enumerate(
                ptr::null(),
                properties.len() as u32,
                &mut count,
                properties.as_mut_ptr(),
            )
        };
        let outcome = enumerated(CALL, result, count)?;
        if let Enumerated::Count(written) = outcome {
            for (slot, p) in buffer.iter_mut().zip(properties.iter().take(written as usize)) {
                *slot = fixed_str(&p.extension_name);
            }
        }
        Ok(outcome)
    }

    fn create_instance(
        &mut self,
        app: &ApplicationInfo,
        layers: &[&str],
        extensions: &[&str],
    ) -> EngineResult<InstanceHandle> {
        if self.instance.is_some() {
            return Err(EngineError::ContractViolation("instance already created"));
        }

        let app_info = xr::ApplicationInfo {
            application_name: &app.application_name,
            application_version: app.application_version,
            engine_name: &app.engine_name,
            engine_version: app.engine_version,
            api_version: xr::Version::new(
                app.api_version.major,
                app.api_version.minor,
                app.api_version.patch,
            ),
        };

        let instance = self
            .entry
            .create_instance(&app_info, &extension_set(extensions), layers)
            .map_err(|e| EngineError::runtime("xrCreateInstance", e))?;
        let handle = InstanceHandle(instance.as_raw().into_raw());
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.instance(instance)?;
        // xr::Instance destroys the handle on drop.
        self.instance = None;
        log::info!("Destroyed instance");
        Ok(())
    }

    fn create_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        let instance = self.instance(instance)?;
        let debug_utils = instance
            .exts()
            .ext_debug_utils
            .as_ref()
            .ok_or(EngineError::ContractViolation("XR_EXT_debug_utils is not enabled"))?;

        let info = sys::DebugUtilsMessengerCreateInfoEXT {
            ty: sys::DebugUtilsMessengerCreateInfoEXT::TYPE,
            next: ptr::null(),
            message_severities: sys::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | sys::DebugUtilsMessageSeverityFlagsEXT::INFO
                | sys::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | sys::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_types: sys::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | sys::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | sys::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | sys::DebugUtilsMessageTypeFlagsEXT::CONFORMANCE,
            user_callback: Some(log_debug_message),
            user_data: ptr::null_mut(),
        };
        let mut messenger = sys::DebugUtilsMessengerEXT::NULL;
        cvt("xrCreateDebugUtilsMessengerEXT", unsafe {
            (debug_utils.create_debug_utils_messenger)(instance.as_raw(), &info, &mut messenger)
        })?;

        self.debug_messenger = Some(messenger);
        Ok(())
    }

    fn destroy_debug_messenger(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        let Some(messenger) = self.debug_messenger.take() else {
            return Ok(());
        };
        let instance = self.instance(instance)?;
        if let Some(debug_utils) = instance.exts().ext_debug_utils.as_ref() {
            cvt("xrDestroyDebugUtilsMessengerEXT", unsafe {
                (debug_utils.destroy_debug_utils_messenger)(messenger)
            })?;
        }
        Ok(())
    }

    fn instance_properties(&self, instance: InstanceHandle) -> EngineResult<InstanceProperties> {
        let properties = self
            .instance(instance)?
            .properties()
            .map_err(|e| EngineError::runtime("xrGetInstanceProperties", e))?;
        let v = properties.runtime_version;
        Ok(InstanceProperties {
            runtime_name: properties.runtime_name,
            runtime_version: Version::new(v.major(), v.minor(), v.patch()),
        })
    }

    fn system(&self, instance: InstanceHandle, form_factor: FormFactor) -> EngineResult<SystemId> {
        let form_factor = match form_factor {
            FormFactor::HeadMountedDisplay => xr::FormFactor::HEAD_MOUNTED_DISPLAY,
            FormFactor::HandheldDisplay => xr::FormFactor::HANDHELD_DISPLAY,
        };
        let system = self
            .instance(instance)?
            .system(form_factor)
            .map_err(|e| EngineError::runtime("xrGetSystem", e))?;
        Ok(SystemId(system.into_raw()))
    }

    fn system_properties(
        &self,
        instance: InstanceHandle,
        system: SystemId,
    ) -> EngineResult<SystemProperties> {
        let properties = self
            .instance(instance)?
            .system_properties(xr::SystemId::from_raw(system.0))
            .map_err(|e| EngineError::runtime("xrGetSystemProperties", e))?;
        Ok(SystemProperties {
            system_name: properties.system_name,
            vendor_id: properties.vendor_id,
            max_swapchain_image_width: properties.graphics_properties.max_swapchain_image_width,
            max_swapchain_image_height: properties.graphics_properties.max_swapchain_image_height,
            max_layer_count: properties.graphics_properties.max_layer_count,
            orientation_tracking: properties.tracking_properties.orientation_tracking.into(),
            position_tracking: properties.tracking_properties.position_tracking.into(),
        })
    }

    fn create_session(
        &mut self,
        instance: InstanceHandle,
        system: SystemId,
        binding: *const c_void,
    ) -> EngineResult<SessionHandle> {
        let instance = self.instance(instance)?;
        let info = sys::SessionCreateInfo {
            ty: sys::SessionCreateInfo::TYPE,
            next: binding,
            create_flags: sys::SessionCreateFlags::EMPTY,
            system_id: xr::SystemId::from_raw(system.0),
        };
        let mut session = sys::Session::NULL;
        cvt("xrCreateSession", unsafe {
            (instance.fp().create_session)(instance.as_raw(), &info, &mut session)
        })?;
        Ok(SessionHandle(session.into_raw()))
    }

    fn destroy_session(&mut self, session: SessionHandle) -> EngineResult<()> {
        let instance = self.live_instance()?;
        cvt("xrDestroySession", unsafe {
            (instance.fp().destroy_session)(sys::Session::from_raw(session.0))
        })?;
        Ok(())
    }

    fn poll_event(&mut self, handle: InstanceHandle) -> EngineResult<Option<RuntimeEvent>> {
        let Self {
            instance,
            event_storage,
            ..
        } = self;
        let instance = match instance {
            Some(instance) if instance.as_raw().into_raw() == handle.0 => instance,
            _ => return Err(EngineError::ContractViolation("unknown instance handle")),
        };
        let event = instance
            .poll_event(event_storage)
            .map_err(|e| EngineError::runtime("xrPollEvent", e))?;
        Ok(event.map(runtime_event))
    }

    fn begin_session(
        &mut self,
        session: SessionHandle,
        view_configuration: ViewConfigurationType,
    ) -> EngineResult<()> {
        let instance = self.live_instance()?;
        let info = sys::SessionBeginInfo {
            ty: sys::SessionBeginInfo::TYPE,
            next: ptr::null(),
            primary_view_configuration_type: match view_configuration {
                ViewConfigurationType::PrimaryStereo => xr::ViewConfigurationType::PRIMARY_STEREO,
            },
        };
        cvt("xrBeginSession", unsafe {
            (instance.fp().begin_session)(sys::Session::from_raw(session.0), &info)
        })?;
        Ok(())
    }

    fn end_session(&mut self, session: SessionHandle) -> EngineResult<()> {
        let instance = self.live_instance()?;
        cvt("xrEndSession", unsafe {
            (instance.fp().end_session)(sys::Session::from_raw(session.0))
        })?;
        Ok(())
    }

    fn openxr_instance(&self) -> Option<&xr::Instance> {
        self.instance.as_ref()
    }
}
