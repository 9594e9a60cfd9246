use crate::engine::xr::negotiator::{AcceptedCapabilities, DEBUG_UTILS_EXTENSION_NAME};
use crate::engine::xr::runtime::{
    ApplicationInfo, FormFactor, InstanceHandle, InstanceProperties, SessionHandle, SystemIdentity,
    XrRuntime,
};
use crate::engine::{EngineError, EngineResult};

/// Owns the single runtime instance (and its debug messenger, if any).
#[derive(Debug)]
pub struct InstanceManager {
    handle: InstanceHandle,
    debug_messenger: bool,
    system: Option<SystemIdentity>,
}

impl InstanceManager {
    /// Create the instance from the negotiated capabilities. There is no retry.
    pub fn create<R>(
        runtime: &mut R,
        app: &ApplicationInfo,
        accepted: &AcceptedCapabilities<'_>,
    ) -> EngineResult<Self>
    where
        R: XrRuntime + ?Sized,
    {
        let handle = runtime.create_instance(app, &accepted.layers, &accepted.extensions)?;
        log::info!(
            "Created instance for '{}' with {} layer(s), {} extension(s)",
            app.application_name,
            accepted.layers.len(),
            accepted.extensions.len()
        );

        let debug_messenger = accepted.accepts_extension(DEBUG_UTILS_EXTENSION_NAME);
        if debug_messenger {
            runtime.create_debug_messenger(handle)?;
        } else {
            log::info!("{DEBUG_UTILS_EXTENSION_NAME} not enabled, runtime debug output disabled");
        }

        Ok(Self {
            handle,
            debug_messenger,
            system: None,
        })
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    #[cfg(test)]
    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger
    }

    pub fn properties<R>(&self, runtime: &R) -> EngineResult<InstanceProperties>
    where
        R: XrRuntime + ?Sized,
    {
        let properties = runtime.instance_properties(self.handle)?;
        log::info!(
            "OpenXR Runtime: {} - {}",
            properties.runtime_name,
            properties.runtime_version
        );
        Ok(properties)
    }

    /// Fetch the system for `form_factor` once; later calls return the cached record.
    pub fn system_identity<R>(
        &mut self,
        runtime: &R,
        form_factor: FormFactor,
    ) -> EngineResult<&SystemIdentity>
    where
        R: XrRuntime + ?Sized,
    {
        if self.system.is_none() {
            let system_id = runtime.system(self.handle, form_factor)?;
            let properties = runtime.system_properties(self.handle, system_id)?;
            log::info!(
                "System: {} (vendor {:#x}), max swapchain {}x{}, {} layers, tracking orientation={} position={}",
                properties.system_name,
                properties.vendor_id,
                properties.max_swapchain_image_width,
                properties.max_swapchain_image_height,
                properties.max_layer_count,
                properties.orientation_tracking,
                properties.position_tracking
            );
            self.system = Some(SystemIdentity {
                form_factor,
                system_id,
                properties,
            });
        }

        self.system
            .as_ref()
            .ok_or(EngineError::ContractViolation("system identity missing"))
    }

    /// Destroy the debug messenger and the instance.
    ///
    /// Must only run once the session is gone; `live_session` is the session
    /// the caller still owns, if any.
    pub fn destroy<R>(self, runtime: &mut R, live_session: Option<SessionHandle>) -> EngineResult<()>
    where
        R: XrRuntime + ?Sized,
    {
        if live_session.is_some() {
            return Err(EngineError::ContractViolation(
                "instance destroyed while a session is alive",
            ));
        }
        if self.debug_messenger {
            runtime.destroy_debug_messenger(self.handle)?;
        }
        runtime.destroy_instance(self.handle)
    }
}
