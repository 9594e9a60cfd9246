use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

use openxr as xr;
use openxr::sys;

use crate::engine::graphics::{BackendKind, GraphicsBackend};
use crate::engine::xr::enumerate::enumerate_two_call;
use crate::engine::xr::openxr_runtime::{cvt, enumerated, fixed_str};
use crate::engine::xr::runtime::{SystemIdentity, XrRuntime};
use crate::engine::{EngineError, EngineResult};

mod vulkano_state {
    use super::*;

    use vulkano::VulkanLibrary;
    use vulkano::device::{
        Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo, QueueFlags,
    };
    use vulkano::instance::{Instance, InstanceCreateInfo, InstanceExtensions};
    use vulkano::{Handle, VulkanObject};

    fn backend_err(e: impl std::fmt::Display) -> EngineError {
        EngineError::Backend(e.to_string())
    }

    /// Space-separated extension list from one of the XR_KHR_vulkan_enable queries.
    fn extension_list(
        call: &'static str,
        query: sys::pfn::GetVulkanInstanceExtensionsKHR,
        instance: &xr::Instance,
        system: xr::SystemId,
    ) -> EngineResult<Vec<String>> {
        let chars: Vec<c_char> = enumerate_two_call(call, |buf: &mut [c_char]| {
            let mut count = 0u32;
            let out = if buf.is_empty() {
                ptr::null_mut()
            } else {
                buf.as_mut_ptr()
            };
            let result =
                unsafe { query(instance.as_raw(), system, buf.len() as u32, &mut count, out) };
            enumerated(call, result, count)
        })?;
        Ok(fixed_str(&chars)
            .split_ascii_whitespace()
            .map(str::to_owned)
            .collect())
    }

    /// Vulkan objects the runtime renders with. Kept alive as long as the session.
    pub struct VulkanoState {
        pub instance: Arc<Instance>,
        pub device: Arc<Device>,
        pub queue: Arc<Queue>,
        pub physical_device_raw: sys::platform::VkPhysicalDevice,
    }

    impl VulkanoState {
        pub fn new(xr_instance: &xr::Instance, system: xr::SystemId) -> EngineResult<Self> {
            let vulkan_enable = xr_instance
                .exts()
                .khr_vulkan_enable
                .as_ref()
                .ok_or_else(|| backend_err("XR_KHR_vulkan_enable is not enabled on the instance"))?;

            let mut requirements = sys::GraphicsRequirementsVulkanKHR {
                ty: sys::GraphicsRequirementsVulkanKHR::TYPE,
                next: ptr::null_mut(),
                min_api_version_supported: xr::Version::new(0, 0, 0),
                max_api_version_supported: xr::Version::new(0, 0, 0),
            };
            cvt("xrGetVulkanGraphicsRequirementsKHR", unsafe {
                (vulkan_enable.get_vulkan_graphics_requirements)(
                    xr_instance.as_raw(),
                    system,
                    &mut requirements,
                )
            })?;
            let min = requirements.min_api_version_supported;
            log::info!(
                "Runtime supports Vulkan {}.{} to {}.{}",
                min.major(),
                min.minor(),
                requirements.max_api_version_supported.major(),
                requirements.max_api_version_supported.minor()
            );

            let instance_extensions = extension_list(
                "xrGetVulkanInstanceExtensionsKHR",
                vulkan_enable.get_vulkan_instance_extensions,
                xr_instance,
                system,
            )?;
            let device_extensions = extension_list(
                "xrGetVulkanDeviceExtensionsKHR",
                vulkan_enable.get_vulkan_device_extensions,
                xr_instance,
                system,
            )?;
            log::debug!("Vulkan instance extensions required: {instance_extensions:?}");
            log::debug!("Vulkan device extensions required: {device_extensions:?}");

            let library = VulkanLibrary::new().map_err(backend_err)?;
            let instance = Instance::new(
                library,
                InstanceCreateInfo {
                    application_name: Some("xr-lifecycle".to_string()),
                    enabled_extensions: InstanceExtensions::from_iter(
                        instance_extensions.iter().map(String::as_str),
                    ),
                    ..Default::default()
                },
            )
            .map_err(backend_err)?;

            let mut physical_device_raw: sys::platform::VkPhysicalDevice = ptr::null();
            cvt("xrGetVulkanGraphicsDeviceKHR", unsafe {
                (vulkan_enable.get_vulkan_graphics_device)(
                    xr_instance.as_raw(),
                    system,
                    instance.handle().as_raw() as usize as sys::platform::VkInstance,
                    &mut physical_device_raw,
                )
            })?;

            let physical_device = instance
                .enumerate_physical_devices()
                .map_err(backend_err)?
                .find(|pd| pd.handle().as_raw() == physical_device_raw as usize as u64)
                .ok_or_else(|| backend_err("runtime selected a physical device Vulkan does not list"))?;

            let api = physical_device.api_version();
            if (api.major, api.minor) < (u32::from(min.major()), u32::from(min.minor())) {
                return Err(backend_err(format!(
                    "device supports Vulkan {}.{}, runtime needs at least {}.{}",
                    api.major,
                    api.minor,
                    min.major(),
                    min.minor()
                )));
            }

            let queue_family_index = physical_device
                .queue_family_properties()
                .iter()
                .position(|q| q.queue_flags.intersects(QueueFlags::GRAPHICS))
                .ok_or_else(|| backend_err("no graphics queue family"))?
                as u32;

            let (device, mut queues) = Device::new(
                physical_device.clone(),
                DeviceCreateInfo {
                    enabled_extensions: DeviceExtensions::from_iter(
                        device_extensions.iter().map(String::as_str),
                    ),
                    queue_create_infos: vec![QueueCreateInfo {
                        queue_family_index,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            )
            .map_err(backend_err)?;
            let queue = queues
                .next()
                .ok_or_else(|| backend_err("device returned no queue"))?;

            log::info!(
                "Vulkan device: {} (queue family {queue_family_index})",
                physical_device.properties().device_name
            );

            Ok(Self {
                instance,
                device,
                queue,
                physical_device_raw,
            })
        }

        pub fn binding(&self) -> sys::GraphicsBindingVulkanKHR {
            sys::GraphicsBindingVulkanKHR {
                ty: sys::GraphicsBindingVulkanKHR::TYPE,
                next: ptr::null(),
                instance: self.instance.handle().as_raw() as usize as sys::platform::VkInstance,
                physical_device: self.physical_device_raw,
                device: self.device.handle().as_raw() as usize as sys::platform::VkDevice,
                queue_family_index: self.queue.queue_family_index(),
                queue_index: self.queue.queue_index(),
            }
        }
    }
}

/// Vulkan binding through `XR_KHR_vulkan_enable`, with the device built by vulkano.
pub struct VulkanBackend {
    // Declared first so it drops before the objects it points at.
    binding: Option<Box<sys::GraphicsBindingVulkanKHR>>,
    vulkano: Option<vulkano_state::VulkanoState>,
}

impl VulkanBackend {
    pub fn new() -> Self {
        Self {
            binding: None,
            vulkano: None,
        }
    }
}

impl Default for VulkanBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for VulkanBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Vulkan
    }

    fn initialize(&mut self, runtime: &dyn XrRuntime, system: &SystemIdentity) -> EngineResult<()> {
        if self.vulkano.is_some() {
            return Ok(());
        }
        let instance = runtime.openxr_instance().ok_or_else(|| {
            EngineError::Backend("Vulkan binding needs a live OpenXR instance".to_string())
        })?;

        let state = vulkano_state::VulkanoState::new(instance, xr::SystemId::from_raw(system.system_id.0))?;
        self.binding = Some(Box::new(state.binding()));
        self.vulkano = Some(state);
        log::info!("[VulkanBackend] device and graphics binding initialized");
        Ok(())
    }

    fn binding(&self) -> *const c_void {
        self.binding
            .as_deref()
            .map_or(ptr::null(), |b| b as *const sys::GraphicsBindingVulkanKHR as *const c_void)
    }
}
