pub mod headless;
pub mod vulkano_backend;

pub use headless::HeadlessBackend;
pub use vulkano_backend::VulkanBackend;

use std::ffi::c_void;

use serde::{Deserialize, Serialize};

use crate::engine::xr::runtime::{SystemIdentity, XrRuntime};
use crate::engine::{EngineError, EngineResult};

/// Graphics APIs a session can be bound to. Chosen once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// No graphics at all (`XR_MND_headless`).
    Headless,
    Vulkan,
    #[value(name = "opengl")]
    OpenGl,
    #[value(name = "opengl-es")]
    #[serde(rename = "opengl_es")]
    OpenGlEs,
    D3d11,
    D3d12,
}

impl BackendKind {
    /// Instance extension the runtime must enable for this API.
    pub fn extension_name(self) -> &'static str {
        match self {
            BackendKind::Headless => "XR_MND_headless",
            BackendKind::Vulkan => "XR_KHR_vulkan_enable",
            BackendKind::OpenGl => "XR_KHR_opengl_enable",
            BackendKind::OpenGlEs => "XR_KHR_opengl_es_enable",
            BackendKind::D3d11 => "XR_KHR_D3D11_enable",
            BackendKind::D3d12 => "XR_KHR_D3D12_enable",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Headless => "headless",
            BackendKind::Vulkan => "Vulkan",
            BackendKind::OpenGl => "OpenGL",
            BackendKind::OpenGlEs => "OpenGL ES",
            BackendKind::D3d11 => "D3D11",
            BackendKind::D3d12 => "D3D12",
        }
    }

    /// Whether the API can exist on the target this binary was built for.
    pub fn valid_for_platform(self) -> bool {
        match self {
            BackendKind::Headless | BackendKind::Vulkan => true,
            BackendKind::OpenGl => !cfg!(target_os = "android"),
            BackendKind::OpenGlEs => cfg!(target_os = "android"),
            BackendKind::D3d11 | BackendKind::D3d12 => cfg!(windows),
        }
    }
}

/// What the session needs from a graphics API.
///
/// The lifecycle code asks for the extension name before negotiation and for
/// the binding at session creation. It never looks inside the binding.
pub trait GraphicsBackend {
    fn kind(&self) -> BackendKind;

    fn extension_name(&self) -> &'static str {
        self.kind().extension_name()
    }

    /// Set up API objects for `system`. Runs after the instance exists and
    /// before the session is created.
    fn initialize(&mut self, runtime: &dyn XrRuntime, system: &SystemIdentity) -> EngineResult<()>;

    /// Entry for the session create-info `next` chain. Valid until the backend is dropped.
    fn binding(&self) -> *const c_void;
}

/// Build the backend selected by configuration.
pub fn create_backend(kind: BackendKind) -> EngineResult<Box<dyn GraphicsBackend>> {
    if !kind.valid_for_platform() {
        return Err(EngineError::UnsupportedBackend(kind.name()));
    }
    match kind {
        BackendKind::Headless => Ok(Box::new(HeadlessBackend)),
        BackendKind::Vulkan => Ok(Box::new(VulkanBackend::new())),
        // No binding implementation for these yet.
        BackendKind::OpenGl | BackendKind::OpenGlEs | BackendKind::D3d11 | BackendKind::D3d12 => {
            Err(EngineError::UnsupportedBackend(kind.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_selected_backend() {
        let headless = create_backend(BackendKind::Headless).unwrap();
        assert_eq!(headless.kind(), BackendKind::Headless);
        assert_eq!(headless.extension_name(), "XR_MND_headless");

        let vulkan = create_backend(BackendKind::Vulkan).unwrap();
        assert_eq!(vulkan.extension_name(), "XR_KHR_vulkan_enable");
        assert!(vulkan.binding().is_null(), "no binding before initialize");
    }

    #[test]
    fn unimplemented_apis_are_rejected() {
        for kind in [BackendKind::OpenGl, BackendKind::OpenGlEs, BackendKind::D3d11, BackendKind::D3d12] {
            assert!(matches!(
                create_backend(kind),
                Err(EngineError::UnsupportedBackend(_))
            ));
        }
    }

    #[test]
    fn kind_round_trips_through_config_names() {
        let kind: BackendKind = serde_json::from_str("\"opengl_es\"").unwrap();
        assert_eq!(kind, BackendKind::OpenGlEs);
        assert_eq!(serde_json::to_string(&BackendKind::D3d11).unwrap(), "\"d3d11\"");
    }
}
