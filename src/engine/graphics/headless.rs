use std::ffi::c_void;

use crate::engine::EngineResult;
use crate::engine::graphics::{BackendKind, GraphicsBackend};
use crate::engine::xr::runtime::{SystemIdentity, XrRuntime};

/// Session without graphics (`XR_MND_headless`). There is nothing to bind.
#[derive(Debug, Default)]
pub struct HeadlessBackend;

impl GraphicsBackend for HeadlessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    fn initialize(&mut self, _runtime: &dyn XrRuntime, system: &SystemIdentity) -> EngineResult<()> {
        log::debug!("headless session on system {:?}", system.system_id);
        Ok(())
    }

    fn binding(&self) -> *const c_void {
        std::ptr::null()
    }
}
