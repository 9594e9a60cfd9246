//! Capability negotiation: which requested API layers and instance extensions
//! the runtime actually offers.

use crate::engine::EngineResult;
use crate::engine::xr::enumerate::enumerate_two_call;
use crate::engine::xr::runtime::XrRuntime;

pub const DEBUG_UTILS_EXTENSION_NAME: &str = "XR_EXT_debug_utils";

/// Owns the canonical requested names. Accepted sets borrow from it.
#[derive(Debug, Clone, Default)]
pub struct CapabilityNegotiator {
    requested_layers: Vec<String>,
    requested_extensions: Vec<String>,
}

/// Outcome of one negotiation, consumed by instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedCapabilities<'a> {
    pub layers: Vec<&'a str>,
    pub extensions: Vec<&'a str>,
    /// Requested extensions the runtime does not advertise.
    pub missing_extensions: Vec<&'a str>,
}

impl AcceptedCapabilities<'_> {
    pub fn accepts_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| *e == name)
    }
}

impl CapabilityNegotiator {
    pub fn new<L, E>(layers: L, extensions: E) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let mut negotiator = Self::default();
        for layer in layers {
            push_unique(&mut negotiator.requested_layers, layer.into());
        }
        for extension in extensions {
            push_unique(&mut negotiator.requested_extensions, extension.into());
        }
        negotiator
    }

    pub fn request_extension(&mut self, name: impl Into<String>) {
        push_unique(&mut self.requested_extensions, name.into());
    }

    #[cfg(test)]
    pub fn requested_extensions(&self) -> &[String] {
        &self.requested_extensions
    }

    /// Enumerate what the runtime offers and intersect it with the request.
    ///
    /// Missing extensions are logged as warnings and left out. Missing layers
    /// are left out without a message.
    pub fn negotiate<R>(&self, runtime: &mut R) -> EngineResult<AcceptedCapabilities<'_>>
    where
        R: XrRuntime + ?Sized,
    {
        let available_layers: Vec<String> = enumerate_two_call("xrEnumerateApiLayerProperties", |buf| {
            runtime.enumerate_api_layers(buf)
        })?;
        let available_extensions: Vec<String> =
            enumerate_two_call("xrEnumerateInstanceExtensionProperties", |buf| {
                runtime.enumerate_instance_extensions(buf)
            })?;

        log::debug!(
            "runtime advertises {} API layers, {} instance extensions",
            available_layers.len(),
            available_extensions.len()
        );

        let (layers, _) = intersect(&self.requested_layers, &available_layers);
        let (extensions, missing_extensions) =
            intersect(&self.requested_extensions, &available_extensions);

        for name in &missing_extensions {
            log::warn!("Failed to find OpenXR instance extension: {name}");
        }

        Ok(AcceptedCapabilities {
            layers,
            extensions,
            missing_extensions,
        })
    }
}

/// Split `requested` into (present in `available`, absent), keeping request order.
pub fn intersect<'a>(requested: &'a [String], available: &[String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut accepted = Vec::new();
    let mut missing = Vec::new();
    for name in requested {
        if available.iter().any(|a| a == name) {
            accepted.push(name.as_str());
        } else {
            missing.push(name.as_str());
        }
    }
    (accepted, missing)
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
