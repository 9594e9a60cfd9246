//! Command-line interface for xr-lifecycle.

use std::path::PathBuf;

use clap::Parser;

use crate::engine::graphics::BackendKind;
use crate::engine::windowing::PlatformKind;
use crate::engine::xr::runtime::FormFactor;

/// Negotiate an XR instance, run a session until the runtime ends it, then tear down.
///
/// Examples:
/// - `xr-lifecycle` - headless session with default settings
/// - `xr-lifecycle --backend vulkan --platform winit` - Vulkan binding plus a desktop window
/// - `xr-lifecycle --config xr.json --layer XR_APILAYER_LUNARG_core_validation`
#[derive(Debug, Clone, Parser)]
#[command(name = "xr-lifecycle", version)]
pub struct Cli {
    /// JSON config file. Command-line values override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Graphics backend whose binding the session is created with.
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Platform event source pumped once per tick.
    #[arg(short, long, value_enum)]
    pub platform: Option<PlatformKind>,

    #[arg(long, value_enum)]
    pub form_factor: Option<FormFactor>,

    #[arg(long)]
    pub app_name: Option<String>,

    /// API layer to enable if available (repeatable).
    #[arg(long = "layer")]
    pub layers: Vec<String>,

    /// Instance extension to enable if available (repeatable).
    #[arg(long = "extension")]
    pub extensions: Vec<String>,

    /// Don't request XR_EXT_debug_utils.
    #[arg(long)]
    pub no_debug_utils: bool,

    /// Log filter, e.g. `debug` or `xr_lifecycle=trace`. `RUST_LOG` wins when set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
