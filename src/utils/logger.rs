use env_logger::{Builder, Env};

/// Install the global logger. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .filter_module("winit", log::LevelFilter::Warn)
        .format_timestamp_millis()
        .try_init();

    if let Err(e) = result {
        log::warn!("logger already initialized: {e}");
    }
}
