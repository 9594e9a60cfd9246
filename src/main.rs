mod engine;
mod utils;

use engine::cli::Cli;
use engine::config::AppConfig;
use engine::graphics::create_backend;
use engine::windowing::create_platform;
use engine::xr::openxr_runtime::OpenXrRuntime;
use engine::EngineResult;

fn run(cli: &Cli) -> EngineResult<()> {
    let config = AppConfig::from_cli(cli)?;
    log::debug!("{config:?}");

    // Declared before the runtime so it is dropped after it.
    let mut backend = create_backend(config.backend)?;
    let mut platform = create_platform(&config)?;
    let mut runtime = OpenXrRuntime::load()?;

    let summary = engine::xr::run(&mut runtime, backend.as_mut(), platform.as_mut(), &config)?;
    log::info!(
        "Done: {} ticks, {} frames, {} events, final state {:?}",
        summary.ticks,
        summary.frames,
        summary.events,
        summary.final_state
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    utils::logger::init(&cli.log_level);

    if let Err(e) = run(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
