use arm_rig::cli::CliOverrides;
use arm_rig::run_with_overrides;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "arm_rig=info,wgpu=warn,naga=warn,wgpu_core=warn,wgpu_hal=warn";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path = cli.config_path().to_path_buf();
    if let Err(err) = run_with_overrides(&config_path, cli.into_config_overrides()) {
        tracing::error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
