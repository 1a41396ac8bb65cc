use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use darepot::GameConfig;
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{
        RollingFileAppender,
        Rotation,
    },
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

#[derive(Parser, Debug)]
#[command(version, about = "Jack'o Darepot, the cursed game picker", long_about = None)]
struct Args {
    /// Directory holding players.json, games.json, challenges.json and messages.json
    #[arg(long, default_value = "data", conflicts_with = "demo")]
    data_dir: PathBuf,

    #[arg(long, default_value = ".darepot/state.json")]
    state_file: PathBuf,

    /// JSON file overriding reel timings and curse rules
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = ".darepot/logs")]
    log_dir: PathBuf,

    /// Spin over generated players and a small built-in catalog
    #[arg(long)]
    demo: bool,

    #[arg(long, default_value_t = 6)]
    demo_players: usize,
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

// Logs go to a file; stdout belongs to the terminal UI.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("darepot")
        .filename_suffix("log")
        .build(log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _guard = init_tracing(&expand(&args.log_dir))?;

    let game = match &args.config {
        Some(path) => GameConfig::load(expand(path))
            .wrap_err_with(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let pools = if args.demo {
        client::PoolSource::Demo {
            players: args.demo_players,
        }
    } else {
        client::PoolSource::Directory(expand(&args.data_dir))
    };
    info!(?pools, seed = ?args.seed, "starting darepot");

    client::run_app(client::AppConfig {
        game,
        pools,
        state_file: expand(&args.state_file),
        seed: args.seed,
    })
    .await
}
