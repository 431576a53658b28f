use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qumara::{
    autopilot::Autopilot,
    config::{ConfigLoader, GameConfig},
    game::GameBuilder,
    persistence::FileStore,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Qumara eco-brick game engine")]
struct Cli {
    /// Path to the game config YAML file
    #[arg(long, global = true, default_value = "configs/default.yaml")]
    config: PathBuf,

    /// Override the RNG seed from the config
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a headless session on the virtual clock
    Simulate {
        /// Virtual time to simulate
        #[arg(long, default_value_t = 120_000)]
        duration_ms: u64,

        /// Let the scripted player drive the session
        #[arg(long)]
        autopilot: bool,

        /// Directory for save files (uses the config value when omitted)
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
    /// Serve the browser UI
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Directory for save files (uses the config value when omitted)
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::new(".").load(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    init_tracing(&config);

    match cli.command {
        Command::Simulate {
            duration_ms,
            autopilot,
            store_dir,
        } => simulate(config, duration_ms, autopilot, store_dir),
        Command::Serve {
            host,
            port,
            store_dir,
        } => {
            let store_dir = store_dir.unwrap_or_else(|| config.storage.dir.clone());
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(web::run(WebServerConfig {
                game: config,
                store_dir,
                host,
                port,
            }))
        }
    }
}

fn init_tracing(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    // A second init in the same process is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn simulate(
    config: GameConfig,
    duration_ms: u64,
    autopilot: bool,
    store_dir: Option<PathBuf>,
) -> Result<()> {
    let store_dir = store_dir.unwrap_or_else(|| config.storage.dir.clone());
    let step_ms = config.frame_interval_ms;
    let mut game = GameBuilder::new(config)
        .with_store(FileStore::new(&store_dir))
        .build()
        .context("Failed to start game")?;
    let mut pilot = autopilot.then(Autopilot::new);

    let mut elapsed = 0;
    let mut tasks_run = 0;
    while elapsed < duration_ms {
        let step = step_ms.min(duration_ms - elapsed);
        if let Some(pilot) = pilot.as_mut() {
            pilot.drive(&mut game);
        }
        tasks_run += game.advance(step).tasks_run;
        elapsed += step;
    }

    let state = game.state();
    let level = game.level();
    info!(duration_ms, tasks_run, "simulation_finished");
    println!(
        "Simulated {} ms: {} bricks sold, S/{} money, {} helpers, {} trash per brick",
        duration_ms, state.bricks_sold_total, state.money, state.helpers, state.trash_per_brick
    );
    println!(
        "Level {} ({}), progress {}%, zones unlocked: {}{}",
        level.number,
        level.title,
        game.progress(),
        game.zones().unlocked_zones().join(", "),
        if state.game_won { " - game won" } else { "" }
    );
    if let Some(pilot) = pilot {
        let stats = pilot.stats();
        println!(
            "Autopilot: {} decisions, {} bricks made, {} sales, {} helpers hired, {} upgrades",
            stats.decisions, stats.bricks_made, stats.sales, stats.helpers_hired, stats.upgrades
        );
    }
    Ok(())
}
