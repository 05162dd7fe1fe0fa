mod config;
mod console;

use clap::Parser;
use snake_common::games::SessionManager;
use snake_common::logger::{self, LogTarget};
use snake_common::log;
use tokio::io::BufReader;

use console::{ConsoleDisplay, ConsoleHost};

#[derive(Parser)]
#[command(name = "snake_bot")]
struct Args {
    /// Bot configuration file, created with defaults when missing.
    #[arg(long, default_value = "snake_bot_config.yaml")]
    config: String,

    #[arg(long)]
    use_log_prefix: bool,

    /// Log per-turn engine, render and display timings.
    #[arg(long)]
    perf_timing: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_manager = config::get_config_manager(&args.config);
    let config = config_manager.load_or_create()?;

    let prefix = if args.use_log_prefix {
        Some(config.log_prefix.clone().unwrap_or_else(|| "SnakeBot".to_string()))
    } else {
        config.log_prefix.clone()
    };
    logger::init_logger(prefix, LogTarget::Stderr);
    log!("Loaded config from {}", args.config);

    let mut settings = config.snake.to_session_settings();
    settings.perf_timing |= args.perf_timing;

    let display = ConsoleDisplay::new(tokio::io::stdout());
    let manager = SessionManager::new(settings, display.clone());
    let host = ConsoleHost::new(
        manager,
        display,
        config.snake.default_width,
        config.snake.default_height,
    );

    log!("Snake bot ready, reading commands from stdin");
    let reports = host.run(BufReader::new(tokio::io::stdin())).await?;

    let total_score: u32 = reports.iter().map(|r| r.score).sum();
    log!(
        "Snake bot shut down after {} games, total score {}",
        reports.len(),
        total_score
    );

    Ok(())
}
