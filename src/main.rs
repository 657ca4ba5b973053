use clap::Parser;
use roll_utils::{RollExecutor, RollRequest, RollerConfig};
use sheet_dice_roll::DiceResult;
use std::path::PathBuf;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

/// Roll dice expressions from a character sheet.
#[derive(Parser)]
#[command(name = "sheet-roller", version)]
struct Cli {
    /// TOML config with rng_workers, rng_reseed_s and a [placeholders] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Value substituted for DB in every expression
    #[arg(short, long)]
    bonus_damage: Option<String>,

    /// Print each result as JSON
    #[arg(long)]
    json: bool,

    /// Expressions to roll; read line by line from stdin when empty
    expressions: Vec<String>,
}

fn render(result: &DiceResult, json: bool) -> Option<String> {
    if result.is_empty() {
        return None;
    }
    if json {
        return match serde_json::to_string(result) {
            Ok(s) => Some(s),
            Err(e) => {
                log::error!("unable to serialize result: {}", e);
                None
            }
        };
    }
    Some(match &result.description {
        Some(description) => format!("{} ({})", result.roll, description),
        None => result.roll.to_string(),
    })
}

async fn roll_one(executor: &RollExecutor, cli: &Cli, expression: &str) -> bool {
    let request = RollRequest::text(expression).with_bonus_damage(cli.bonus_damage.as_ref());
    match executor.roll(request).await {
        Ok(result) => {
            if let Some(line) = render(&result, cli.json) {
                println!("{}", line);
            }
            true
        }
        Err(e) => {
            eprintln!("{}: {}", expression, e);
            false
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RollerConfig::load(path),
        None => RollerConfig::default(),
    };
    log::info!(
        "starting {} roll workers, reseeding every {:?}",
        config.rng_workers,
        config.rng_reseed
    );
    let executor = RollExecutor::from_config(&config);

    let mut failed = false;
    if cli.expressions.is_empty() {
        let mut lines = BufReader::new(stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => failed |= !roll_one(&executor, &cli, &line).await,
                Ok(None) => break,
                Err(e) => {
                    log::error!("unable to read stdin: {}", e);
                    failed = true;
                    break;
                }
            }
        }
    } else {
        for expression in cli.expressions.iter() {
            failed |= !roll_one(&executor, &cli, expression).await;
        }
    }

    executor.shutdown().await;
    if failed {
        std::process::exit(1);
    }
}
