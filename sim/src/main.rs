use arena_sim::{format_standings, run, SimConfig};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless arena match between scripted bots", long_about = None)]
struct Args {
    /// Number of teams
    #[arg(short = 't', long, default_value = "3")]
    teams: u32,

    /// Players on each team
    #[arg(
        short = 'p',
        long,
        default_value = "2",
        value_parser = clap::value_parser!(u32).range(1..=255)
    )]
    players_per_team: u32,

    /// Ticks per second
    #[arg(short = 'r', long, default_value = "60")]
    tick_rate: u32,

    /// Stop after this many ticks even without a winner
    #[arg(short = 'm', long, default_value = "18000")]
    max_ticks: u64,

    /// Probability of losing a best-effort packet (0.0 - 1.0)
    #[arg(short = 'l', long, default_value = "0.0")]
    loss: f64,

    /// Seed for bot decisions and packet loss
    #[arg(short = 's', long, default_value = "1")]
    seed: u64,

    /// Disconnect one random peer at this tick
    #[arg(long)]
    leave_after: Option<u64>,

    /// Print the final standings as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.loss) {
        return Err(format!("--loss must be between 0 and 1, got {}", args.loss).into());
    }
    if args.tick_rate == 0 {
        return Err("--tick-rate must be positive".into());
    }

    let config = SimConfig {
        teams: args.teams,
        players_per_team: args.players_per_team,
        tick_rate: args.tick_rate,
        max_ticks: args.max_ticks,
        loss: args.loss,
        seed: args.seed,
        leave_after: args.leave_after,
        ..SimConfig::default()
    };

    info!("Starting simulation...");
    info!(
        "{} teams x {} players at {} Hz, loss {:.0}%",
        config.teams,
        config.players_per_team,
        config.tick_rate,
        config.loss * 100.0
    );

    let report = run(config).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.standings)?);
    } else {
        print!("{}", format_standings(&report));
    }

    Ok(())
}
