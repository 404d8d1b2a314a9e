mod simulation;

use clap::Parser;

use simulation::{CityCore, GenStrategy};

#[derive(Parser)]
#[command(name = "city_sim")]
#[command(about = "Grid city simulation with procedural road networks")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.033333")]
    delta: f64,

    /// Seed for reproducible generation
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Map generation strategy: "wfc" or "spline"
    #[arg(long, default_value = "spline")]
    strategy: String,

    /// Number of agents to keep alive
    #[arg(long, default_value = "120")]
    agents: usize,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let strategy = match cli.strategy.as_str() {
        "wfc" => GenStrategy::Wfc,
        "spline" => GenStrategy::Spline,
        other => {
            eprintln!("Error: unknown strategy '{}', expected wfc or spline", other);
            std::process::exit(1);
        }
    };

    println!("Running city simulation headless...");
    println!(
        "Strategy: {:?}, Seed: {}, Ticks: {}, Delta: {}s",
        strategy, cli.seed, cli.ticks, cli.delta
    );
    println!();

    let mut core = CityCore::with_seed(cli.seed);
    core.set_agent_target(cli.agents);
    core.generate(strategy, cli.seed);

    println!("Initial state:");
    core.print_summary();
    core.draw_map();
    println!();

    // Report roughly once per simulated ten seconds.
    let report_every = ((10.0 / cli.delta.max(1e-6)).ceil() as u32).max(1);
    for tick in 1..=cli.ticks {
        core.tick(cli.delta);
        if tick % report_every == 0 || tick == cli.ticks {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f64 * cli.delta
            );
            core.print_summary();
            println!();
        }
        if core.state.is_terminal() {
            break;
        }
    }

    println!("=== Final State ===");
    core.print_summary();
    core.draw_map();
}
