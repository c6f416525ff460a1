//! Slot definition tooling
//!
//! Usage:
//!   rf-slot-gen validate <definition>      - Check a definition
//!   rf-slot-gen generate <definition>      - Generate strips into the definition
//!   rf-slot-gen simulate <definition>      - Monte-Carlo RTP report
//!   rf-slot-gen paytable <definition>      - Print the pay table
//!   rf-slot-gen play <definition>          - Play rounds headless and export the trace

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rf_slot_engine::{
    MemoryPersistence, PayTable, ReportSort, Simulator, Slot, SlotDefinition, SlotServices,
    SpinTiming, SymbolSort, generate_strips,
};

#[derive(Parser)]
#[command(name = "rf-slot-gen", about = "Slot definition tooling")]
struct Cli {
    /// Log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a definition and print its layout
    Validate { definition: PathBuf },
    /// Generate strips and write the definition with them
    Generate {
        definition: PathBuf,
        /// Output file (.json / .yaml), stdout as YAML when absent
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Strip length, overrides `symbols_per_reel`
        #[arg(short, long)]
        length: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Simulate spins and report RTP and hit statistics
    Simulate {
        definition: PathBuf,
        #[arg(short = 'n', long)]
        spins: Option<u64>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value = "profit")]
        sort: ReportOrder,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the pay table
    Paytable {
        definition: PathBuf,
        #[arg(long, value_enum, default_value = "declared")]
        sort: PayOrder,
    },
    /// Play rounds with automatic input
    Play {
        definition: PathBuf,
        #[arg(short, long, default_value_t = 10)]
        rounds: u64,
        #[arg(short, long)]
        seed: Option<u64>,
        /// Resolve every spin as fast as possible
        #[arg(long)]
        instant: bool,
        /// Tick limit per round
        #[arg(long, default_value_t = 100_000)]
        max_ticks: u64,
        /// Write the stage trace as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportOrder {
    Profit,
    Hits,
    Count,
}

impl From<ReportOrder> for ReportSort {
    fn from(order: ReportOrder) -> Self {
        match order {
            ReportOrder::Profit => ReportSort::Profit,
            ReportOrder::Hits => ReportSort::Hits,
            ReportOrder::Count => ReportSort::Count,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PayOrder {
    Declared,
    Name,
    Pay,
}

impl From<PayOrder> for SymbolSort {
    fn from(order: PayOrder) -> Self {
        match order {
            PayOrder::Declared => SymbolSort::Declared,
            PayOrder::Name => SymbolSort::ByName,
            PayOrder::Pay => SymbolSort::ByPay,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log.as_str())).init();

    match cli.command {
        Commands::Validate { definition } => validate(&definition),
        Commands::Generate {
            definition,
            out,
            length,
            seed,
        } => generate(&definition, out.as_deref(), length, seed),
        Commands::Simulate {
            definition,
            spins,
            seed,
            sort,
            json,
        } => simulate(&definition, spins, seed, sort.into(), json),
        Commands::Paytable { definition, sort } => paytable(&definition, sort.into()),
        Commands::Play {
            definition,
            rounds,
            seed,
            instant,
            max_ticks,
            trace,
        } => play(&definition, rounds, seed, instant, max_ticks, trace.as_deref()),
    }
}

fn load(path: &Path) -> Result<SlotDefinition> {
    let definition = SlotDefinition::from_path(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    definition
        .validate()
        .with_context(|| format!("Invalid definition {}", path.display()))?;
    Ok(definition)
}

fn rng_for(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

fn validate(path: &Path) -> Result<()> {
    let definition = load(path)?;
    let config = &definition.config;
    let symbols = definition.symbol_set()?;
    let lines = definition.line_set()?;

    println!("✅ {} is valid", definition.name);
    println!(
        "   {} reels × {} rows ({} hidden above, {} below)",
        config.reel_count, config.rows, config.hidden_top, config.hidden_bottom
    );
    println!("   {} symbols, {} lines ({} enabled)", symbols.len(), lines.len(), lines.enabled_count());
    match &definition.strips {
        Some(strips) => println!("   fixed strips: {:?}", strips.iter().map(Vec::len).collect::<Vec<_>>()),
        None => println!("   strips generated at {} symbols per reel", config.symbols_per_reel),
    }
    Ok(())
}

fn generate(path: &Path, out: Option<&Path>, length: Option<usize>, seed: Option<u64>) -> Result<()> {
    let mut definition = load(path)?;
    let symbols = definition.symbol_set()?;
    let length = length.unwrap_or(definition.config.symbols_per_reel);
    if length < definition.config.layout().total() {
        bail!(
            "Strip length {} is shorter than the {} rows of a reel",
            length,
            definition.config.layout().total()
        );
    }

    let mut rng = rng_for(seed);
    let strips = generate_strips(&symbols, definition.config.reel_count, length, &mut rng);
    let named = strips
        .iter()
        .map(|strip| {
            strip
                .iter()
                .map(|&id| {
                    symbols
                        .get(id)
                        .map(|s| s.name.clone())
                        .with_context(|| format!("Generated unknown symbol {}", id))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    definition.config.symbols_per_reel = length;
    definition = definition.with_strips(named);

    match out {
        Some(out) => {
            let text = match out.extension().and_then(|e| e.to_str()) {
                Some("json") => definition.to_json()?,
                _ => definition.to_yaml()?,
            };
            fs::write(out, text).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("✅ Wrote {} strips to {}", strips.len(), out.display());
        }
        None => print!("{}", definition.to_yaml()?),
    }
    Ok(())
}

fn simulate(path: &Path, spins: Option<u64>, seed: Option<u64>, sort: ReportSort, json: bool) -> Result<()> {
    let definition = load(path)?;
    let spins = spins.unwrap_or(definition.simulation.spins);
    let mut rng = rng_for(seed.or(definition.simulation.seed));

    let simulator = Simulator::from_definition(&definition, &mut rng)?;
    let report = simulator.run(spins, &mut rng);

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("🎰 {}: {} spins\n", definition.name, spins);
    println!("{}", report);
    if sort != ReportSort::Profit {
        println!("By {:?}:", sort);
        for log in report.sorted_symbols(sort) {
            println!("  {:<12} count {:>5}  hits {:>8}  income {:>10}", log.name, log.strip_count, log.hits, log.income);
        }
    }
    Ok(())
}

fn paytable(path: &Path, sort: SymbolSort) -> Result<()> {
    let definition = load(path)?;
    let table = PayTable::new(&definition.symbol_set()?, definition.config.reel_count, sort);
    print!("{}", table);
    Ok(())
}

fn play(
    path: &Path,
    rounds: u64,
    seed: Option<u64>,
    instant: bool,
    max_ticks: u64,
    trace_path: Option<&Path>,
) -> Result<()> {
    let mut definition = load(path)?;
    if instant {
        definition.modes.default.timing = SpinTiming::instant();
        definition.modes.free_spin.timing = SpinTiming::instant();
        definition.modes.bonus.timing = SpinTiming::instant();
    }
    definition.config.auto_start_round = true;

    let services = SlotServices::default().with_persistence(MemoryPersistence::new());
    let mut slot = Slot::new(&definition, services, seed)?;
    slot.activate();

    for round in 1..=rounds {
        let settled = slot.run_until(max_ticks, |s| {
            s.is_idle() || s.info().rounds_completed >= round
        });
        if !settled {
            bail!("Round {} did not reach Idle within {} ticks", round, max_ticks);
        }
        if slot.info().rounds_completed < round {
            slot.play();
        }
        let finished = slot.run_until(max_ticks, |s| s.info().rounds_completed >= round);
        if !finished {
            bail!("Round {} did not complete within {} ticks", round, max_ticks);
        }

        let info = slot.info();
        println!(
            "round {:>4}  mode {:<9}  hits {:>3}  delta {:>+7}  balance {:>8}  free {:>3}  bonus {:>3}",
            round,
            slot.mode().name(),
            info.round_hits,
            info.round_balance,
            info.balance,
            info.free_spins,
            info.bonuses
        );
    }

    if let Some(trace_path) = trace_path {
        let trace = slot
            .take_trace()
            .with_metadata("exported_at", serde_json::json!(chrono::Utc::now().to_rfc3339()))
            .with_metadata("rounds", serde_json::json!(rounds));
        let validation = trace.validate();
        for warning in validation.warnings() {
            log::warn!("Trace: {}", warning);
        }
        fs::write(trace_path, trace.to_json()?)
            .with_context(|| format!("Failed to write {}", trace_path.display()))?;
        println!("✅ Trace with {} events written to {}", trace.len(), trace_path.display());
    }
    Ok(())
}
