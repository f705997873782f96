//! mission-sim: fly a scripted launch headless and report the outcome.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mission_sim::config::CooldownClock;
use mission_sim::dynamics::Controls;
use mission_sim::gnc::{presets, MissionScript};
use mission_sim::io::{writer_for_path, write_summary_file, FlightRecorder, FlightSummary};
use mission_sim::safety::faults::lookup;
use mission_sim::safety::{Trigger, FAULT_CATALOG};
use mission_sim::transport::{self, VesselRecord};
use mission_sim::{SimConfig, SimEvent};

#[derive(Parser, Debug)]
#[command(name = "mission-sim")]
#[command(about = "Staged launch vehicle simulation with mission scripting and range safety")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fly a mission to completion or until the time limit
    Run(RunArgs),
    /// Parse a mission script and list any rejected lines
    Check {
        /// Script file
        file: PathBuf,
    },
    /// List built-in mission scripts and injectable faults
    List,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Built-in mission script
    #[arg(long, default_value = "orbital")]
    preset: String,

    /// Mission script file (overrides --preset)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Mission time limit, s
    #[arg(long, default_value_t = 900.0)]
    duration: f64,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Arm a fault as ID@SECONDS, e.g. engine-flameout@42
    #[arg(long = "fault", value_parser = parse_fault)]
    faults: Vec<(String, f64)>,

    /// Write per-tick telemetry CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Keep every Nth tick in the telemetry
    #[arg(long, default_value_t = 10)]
    decimate: usize,

    /// Write a JSON flight summary (`-` for stdout)
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn parse_fault(s: &str) -> Result<(String, f64), String> {
    let (id, at) = s.split_once('@').ok_or_else(|| format!("expected ID@SECONDS, got '{s}'"))?;
    if lookup(id).is_none() {
        return Err(format!("unknown fault '{id}'"));
    }
    let at: f64 = at.parse().map_err(|_| format!("bad time '{at}'"))?;
    if !(at >= 0.0) {
        return Err(format!("fault time must be non-negative, got {at}"));
    }
    Ok((id.to_string(), at))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(false)).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check { file } => check(&file),
        Commands::List => {
            list();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn load_script(args: &RunArgs) -> Result<(String, String)> {
    match &args.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("script").to_string();
            Ok((name, text))
        }
        None => match presets::preset(&args.preset) {
            Some(text) => Ok((args.preset.to_lowercase(), text.to_string())),
            None => bail!(
                "unknown preset '{}' (available: {})",
                args.preset,
                presets::names().collect::<Vec<_>>().join(", ")
            ),
        },
    }
}

/// Flight is over once the tracked vessel is gone, wrecked, or resting on
/// the pad with the engine cold.
fn flight_over(time: f64, v: &VesselRecord, ground_y: f64) -> bool {
    let landed = time > 1.0 && ground_y - v.y < 0.5 && v.vx.hypot(v.vy) < 0.5 && v.throttle == 0.0;
    !v.active || v.crashed || landed
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    // Headless runs outpace the wall clock; debounce staging on mission time.
    config.cooldown_clock = CooldownClock::Mission;
    let (width, ground_y, dt) = (config.width, config.ground_y, config.fixed_dt);

    let (name, text) = load_script(&args)?;
    let mut sim = transport::spawn(config);
    sim.init(width, ground_y).await?;

    let commands = sim.load_script(name.clone(), text).await?.context("script rejected")?;
    info!(script = %name, commands, "mission script loaded");
    for (id, at) in &args.faults {
        sim.arm_fault(id.clone(), Trigger::Timed(*at)).await?;
        info!(fault = %id, at, "fault armed");
    }
    if !sim.activate().await? {
        bail!("flight computer refused to start");
    }

    let mut recorder = FlightRecorder::new(ground_y, args.decimate);
    if let Some(path) = &args.csv {
        let writer = writer_for_path(path).with_context(|| format!("opening {}", path.display()))?;
        recorder = recorder.with_sink(writer)?;
    }

    let mut events: Vec<SimEvent> = Vec::new();
    let mut controls = Controls { ignition: true, ..Default::default() };
    let steps = (args.duration / dt).ceil().max(0.0) as usize;
    for _ in 0..steps {
        sim.step(dt, 1.0, controls).await?;
        controls.ignition = false;

        let snapshot = sim.snapshot().await?;
        recorder.record(&snapshot)?;
        for event in sim.drain_events() {
            info!(t = format_args!("{:.2}", event.time), event = %event.kind, vessel = ?event.vessel, "event");
            events.push(event);
        }
        match snapshot.tracked_vessel() {
            Some(v) if !flight_over(snapshot.mission_time, v, ground_y) => {}
            _ => break,
        }
    }

    events.extend(sim.drain_events());
    sim.shutdown().await?;

    let rows = recorder.finish()?;
    let Some(summary) = FlightSummary::from_rows(&rows, &events, Some(name.as_str())) else {
        warn!("nothing recorded");
        return Ok(());
    };
    print_report(&summary);
    if let Some(path) = &args.summary {
        write_summary_file(path, &summary).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn check(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match MissionScript::parse(file.display().to_string(), &text) {
        Ok(script) => {
            println!("{}: {} command(s) OK", file.display(), script.commands.len());
            Ok(())
        }
        Err(errors) => {
            for err in &errors.0 {
                println!("{}:{}", file.display(), err);
            }
            Err(errors.into())
        }
    }
}

fn list() {
    println!("Presets");
    for name in presets::names() {
        println!("  {name}");
    }
    println!();
    println!("Faults");
    for fault in FAULT_CATALOG {
        println!("  {:<20} {:<12} {}", fault.id, fault.category, fault.name);
    }
}

fn print_report(summary: &FlightSummary) {
    println!();
    println!("====================================================================");
    println!("  MISSION REPORT  {}", summary.script.as_deref().unwrap_or("-"));
    println!("====================================================================");
    println!("  Duration:      {:>10.1} s", summary.duration_s);
    println!(
        "  Max altitude:  {:>10.0} m   at t={:.1}s",
        summary.max_altitude_m, summary.max_altitude_time_s
    );
    println!("  Max speed:     {:>10.1} m/s", summary.max_speed_ms);
    println!("  Max skin temp: {:>10.0} K", summary.max_skin_temp_k);
    println!(
        "  Final:         {:>10.0} m   {:.1} m/s   {}   FTS {}",
        summary.final_altitude_m, summary.final_speed_ms, summary.final_kind, summary.final_fts_state
    );
    println!();
    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for event in &summary.events {
        println!("  t={:>7.2}s  {}", event.time, event.kind);
    }
    println!();
}
