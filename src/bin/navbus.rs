use clap::{App, Arg};
use colored::*;
use navbus::plugins::{Clock, StopAfter};
use navbus::{Bus, Core, GnssSystem, Phase};
use serde::Serialize;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn, Level};

const DEFAULT_MAX_TICKS: &str = "1000";
const DEFAULT_PERIOD_MS: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
    Compact,
}

impl OutputFormat {
    fn parse(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            "compact" => OutputFormat::Compact,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Debug, Serialize)]
struct TickReport {
    t: f64,
    mode: i32,
    phase: Phase,
    imu: bool,
    gnss: bool,
    constellations: usize,
}

impl TickReport {
    fn from_bus(bus: &Bus<'_>) -> Self {
        Self {
            t: bus.t,
            mode: bus.mode,
            phase: bus.phase(),
            imu: bus.imu.is_some(),
            gnss: bus.gnss.is_some(),
            constellations: bus.gnss.as_ref().map_or(0, |gnss| gnss.constellations().count()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("navbus")
        .version("0.1.0")
        .author("Navigation Systems Engineering Team")
        .about("🧭 Navigation bus host - runs the plugin schedule over a configured bus")
        .arg(
            Arg::with_name("config")
                .help("Bus configuration file")
                .value_name("CONFIG")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("ticks")
                .short("n")
                .long("ticks")
                .value_name("TICKS")
                .help("Terminate from the host after this many ticks")
                .takes_value(true)
                .default_value(DEFAULT_MAX_TICKS)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Tick count must be a valid number".into()),
                }),
        )
        .arg(
            Arg::with_name("period")
                .short("p")
                .long("period-ms")
                .value_name("MILLISECONDS")
                .help("Real-time tick period (0 runs as fast as possible)")
                .takes_value(true)
                .default_value(DEFAULT_PERIOD_MS)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Period must be a valid number".into()),
                }),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Per-tick output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let path = matches.value_of("config").ok_or("missing configuration file")?;
    let max_ticks: u64 = matches.value_of("ticks").unwrap_or(DEFAULT_MAX_TICKS).parse()?;
    let period_ms: u64 = matches.value_of("period").unwrap_or(DEFAULT_PERIOD_MS).parse()?;
    let format = OutputFormat::parse(matches.value_of("format").unwrap_or("table"));

    let config = std::fs::read_to_string(path)?;

    let mut core = Core::new();
    core.init(&config)?;
    let common = core.bus().and_then(|bus| bus.common_config);

    let clock = core.register(Clock::from_config(common));
    core.add_plugin(clock)?;
    if let Some(stop) = StopAfter::from_config(common) {
        let stop = core.register(stop);
        core.add_plugin(stop)?;
    }
    let reporter = core.register_plugin("reporter", move |ctx| print_tick(ctx.bus, format));
    core.add_plugin(reporter)?;

    if let Some(bus) = core.bus() {
        print_banner(path, bus);
    }

    let mut interval = (period_ms > 0).then(|| time::interval(Duration::from_millis(period_ms)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticks = 0u64;
    loop {
        if let Some(interval) = interval.as_mut() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut ctrl_c => {
                    warn!("interrupted, terminating");
                    core.terminate()?;
                    break;
                }
            }
        }

        if !core.step() {
            break;
        }
        ticks += 1;

        if ticks >= max_ticks {
            info!(ticks, "host tick limit reached");
            core.terminate()?;
            break;
        }
    }

    let stats = core.get_stats();
    let origin = if core.host_termination() { "host" } else { "plugin" };
    println!(
        "{} {} ticks, {} plugin calls, {} skipped ({}-initiated shutdown)",
        "🛑".red(),
        stats.ticks.to_string().bright_white(),
        stats.invocations.to_string().bright_cyan(),
        stats.skipped,
        origin
    );

    Ok(())
}

fn print_banner(path: &str, bus: &Bus<'_>) {
    println!("{} {}", "🧭".green(), "Navigation bus initialized".bright_green());
    println!("   Config: {}", path.bright_white());
    let mark = |present: bool| if present { "✓".green() } else { "-".dimmed() };
    println!("   IMU:  {}", mark(bus.imu.is_some()));
    println!("   GNSS: {}", mark(bus.gnss.is_some()));
    if let Some(gnss) = &bus.gnss {
        for system in GnssSystem::ALL {
            let present = gnss.constellation(system).is_some();
            println!("     {} {}", mark(present), system.subsystem_id().name());
        }
    }
    let names: Vec<&str> = bus.present_subsystems().iter().map(|id| id.name()).collect();
    info!(subsystems = %names.join(","), "bus layout");
}

fn print_tick(bus: &Bus<'_>, format: OutputFormat) {
    let report = TickReport::from_bus(bus);
    match format {
        OutputFormat::Json => match serde_json::to_string(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("failed to encode tick report: {}", e),
        },
        OutputFormat::Table => {
            let phase = match report.phase {
                Phase::Initializing => "INIT".yellow(),
                Phase::Running => "RUN".green(),
                Phase::Terminating => "TERM".red(),
            };
            println!(
                "│ t {:>10.3} │ mode {:>3} │ {:<4} │ imu {} │ gnss {} ({}) │",
                report.t, report.mode, phase, report.imu as u8, report.gnss as u8, report.constellations
            );
        }
        OutputFormat::Compact => println!("{:.3} {}", report.t, report.mode),
    }
}
