//! Watch an accelerometer and report when the vehicle parks or starts moving.

use clap::*;
use log::*;
use motion_monitor::prelude::v1::{Result, *};
use std::io::BufRead;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// How often the foreground checks on the monitor.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let matches = Command::new("park-monitor")
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON file with monitor settings"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .short('s')
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Override a setting, as NAME=VALUE"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .short('d')
                .takes_value(true)
                .help("Stop after this many seconds"),
        )
        .arg(
            Arg::new("no-prompt")
                .long("no-prompt")
                .short('y')
                .help("Calibrate without waiting for confirmation"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every sample"),
        )
        .arg(
            Arg::new("input")
                .takes_value(true)
                .required(true)
                .help("sim[:seed], -, tcp://host:port, or a .csv trace"),
        )
        .get_matches();

    let filter = if matches.is_present("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let input = matches.value_of("input").unwrap();

    let mut config = match matches.value_of("config") {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };

    for set in matches.values_of("set").into_iter().flatten() {
        let (name, value) = set
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got `{set}`"))?;
        config.set_prop(name.trim(), value)?;
    }

    for (name, prop) in config.props() {
        debug!("{name} = {prop}");
    }

    let duration = matches
        .value_of("duration")
        .map(parse_duration)
        .transpose()?;

    let source = sensor_loader::create_source(input)?;
    let mut monitor = MotionMonitor::new(source, config)?;

    if monitor.threshold().is_none() {
        // Standard input may be the sensor stream itself.
        if !matches.is_present("no-prompt") && input != "-" {
            wait_for_enter()?;
        }
        monitor.calibrate()?;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    monitor.start(
        Callbacks::new()
            .on_parked(|| info!("Car is parked."))
            .on_moving(|| info!("Car is moving.")),
    )?;

    let deadline = duration.map(|d| Instant::now() + d);

    watch(&monitor, &running, deadline);

    // Always join the sampling thread, even if the loop has already failed.
    monitor.stop()
}

fn parse_duration(secs: &str) -> Result<Duration> {
    let secs: f64 = secs
        .parse()
        .with_context(|| format!("invalid duration `{secs}`"))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(anyhow!("duration must be a non-negative number of seconds"));
    }

    Ok(Duration::from_secs_f64(secs))
}

fn load_config(path: &str) -> Result<MonitorConfig> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {path}"))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse {path}"))
}

fn wait_for_enter() -> Result<()> {
    println!("Motion monitor calibrating; please lay the IMU down motionless on a steady table.");
    println!("Press enter to start calibration...");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    Ok(())
}

/// Foreground loop: check on the monitor once per poll interval until told to quit.
fn watch(monitor: &MotionMonitor, running: &AtomicBool, deadline: Option<Instant>) {
    let mut next_poll = Instant::now();

    while running.load(Ordering::SeqCst) && monitor.is_running() {
        let now = Instant::now();

        if deadline.map_or(false, |d| now >= d) {
            info!("Run time elapsed");
            break;
        }

        if now >= next_poll {
            let status = monitor.status();

            if status.state == ParkState::Parked {
                info!("Checking sensors... (avg motion {:.1})", status.avg_motion);
            } else {
                debug!("Moving (avg motion {:.1})", status.avg_motion);
            }

            next_poll = now + POLL_INTERVAL;
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
