//! Common `SensorSource` instance loader.

use motion_monitor::prelude::v1::*;

pub mod sim;
pub mod trace;
pub mod utils;

pub use sim::{SimHandle, SimMode, SimulatedImu};
pub use trace::TraceSource;

/// Create a sensor source depending on the input.
///
/// * `sim` or `sim:<seed>` creates a simulated accelerometer that alternates between lying still
///   and being shaken.
/// * `-` reads `x,y,z` rows from standard input.
/// * `tcp://host:port` reads `x,y,z` rows from a TCP stream. `tcp://@:port` waits for a single
///   incoming connection instead.
/// * Anything ending with `.csv` is replayed as a recorded trace of `x,y,z` rows.
pub fn create_source(input: &str) -> Result<Box<dyn SensorSource>> {
    if input == "sim" || input.starts_with("sim:") {
        let seed = match input.strip_prefix("sim:") {
            Some(seed) => Some(
                seed.parse::<u64>()
                    .with_context(|| format!("invalid simulator seed `{seed}`"))?,
            ),
            None => None,
        };

        let imu = SimulatedImu::new(seed, SimMode::demo_cycle());
        return Ok(Box::new(imu));
    }

    if input == "-" || input.starts_with("tcp://") || input.ends_with(".csv") {
        let reader = utils::open_input(input)?;
        return Ok(Box::new(TraceSource::new(reader)));
    }

    Err(anyhow!(
        "unrecognised sensor input `{input}` (expected sim, -, tcp://host:port or a .csv file)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn simulator_inputs() {
        assert!(create_source("sim").is_ok());
        assert!(create_source("sim:42").is_ok());
        assert!(create_source("sim:forty-two").is_err());
    }

    #[test]
    fn unknown_input_is_rejected() {
        let err = create_source("/dev/i2c-1").err().unwrap();
        assert!(err.to_string().contains("unrecognised"));
    }

    #[test]
    fn missing_trace_file() {
        assert!(create_source("/nonexistent/trace.csv").is_err());
    }

    #[test]
    fn trace_file_replays_rows() {
        let path = std::env::temp_dir().join(format!("sensor-loader-{}.csv", std::process::id()));
        std::fs::write(&path, "x,y,z\n3,4,0\n0,0,2\n").unwrap();

        let mut src = create_source(path.to_str().unwrap()).unwrap();

        assert_approx_eq!(src.read_magnitude().unwrap(), 5.0);
        assert_approx_eq!(src.read_magnitude().unwrap(), 2.0);
        assert!(src.read_magnitude().is_err());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn tcp_stream_replays_rows() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"1,2,2\n").unwrap();
        });

        let mut src = create_source(&format!("tcp://127.0.0.1:{port}")).unwrap();
        assert_approx_eq!(src.read_magnitude().unwrap(), 3.0);

        server.join().unwrap();
    }

    #[test]
    fn trace_drives_monitor_until_exhausted() {
        let mut rows = String::from("x,y,z\n");
        for i in 0..60 {
            rows.push_str(&format!("0,0,{}\n", 16384 + i % 3));
        }

        let config = MonitorConfig {
            tick_interval_ms: 1,
            window_size: 4,
            transition_time_secs: 0.005,
            max_read_failures: 1,
            ..Default::default()
        };
        let source = TraceSource::new(std::io::Cursor::new(rows.into_bytes()));
        let mut monitor = MotionMonitor::new(source, config).unwrap();

        let threshold = monitor.calibrate().unwrap();
        assert!((threshold - 16410.0).abs() < 2.0, "{threshold}");

        monitor.start(()).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while monitor.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        assert!(monitor.is_parked());
        assert_eq!(monitor.status().samples, 56);

        let err = monitor.stop().unwrap_err();
        assert_eq!(
            err.downcast_ref::<MonitorError>(),
            Some(&MonitorError::SensorFault { failures: 1 })
        );
    }
}
