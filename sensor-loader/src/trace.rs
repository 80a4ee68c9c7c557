//! Recorded accelerometer traces.

use motion_monitor::prelude::v1::*;
use nalgebra as na;
use std::io::Read;

/// Replays `x,y,z` rows from a reader, one row per sensor read.
///
/// A leading header row is skipped if it does not parse as numbers. End of input is reported as
/// a read failure, just like an unplugged device would be.
pub struct TraceSource<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
    rows: usize,
}

impl<R: Read> TraceSource<R> {
    pub fn new(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Self {
            reader,
            record: csv::StringRecord::new(),
            rows: 0,
        }
    }

    /// Number of rows consumed so far, including a skipped header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn parse_record(&self) -> Result<Axes> {
        if self.record.len() != 3 {
            return Err(anyhow!(
                "expected 3 columns, found {}",
                self.record.len()
            ));
        }

        let mut axes = [0.0; 3];

        for (out, field) in axes.iter_mut().zip(self.record.iter()) {
            *out = field
                .parse()
                .with_context(|| format!("invalid axis value `{field}`"))?;
        }

        Ok(na::Vector3::from(axes))
    }
}

impl<R: Read + Send> SensorSource for TraceSource<R> {
    fn read_axes(&mut self) -> Result<Axes> {
        loop {
            if !self.reader.read_record(&mut self.record)? {
                return Err(anyhow!("end of trace after {} rows", self.rows));
            }

            self.rows += 1;

            match self.parse_record() {
                Ok(axes) => return Ok(axes),
                // Header row.
                Err(_) if self.rows == 1 => continue,
                Err(e) => return Err(e.context(format!("row {}", self.rows))),
            }
        }
    }
}
