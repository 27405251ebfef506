//! Data recorder
//!
//! Rows are accumulated in memory while the loop runs and only written out once it has stopped,
//! so that no file I/O happens inside the loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::path::Path;
use util::archive::{ArchiveError, Archiver};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can record one row of loop data per tick.
pub trait Recorder {
    /// Append a row. The row must have one value per column of the header.
    fn append_row(&mut self, columns: Vec<f64>) -> Result<(), RecorderError>;

    /// Write all recorded rows to the destination.
    fn flush(&mut self, destination: &Path) -> Result<(), RecorderError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// In-memory table of loop data written as CSV.
#[derive(Debug, Clone)]
pub struct DataLog {
    header: Vec<String>,
    rows: Vec<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Row has {found} columns, expected {expected}")]
    RowLength { expected: usize, found: usize },

    #[error(transparent)]
    ArchiveError(#[from] ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DataLog {
    /// Create a new log for the loop data of the given DOFs.
    ///
    /// Columns are the time, then for each DOF in turn the reference, position, velocity,
    /// command torque and raw torque feedback.
    pub fn new<S: AsRef<str>>(dof_names: &[S], expected_rows: usize) -> Self {
        let mut header = vec![String::from("time_s")];

        for (signal, unit) in [
            ("ref", "rad"),
            ("pos", "rad"),
            ("vel", "rads"),
            ("cmd_trq", "nm"),
            ("act_trq", "raw"),
        ]
        .iter()
        {
            for name in dof_names {
                header.push(format!("{}_{}_{}", name.as_ref(), signal, unit));
            }
        }

        Self {
            header,
            rows: Vec::with_capacity(expected_rows),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

impl Recorder for DataLog {
    fn append_row(&mut self, columns: Vec<f64>) -> Result<(), RecorderError> {
        if columns.len() != self.header.len() {
            return Err(RecorderError::RowLength {
                expected: self.header.len(),
                found: columns.len(),
            });
        }

        self.rows.push(columns);
        Ok(())
    }

    fn flush(&mut self, destination: &Path) -> Result<(), RecorderError> {
        let mut arch = Archiver::create(destination)?;

        arch.write_header(&self.header)?;
        for row in self.rows.iter() {
            arch.serialise(row)?;
        }
        arch.flush()?;

        info!(
            "Wrote {} rows of loop data to {}",
            arch.num_records(),
            destination.display()
        );

        Ok(())
    }
}
