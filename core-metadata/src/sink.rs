//! Output sink
//!
//! Writes one result item's raw bytes to a named destination: `null`,
//! `stdout`, `stderr` (case-insensitive) or a file path.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use core_runtime::logging::strip_path;
use tracing::{debug, warn};

use crate::cache::ResultItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Discard, report zero bytes
    Null,
    Stdout,
    Stderr,
    /// Created or truncated
    File(PathBuf),
}

impl OutputTarget {
    pub fn parse(destination: &str) -> Self {
        if destination.eq_ignore_ascii_case("null") {
            Self::Null
        } else if destination.eq_ignore_ascii_case("stdout") {
            Self::Stdout
        } else if destination.eq_ignore_ascii_case("stderr") {
            Self::Stderr
        } else {
            Self::File(PathBuf::from(destination))
        }
    }
}

impl From<&str> for OutputTarget {
    fn from(destination: &str) -> Self {
        Self::parse(destination)
    }
}

/// Write `item` to `destination`.
///
/// Returns the number of payload bytes written, or `None` when the
/// destination could not be written (a warning is logged). The trailing
/// newline added for the standard streams is not counted.
pub fn write_out(item: &ResultItem, destination: &str) -> Option<usize> {
    write_to(item, &OutputTarget::parse(destination))
}

pub fn write_to(item: &ResultItem, target: &OutputTarget) -> Option<usize> {
    let result = match target {
        OutputTarget::Null => Ok(0),
        OutputTarget::Stdout => write_stream(&mut io::stdout().lock(), &item.data),
        OutputTarget::Stderr => write_stream(&mut io::stderr().lock(), &item.data),
        OutputTarget::File(path) => write_file(path, &item.data),
    };

    match result {
        Ok(written) => {
            debug!(source = %item.source, bytes = written, "Wrote item");
            Some(written)
        }
        Err(err) => {
            let destination = match target {
                OutputTarget::File(path) => strip_path(&path.to_string_lossy()).to_string(),
                other => format!("{:?}", other).to_lowercase(),
            };
            warn!(destination = %destination, error = %err, "Unable to write item");
            None
        }
    }
}

fn write_stream(stream: &mut impl Write, data: &[u8]) -> io::Result<usize> {
    stream.write_all(data)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(data.len())
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<usize> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(data.len())
}
