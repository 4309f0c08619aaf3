use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unable to read trace file '{}': {source}", .path.display())]
    TraceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    TraceFormat(#[from] TraceFormatError),
}

/// A trace line that does not match the event grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line_number}: malformed trace event '{line}'\n{reason}")]
pub struct TraceFormatError {
    /// 1-based line number in the trace.
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}
