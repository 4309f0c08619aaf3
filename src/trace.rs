use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::Lines;

use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, preceded, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::token::take_while;
use winnow::{ModalResult, Parser};

use crate::error::{Error, Result, TraceFormatError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Load,
    Store,
    /// Load followed by a store to the same address.
    Modify,
}

impl Operation {
    pub fn as_char(&self) -> char {
        match self {
            Operation::Load => 'L',
            Operation::Store => 'S',
            Operation::Modify => 'M',
        }
    }
}

/// One data access of a valgrind `--trace-mem` style trace.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub operation: Operation,
    pub address: u64,
    /// Bytes accessed, not used by the simulator.
    pub size: usize,
}

impl TraceEvent {
    pub fn new(operation: Operation, address: u64, size: usize) -> Self {
        Self {
            operation,
            address,
            size,
        }
    }
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            " {} {:x},{}",
            self.operation.as_char(),
            self.address,
            self.size
        )
    }
}

/// A trace file loaded into memory, parsed lazily by [`TraceFile::events`].
#[derive(Debug)]
pub struct TraceFile {
    path: PathBuf,
    contents: String,
}

impl TraceFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| Error::TraceFile {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, contents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events(&self) -> TraceEvents<'_> {
        events(&self.contents)
    }
}

/// Lazily parses the data accesses of `trace`.
///
/// Instruction fetches (`I` in the first column) and blank lines are skipped.
pub fn events(trace: &str) -> TraceEvents<'_> {
    TraceEvents {
        lines: trace.lines().enumerate(),
    }
}

pub struct TraceEvents<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl Iterator for TraceEvents<'_> {
    type Item = std::result::Result<TraceEvent, TraceFormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line_idx, line) = self.lines.next()?;
            if line.starts_with('I') || line.trim().is_empty() {
                continue;
            }

            return Some(event.parse(line).map_err(|e| TraceFormatError {
                line_number: line_idx + 1,
                line: line.to_string(),
                reason: e.to_string(),
            }));
        }
    }
}

fn event(input: &mut &str) -> ModalResult<TraceEvent> {
    terminated(
        (
            preceded(space0, operation),
            preceded(space1, address),
            preceded(
                ','.context(StrContext::Expected(StrContextValue::CharLiteral(','))),
                size,
            ),
        ),
        space0,
    )
    .parse_next(input)
    .map(|(operation, address, size)| TraceEvent::new(operation, address, size))
}

fn operation(input: &mut &str) -> ModalResult<Operation> {
    alt((
        'L'.value(Operation::Load),
        'S'.value(Operation::Store),
        'M'.value(Operation::Modify),
    ))
    .context(StrContext::Label("operation"))
    .context(StrContext::Expected(StrContextValue::Description(
        "one of L (load), S (store), M (modify)",
    )))
    .parse_next(input)
}

fn address(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., ('0'..='9', 'a'..='f', 'A'..='F'))
        .try_map(|s| u64::from_str_radix(s, 16))
        .context(StrContext::Label("address"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a hexadecimal address of at most 64 bits without 0x prefix",
        )))
        .parse_next(input)
}

fn size(input: &mut &str) -> ModalResult<usize> {
    take_while(1.., '0'..='9')
        .try_map(str::parse::<usize>)
        .context(StrContext::Label("size"))
        .parse_next(input)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_all(trace: &str) -> std::result::Result<Vec<TraceEvent>, TraceFormatError> {
        events(trace).collect()
    }

    #[test]
    fn parses_data_accesses() {
        let trace = "I 0400d7d4,8\n M 0421c7f0,4\n L 04f6b868,8\n S 7ff0005c8,8\n";

        assert_eq!(
            parse_all(trace).unwrap(),
            vec![
                TraceEvent::new(Operation::Modify, 0x0421c7f0, 4),
                TraceEvent::new(Operation::Load, 0x04f6b868, 8),
                TraceEvent::new(Operation::Store, 0x7ff0005c8, 8),
            ]
        );
    }

    #[test]
    fn skips_instruction_fetches_regardless_of_content() {
        let trace = "I 0400d7d4,8\nI garbage\nIIII\n\n   \n";

        assert_eq!(parse_all(trace).unwrap(), vec![]);
    }

    #[test]
    fn accepts_missing_indent_and_trailing_whitespace() {
        let trace = "L ffffffffffffffff,1  \r\n\tS ABCDEF,2";

        assert_eq!(
            parse_all(trace).unwrap(),
            vec![
                TraceEvent::new(Operation::Load, u64::MAX, 1),
                TraceEvent::new(Operation::Store, 0xabcdef, 2),
            ]
        );
    }

    #[test]
    fn reports_malformed_line_number() {
        let trace = " L 10,1\nI 20,1\n X 30,1\n L 40,1\n";

        let error = parse_all(trace).unwrap_err();
        assert_eq!(error.line_number, 3);
        assert_eq!(error.line, " X 30,1");
    }

    #[test]
    fn rejects_malformed_events() {
        for line in [
            " L 0x10,1",
            " L 10",
            " L 10,",
            " L10,1",
            " L 10,1 extra",
            " L 1ffffffffffffffff,1",
            " l 10,1",
        ] {
            assert!(parse_all(line).is_err(), "accepted '{line}'");
        }
    }

    #[test]
    fn parsing_is_lazy() {
        let trace = " L 10,1\n bogus\n";
        let mut events = events(trace);

        assert_eq!(
            events.next(),
            Some(Ok(TraceEvent::new(Operation::Load, 0x10, 1)))
        );
        assert!(matches!(events.next(), Some(Err(_))));
        assert_eq!(events.next(), None);
    }

    #[test]
    fn display_matches_trace_format() {
        let event = TraceEvent::new(Operation::Modify, 0x30b080, 4);

        assert_eq!(event.to_string(), " M 30b080,4");
        assert_eq!(parse_all(&event.to_string()).unwrap(), vec![event]);
    }

    #[test]
    fn open_missing_file_fails() {
        let error = TraceFile::open("does/not/exist.trace").unwrap_err();

        assert!(matches!(error, Error::TraceFile { .. }));
    }
}
