//! Time-step symbols.
//!
//! Every encoded song is a sequence of symbols, one per time step. The text
//! form of a symbol is the token written to the corpus file.

use std::fmt;
use std::str::FromStr;

/// Token for a rest onset.
pub const REST_TOKEN: &str = "r";

/// Token for "previous event continues".
pub const HOLD_TOKEN: &str = "_";

/// Token separating songs and ending a generated melody.
pub const DELIMITER_TOKEN: &str = "/";

/// One encoded time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Onset of a note, MIDI pitch number.
    Pitch(u8),
    /// Onset of a rest.
    Rest,
    /// The previous note or rest continues.
    Hold,
    /// Song boundary / end of sequence.
    Delimiter,
}

impl Symbol {
    /// Returns true for symbols that start a new event.
    pub fn is_onset(&self) -> bool {
        matches!(self, Symbol::Pitch(_) | Symbol::Rest)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Pitch(p) => write!(f, "{}", p),
            Symbol::Rest => f.write_str(REST_TOKEN),
            Symbol::Hold => f.write_str(HOLD_TOKEN),
            Symbol::Delimiter => f.write_str(DELIMITER_TOKEN),
        }
    }
}

/// Error returned when a token is not a valid symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSymbolError(pub String);

impl fmt::Display for ParseSymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid symbol token '{}'", self.0)
    }
}

impl std::error::Error for ParseSymbolError {}

impl FromStr for Symbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REST_TOKEN => Ok(Symbol::Rest),
            HOLD_TOKEN => Ok(Symbol::Hold),
            DELIMITER_TOKEN => Ok(Symbol::Delimiter),
            _ => match s.parse::<u8>() {
                Ok(p) if p <= 127 => Ok(Symbol::Pitch(p)),
                _ => Err(ParseSymbolError(s.to_string())),
            },
        }
    }
}

/// Parses a whitespace-separated token string into symbols.
pub fn parse_symbols(text: &str) -> Result<Vec<Symbol>, ParseSymbolError> {
    text.split_whitespace().map(str::parse).collect()
}

/// Joins symbols into a single space-separated string.
pub fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_tokens() {
        assert_eq!(Symbol::Pitch(60).to_string(), "60");
        assert_eq!(Symbol::Rest.to_string(), "r");
        assert_eq!(Symbol::Hold.to_string(), "_");
        assert_eq!(Symbol::Delimiter.to_string(), "/");
    }

    #[test]
    fn parse_tokens() {
        assert_eq!("67".parse::<Symbol>(), Ok(Symbol::Pitch(67)));
        assert_eq!("r".parse::<Symbol>(), Ok(Symbol::Rest));
        assert!("128".parse::<Symbol>().is_err());
        assert!("-1".parse::<Symbol>().is_err());
        assert!("x".parse::<Symbol>().is_err());
    }

    #[test]
    fn parse_and_join() {
        let symbols = parse_symbols("60 _ 62 _ r _ /").unwrap();
        assert_eq!(symbols.len(), 7);
        assert!(symbols[0].is_onset());
        assert!(!symbols[1].is_onset());
        assert_eq!(join_symbols(&symbols), "60 _ 62 _ r _ /");
    }
}
