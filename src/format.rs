//! Data formats a response body can be encoded in.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Wire format of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Tab separated values with escaping
    #[default]
    TabSeparated,
    /// Tab separated values without escaping
    TabSeparatedRaw,
    /// Tab separated values, first row holds column names
    TabSeparatedWithNames,
    /// Tab separated values, first two rows hold column names and types
    TabSeparatedWithNamesAndTypes,
    /// Little-endian binary rows
    RowBinary,
    /// Little-endian binary rows preceded by a names and types header
    RowBinaryWithNamesAndTypes,
    /// Columnar native format
    Native,
    /// One JSON object per line
    JSONEachRow,
    /// Comma separated values
    CSV,
}

impl Format {
    /// Canonical format name as understood by the server.
    pub fn name(self) -> &'static str {
        match self {
            Format::TabSeparated => "TabSeparated",
            Format::TabSeparatedRaw => "TabSeparatedRaw",
            Format::TabSeparatedWithNames => "TabSeparatedWithNames",
            Format::TabSeparatedWithNamesAndTypes => "TabSeparatedWithNamesAndTypes",
            Format::RowBinary => "RowBinary",
            Format::RowBinaryWithNamesAndTypes => "RowBinaryWithNamesAndTypes",
            Format::Native => "Native",
            Format::JSONEachRow => "JSONEachRow",
            Format::CSV => "CSV",
        }
    }

    /// Returns true for binary formats.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Format::RowBinary | Format::RowBinaryWithNamesAndTypes | Format::Native
        )
    }

    /// Returns true if the body starts with a header describing the columns.
    pub fn has_header(self) -> bool {
        matches!(
            self,
            Format::TabSeparatedWithNames
                | Format::TabSeparatedWithNamesAndTypes
                | Format::RowBinaryWithNamesAndTypes
                | Format::Native
        )
    }

    /// Returns true if the header also carries column types.
    pub fn has_types(self) -> bool {
        matches!(
            self,
            Format::TabSeparatedWithNamesAndTypes
                | Format::RowBinaryWithNamesAndTypes
                | Format::Native
        )
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s {
            "TabSeparated" | "TSV" => Format::TabSeparated,
            "TabSeparatedRaw" | "TSVRaw" => Format::TabSeparatedRaw,
            "TabSeparatedWithNames" | "TSVWithNames" => Format::TabSeparatedWithNames,
            "TabSeparatedWithNamesAndTypes" | "TSVWithNamesAndTypes" => {
                Format::TabSeparatedWithNamesAndTypes
            }
            "RowBinary" => Format::RowBinary,
            "RowBinaryWithNamesAndTypes" => Format::RowBinaryWithNamesAndTypes,
            "Native" => Format::Native,
            "JSONEachRow" => Format::JSONEachRow,
            "CSV" => Format::CSV,
            _ => return Err(Error::InvalidUsage(format!("Unknown format: {}", s))),
        };
        Ok(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!("TSV".parse::<Format>().unwrap(), Format::TabSeparated);
        assert_eq!(
            "TSVWithNamesAndTypes".parse::<Format>().unwrap(),
            Format::TabSeparatedWithNamesAndTypes
        );
        assert!("tsv".parse::<Format>().is_err());
    }

    #[test]
    fn test_header_flags() {
        assert!(!Format::TabSeparated.has_header());
        assert!(Format::TabSeparatedWithNames.has_header());
        assert!(!Format::TabSeparatedWithNames.has_types());
        assert!(Format::RowBinaryWithNamesAndTypes.has_types());
        assert!(Format::RowBinary.is_binary());
        assert_eq!(Format::RowBinary.to_string(), "RowBinary");
    }
}
