use super::builder::ReaderError;
use itertools::Itertools;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// How the first row of a file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Row 1 is data.
    #[default]
    None,
    /// Row 1 is a header and is skipped; rows stay positional.
    Ignore,
    /// Row 1 is a header and names the columns of every following row.
    Use,
}

impl HeaderMode {
    pub const ALL: [HeaderMode; 3] = [HeaderMode::None, HeaderMode::Ignore, HeaderMode::Use];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ignore => "ignore",
            Self::Use => "use",
        }
    }

    /// Whether opening the file consumes row 1.
    #[inline]
    pub fn consumes_header_row(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether row 1 becomes the derived column names.
    #[inline]
    pub fn names_columns(self) -> bool {
        matches!(self, Self::Use)
    }

    pub(crate) fn allowed() -> String {
        Self::ALL.iter().map(|mode| mode.as_str()).join("|")
    }
}

impl FromStr for HeaderMode {
    type Err = ReaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| ReaderError::InvalidHeaderMode(value.to_string()))
    }
}

impl fmt::Display for HeaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reader options in their loosely-typed form, as they would arrive from a
/// configuration file.
///
/// Every field has a default, so a partial document deserializes. Values are
/// validated by [`RowReaderBuilder::from_config`](super::RowReaderBuilder::from_config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    pub header_mode: String,
    pub delimiter: String,
    pub quote: String,
    pub max_row_bytes: i64,
    pub custom_headers: Vec<String>,
    pub trim: bool,
    pub lossy: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            header_mode: HeaderMode::None.as_str().to_string(),
            delimiter: ",".to_string(),
            quote: "\"".to_string(),
            max_row_bytes: 0,
            custom_headers: Vec::new(),
            trim: false,
            lossy: false,
        }
    }
}

/// Interprets `value` as a single-byte separator or quote character.
pub(crate) fn single_byte(value: &str) -> Option<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Some(*byte),
        _ => None,
    }
}
