use super::{
    config::{single_byte, HeaderMode, ReaderConfig},
    record_reader::RowReader,
    source::{self, Dialect},
};
use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Broad category of a [`ReaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration value was rejected.
    InvalidArgument,
    /// The source path does not name an existing regular file.
    NotFound,
    /// Opening or reading the file failed.
    Io,
    /// The file contents could not be decoded.
    InvalidData,
}

/// Errors that can occur when building or driving a RowReader
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error(
        "Invalid header mode {0:?}, expected one of {allowed}",
        allowed = HeaderMode::allowed()
    )]
    InvalidHeaderMode(String),
    #[error("Invalid delimiter {0:?}: must be a single ASCII character")]
    InvalidDelimiter(String),
    #[error("Invalid quote character {0:?}: must be a single ASCII character")]
    InvalidQuote(String),
    #[error("Invalid row byte limit {0}: must be a non-negative integer")]
    InvalidRowLimit(i64),
    #[error("Failed to open file {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read CSV record: {0}")]
    CsvParse(#[from] csv::Error),
    #[error("Invalid UTF-8 in row {ordinal}")]
    InvalidUtf8 { ordinal: u64 },
}

impl ReaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHeaderMode(_)
            | Self::InvalidDelimiter(_)
            | Self::InvalidQuote(_)
            | Self::InvalidRowLimit(_) => ErrorKind::InvalidArgument,
            Self::FileNotFound(_) | Self::NotAFile(_) => ErrorKind::NotFound,
            Self::FileOpen { .. } => ErrorKind::Io,
            Self::CsvParse(err) if err.is_io_error() => ErrorKind::Io,
            Self::CsvParse(_) | Self::InvalidUtf8 { .. } => ErrorKind::InvalidData,
        }
    }

    pub(crate) fn from_open(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::FileOpen {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Builder for configuring and creating a RowReader instance.
///
/// This struct provides a fluent interface for setting up parsing options.
/// Nothing touches the filesystem until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RowReaderBuilder {
    path: PathBuf,
    header_mode: HeaderMode,
    delimiter: u8,
    quote_char: u8,
    trim: csv::Trim,
    max_row_bytes: usize,
    lossy: bool,
    custom_headers: Vec<String>,
}

impl RowReaderBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            header_mode: HeaderMode::None,
            delimiter: b',',
            quote_char: b'"',
            trim: csv::Trim::None,
            max_row_bytes: 0,
            lossy: false,
            custom_headers: Vec::new(),
        }
    }

    /// Creates a builder from loosely-typed options, rejecting invalid values.
    pub fn from_config(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self, ReaderError> {
        let header_mode = config.header_mode.parse::<HeaderMode>()?;
        let delimiter = single_byte(&config.delimiter)
            .ok_or_else(|| ReaderError::InvalidDelimiter(config.delimiter.clone()))?;
        let quote_char = single_byte(&config.quote)
            .ok_or_else(|| ReaderError::InvalidQuote(config.quote.clone()))?;
        let max_row_bytes = usize::try_from(config.max_row_bytes)
            .map_err(|_| ReaderError::InvalidRowLimit(config.max_row_bytes))?;

        Ok(Self::new(path)
            .header_mode(header_mode)
            .delimiter(delimiter)
            .quote_char(quote_char)
            .trim(if config.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .max_row_bytes(max_row_bytes)
            .lossy(config.lossy)
            .custom_headers(config.custom_headers.clone()))
    }

    /// Sets how row 1 is treated.
    #[must_use]
    pub fn header_mode(mut self, header_mode: HeaderMode) -> Self {
        self.header_mode = header_mode;
        self
    }

    /// Sets the delimiter character.
    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the quote character.
    #[must_use]
    pub fn quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Sets the trimming mode for fields.
    #[must_use]
    pub fn trim(mut self, trim: csv::Trim) -> Self {
        self.trim = trim;
        self
    }

    /// Caps the bytes read per row, line terminator excluded. 0 disables the
    /// cap. The rest of a longer line comes back as the following rows.
    #[must_use]
    pub fn max_row_bytes(mut self, max_row_bytes: usize) -> Self {
        self.max_row_bytes = max_row_bytes;
        self
    }

    #[must_use]
    pub fn lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    #[must_use]
    pub fn custom_headers(mut self, custom_headers: Vec<String>) -> Self {
        self.custom_headers = custom_headers;
        self
    }

    /// Checks the path, opens the file and consumes the header row if the
    /// header mode asks for it.
    pub fn build(self) -> Result<RowReader, ReaderError> {
        source::check_path(&self.path)?;

        let dialect = Dialect {
            delimiter: self.delimiter,
            quote_char: self.quote_char,
            trim: self.trim,
            max_row_bytes: self.max_row_bytes,
        };

        let mut reader = RowReader::open(self.path, dialect, self.lossy, self.header_mode)?;
        if !self.custom_headers.is_empty() {
            reader.set_custom_headers(&self.custom_headers);
        }
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_kind() {
        let err = ReaderError::from_open(
            Path::new("/nope.csv"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ReaderError::FileNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn permission_denied_maps_to_io_kind() {
        let err = ReaderError::from_open(
            Path::new("/locked.csv"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/locked.csv"));
    }

    #[test]
    fn config_rejects_negative_limit() {
        let config = ReaderConfig {
            max_row_bytes: -1,
            ..ReaderConfig::default()
        };
        let err = RowReaderBuilder::from_config("data.csv", &config).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidRowLimit(-1)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn config_rejects_multi_byte_delimiter() {
        let config = ReaderConfig {
            delimiter: "||".to_string(),
            ..ReaderConfig::default()
        };
        let err = RowReaderBuilder::from_config("data.csv", &config).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidDelimiter(_)));
    }

    #[test]
    fn config_rejects_bad_mode_before_touching_the_path() {
        let config = ReaderConfig {
            header_mode: "bogus".to_string(),
            ..ReaderConfig::default()
        };
        let err = RowReaderBuilder::from_config("/does/not/exist.csv", &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn config_carries_options() {
        let config = ReaderConfig {
            header_mode: "use".to_string(),
            delimiter: ";".to_string(),
            max_row_bytes: 64,
            trim: true,
            ..ReaderConfig::default()
        };
        let builder = RowReaderBuilder::from_config("data.csv", &config).unwrap();
        assert_eq!(builder.header_mode, HeaderMode::Use);
        assert_eq!(builder.delimiter, b';');
        assert_eq!(builder.max_row_bytes, 64);
        assert_eq!(builder.trim, csv::Trim::All);
    }
}
