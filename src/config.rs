//! Response configuration.

use std::collections::BTreeMap;

use no_panic::no_panic;
use url::Url;

use crate::error::Error;
use crate::format::Format;

/// Server and format settings passed along with a response.
///
/// Keys are setting names such as `format_tsv_null_representation`.
pub type Settings = BTreeMap<String, String>;

/// Setting that overrides how NULL is spelled in tab separated output.
pub const TSV_NULL_REPRESENTATION: &str = "format_tsv_null_representation";

/// Configuration a response is read with.
#[derive(Debug, Clone)]
pub struct Config {
    /// Format of the response body.
    ///
    /// Default: `Format::TabSeparated`
    pub format: Format,

    /// Settings forwarded to the processor.
    ///
    /// Default: `{}`
    pub settings: Settings,

    /// Capacity of the read buffer used by processors.
    ///
    /// Default: `8192`
    pub buffer_size: usize,
}

impl Default for Config {
    #[no_panic]
    fn default() -> Self {
        Self {
            format: Format::TabSeparated,
            settings: BTreeMap::new(),
            buffer_size: 8192,
        }
    }
}

impl Config {
    /// Create a configuration for the given format.
    pub fn with_format(format: Format) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

impl TryFrom<&Url> for Config {
    type Error = Error;

    /// Read the response configuration from a ClickHouse URL.
    ///
    /// Only the scheme and the query parameters are used. Credentials, host,
    /// port and database identify the server the request went to and have no
    /// bearing on how the response body is read, so they are ignored.
    ///
    /// Supported query parameters:
    /// - `format`: any name accepted by [`Format`]'s `FromStr`
    /// - `buffer_size`: read buffer capacity (positive integer)
    ///
    /// Every other query parameter becomes a setting.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["clickhouse", "ch", "http", "https"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'clickhouse://', 'ch://', 'http://' or 'https://', got '{}://'",
                url.scheme()
            )));
        }

        let mut config = Config::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "format" | "default_format" => {
                    config.format = value.parse()?;
                }
                "buffer_size" => {
                    config.buffer_size = match value.parse() {
                        Ok(0) | Err(_) => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid buffer_size: {}",
                                value
                            )));
                        }
                        Ok(n) => n,
                    };
                }
                _ => {
                    config.settings.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(config)
    }
}

impl TryFrom<&str> for Config {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}
