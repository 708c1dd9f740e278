use thiserror::Error;

/// Boxed source for variants that can wrap more than one underlying library error.
type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EtlError {
    /// Transport-level failure: connection error, TLS, or a non-2xx response.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Source,
    },

    /// The payload was fetched but could not be decoded as a table.
    #[error("parse error in {input}: {source}")]
    Parse {
        input: String,
        #[source]
        source: Source,
    },

    /// A required configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The warehouse rejected a dataset or table write.
    #[error("load error for {target}: {source}")]
    Load {
        target: String,
        #[source]
        source: Source,
    },

    /// Local file i/o while writing or reading standalone artifacts.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    pub(crate) fn network(url: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    pub(crate) fn parse(input: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::Parse {
            input: input.into(),
            source: source.into(),
        }
    }

    pub(crate) fn load(target: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::Load {
            target: target.into(),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
