use std::fmt;
use thiserror::Error;

/// The four collections a pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Clients,
    Projects,
    Invoices,
    Activity,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Projects => "projects",
            Collection::Invoices => "invoices",
            Collection::Activity => "activity",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`crate::DataAccess`] implementation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// One of the reads failed; nothing was published for the pass.
    #[error("failed to fetch {collection}: {source}")]
    Fetch {
        collection: Collection,
        #[source]
        source: SourceError,
    },
    /// A newer pass was triggered before this one could publish.
    #[error("refresh #{generation} was superseded by a newer refresh")]
    Superseded { generation: u64 },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
