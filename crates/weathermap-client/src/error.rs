use thiserror::Error;

/// Errors returned by the weather API client.
///
/// These never reach the map: [`crate::WeatherSource::fetch_weather`] turns
/// every one of them into the unavailable sentinel record.
#[derive(Debug, Error)]
pub enum WeatherApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body parsed but lacked a field the record needs.
    #[error("response from {context} is missing {field}")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{operation} is not available on the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },
}
