use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{platform} provider error: {message}")]
    Provider { platform: String, message: String },

    #[error("brand source error: {0}")]
    BrandSource(String),

    #[error("downstream sink error: {0}")]
    Sink(String),

    #[error("configuration error: {0}")]
    Config(#[from] mentions_core::ConfigError),
}

impl AggregatorError {
    pub(crate) fn provider(platform: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            platform: platform.to_string(),
            message: message.into(),
        }
    }
}
