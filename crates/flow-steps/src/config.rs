use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub documents: DocumentServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base for request paths that are not absolute urls
    pub base_url: Option<String>,
    pub download_dir: PathBuf,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentServiceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DOCUMENT_SERVICE_URL: &str = "http://localhost:10000";
const DEFAULT_DOCUMENT_TIMEOUT_MS: u64 = 60000;
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

fn default_user_agent() -> String {
    format!("pdfgen-flow-steps/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            },
            http: HttpConfig {
                base_url: std::env::var("HTTP_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                download_dir: std::env::var("DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
                user_agent: std::env::var("HTTP_USER_AGENT")
                    .unwrap_or_else(|_| default_user_agent()),
            },
            documents: DocumentServiceConfig {
                base_url: std::env::var("PDF_GENERATOR_URL")
                    .unwrap_or_else(|_| DEFAULT_DOCUMENT_SERVICE_URL.to_string()),
                timeout_ms: std::env::var("PDF_GENERATOR_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DOCUMENT_TIMEOUT_MS),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if let Some(base_url) = &self.http.base_url {
            url::Url::parse(base_url).map_err(|e| {
                crate::Error::Config(format!("HTTP_BASE_URL '{}' is not a valid url: {}", base_url, e))
            })?;
        } else {
            tracing::warn!("HTTP_BASE_URL is not set. Steps must use absolute urls.");
        }

        url::Url::parse(&self.documents.base_url).map_err(|e| {
            crate::Error::Config(format!(
                "PDF_GENERATOR_URL '{}' is not a valid url: {}",
                self.documents.base_url, e
            ))
        })?;

        if self.documents.timeout_ms == 0 {
            return Err(crate::Error::Config(
                "PDF_GENERATOR_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: DEFAULT_ADDR.to_string(),
            },
            http: HttpConfig {
                base_url: None,
                download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
                user_agent: default_user_agent(),
            },
            documents: DocumentServiceConfig {
                base_url: DEFAULT_DOCUMENT_SERVICE_URL.to_string(),
                timeout_ms: DEFAULT_DOCUMENT_TIMEOUT_MS,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert!(config.http.base_url.is_none());
    }

    #[test]
    fn test_invalid_urls_are_config_errors() {
        let mut config = Config::default();
        config.http.base_url = Some("not a url".into());
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let mut config = Config::default();
        config.documents.base_url = "".into();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let mut config = Config::default();
        config.documents.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }
}
