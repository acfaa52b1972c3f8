use std::time::Duration;

use docsense_core::error::AppError;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

fn invalid_url(base_url: &str, reason: &str) -> AppError {
    AppError::configuration("CONFIG_OLLAMA_URL_INVALID", "Ollama base URL is invalid")
        .with_details(format!("base_url={base_url}; reason={reason}"))
}

impl OllamaClient {
    /// Create a client for an Ollama server. The URL must be a bare `scheme://host[:port]`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let rest = base_url
            .strip_prefix("http://")
            .or_else(|| base_url.strip_prefix("https://"))
            .ok_or_else(|| invalid_url(&base_url, "scheme must be http or https"))?;

        // Harden against credential/path smuggling: authority only.
        if rest.contains('/') {
            return Err(invalid_url(&base_url, "path is not allowed"));
        }
        if rest.contains('@') {
            return Err(invalid_url(&base_url, "userinfo is not allowed"));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (rest, None),
        };
        if host.is_empty() {
            return Err(invalid_url(&base_url, "host is empty"));
        }
        if let Some(port) = port {
            match port.parse::<u16>() {
                Ok(p) if p != 0 => {}
                _ => return Err(invalid_url(&base_url, "port must be 1-65535")),
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::retrieval("RAG_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(
                AppError::retrieval("RAG_OLLAMA_UNREACHABLE", "Failed to reach Ollama")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
