use std::fmt;
use std::time::Duration;

use qcr_core::config::Settings;
use qcr_core::error::AppError;
use serde::de::DeserializeOwned;

/// Blocking client for an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = validate_base_url(base_url)?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::new("CONFIG_MISSING_API_KEY", "API key must not be empty"));
        }
        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let key = settings.require_api_key()?;
        Self::new(
            &settings.api_base_url,
            key,
            Duration::from_secs(settings.request_timeout_secs.max(1)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/models", self.base_url);
        let resp = ureq::get(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .timeout(Duration::from_secs(5))
            .call();

        match resp {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("API_UNHEALTHY", "API health check failed")
                    .with_details(format!("status={status}"))
                    .with_retryable(status == 429 || status >= 500),
            ),
            Err(e) => Err(AppError::new("API_UNREACHABLE", "Failed to reach the API")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }

    /// POST a JSON body and decode a JSON response. `code` tags every failure.
    pub(crate) fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
        code: &str,
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "calling API");
        let resp = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .send_json(body);

        match resp {
            Ok(r) => r.into_json::<T>().map_err(|e| {
                AppError::new(code, "Failed to decode API response")
                    .with_details(format!("url={url}; err={e}"))
            }),
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(AppError::new(code, "API request failed")
                    .with_details(format!("url={url}; status={status}; body={}", truncate_chars(&body, 500)))
                    .with_retryable(status == 429 || status >= 500))
            }
            Err(e) => Err(AppError::new(code, "Failed to call API endpoint")
                .with_details(format!("url={url}; err={e}"))
                .with_retryable(true)),
        }
    }
}

fn validate_base_url(raw: &str) -> Result<String, AppError> {
    let invalid = |reason: &str| {
        AppError::new("CONFIG_INVALID", "API base URL is invalid")
            .with_details(format!("base_url={raw}; reason={reason}"))
    };

    let url = raw.trim().trim_end_matches('/');
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| invalid("scheme must be http or https"))?;
    if url.contains(['?', '#']) || url.contains(char::is_whitespace) {
        return Err(invalid("query, fragment or whitespace not allowed"));
    }

    let authority = rest.split('/').next().unwrap_or("");
    if authority.is_empty() || authority.contains('@') {
        return Err(invalid("missing host or embedded credentials"));
    }

    let port = if let Some(v6) = authority.strip_prefix('[') {
        let (host, after) = v6.split_once(']').ok_or_else(|| invalid("unterminated IPv6 host"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        match after {
            "" => None,
            p => Some(p.strip_prefix(':').ok_or_else(|| invalid("bad port separator"))?),
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(invalid("empty host"));
                }
                Some(port)
            }
            None => None,
        }
    };
    if let Some(p) = port {
        match p.parse::<u16>() {
            Ok(n) if n > 0 => {}
            _ => return Err(invalid("port must be 1-65535")),
        }
    }

    Ok(url.to_string())
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
