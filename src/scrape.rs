use std::{error::Error, io::Read, time::Duration};

use crate::config::Config;

/// Upper bound on how much of a page body is read.
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),
}

/// A fetched resource. `body` is only read for html responses.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub content_type: Option<String>,
    pub body: String,
}

pub trait PageFetcher: Send + Sync {
    /// Non-2xx responses are errors, same as transport failures.
    fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(10));

        if let Some(proxy) = &config.proxy {
            log::debug!("using proxy {proxy:#?}");
            client = client.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: client.build()?,
        })
    }
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

fn to_fetch_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(get_error(&error))
    }
}

impl PageFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        log::debug!("{url}: requesting");

        let resp = self.client.get(url).send().map_err(to_fetch_error)?;

        let status = resp.status();
        if !status.is_success() {
            log::debug!("{url}: {status}");
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        // non-html resources are tagged by type alone, skip the download
        if !crate::keywords::classify(content_type.as_deref()).is_html() {
            return Ok(Page {
                content_type,
                body: String::new(),
            });
        }

        let mut bytes = vec![];
        resp.take(MAX_BODY_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::TimedOut {
                    FetchError::Timeout
                } else {
                    FetchError::Network(err.to_string())
                }
            })?;

        let body = decode_body(&bytes, content_type.as_deref());
        Ok(Page { content_type, body })
    }
}

fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decodes with the `Content-Type` charset, utf-8 when absent or unknown.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_of)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()));

    match encoding {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
