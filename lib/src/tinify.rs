use crate::error::{Result, Chainable};

/// The environment variable holding the compression service api key. The
/// key is never read from configuration files and never baked in.
pub const API_KEY_VAR: &str = "TINIFY_API_KEY";

const SHRINK_URL: &str = "https://api.tinify.com/shrink";

/// Client for the tinify lossy image compression service. Uploads the
/// image, then fetches the compressed result the service points at.
#[derive(Debug)]
pub struct Tinify {
    key: String,
    client: reqwest::blocking::Client,
}

impl Tinify {
    pub fn new(key: String) -> Self {
        Tinify { key, client: reqwest::blocking::Client::new() }
    }

    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.is_empty() => Ok(Tinify::new(key)),
            _ => err! {
                "image compression needs a service api key",
                "set environment variable" => API_KEY_VAR,
                "get a key at" => "https://tinypng.com/developers",
            },
        }
    }

    pub fn compress(&self, image: Vec<u8>) -> Result<Vec<u8>> {
        let response = self.client
            .post(SHRINK_URL)
            .basic_auth("api", Some(&self.key))
            .body(image)
            .send()
            .chain("compression service request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return err! {
                "compression service rejected the image",
                "status" => status,
                "response" => body,
            };
        }

        let location = response.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| error!("compression service response carried no result location"))?;

        let compressed = self.client
            .get(&location)
            .basic_auth("api", Some(&self.key))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .chain_with(|| error! {
                "failed to download compressed image",
                "location" => location,
            })?;

        Ok(compressed.to_vec())
    }
}
