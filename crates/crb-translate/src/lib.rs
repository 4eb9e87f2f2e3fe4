//! Translation backend adapter (Google Translate web endpoint).
//!
//! Uses the same unauthenticated `translate_a/single` endpoint the
//! original deployment relied on; no API key required.

use std::time::Duration;

use async_trait::async_trait;

use crb_core::{errors::Error, ports::TranslatorPort, Result};

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Clone, Debug)]
pub struct GoogleTranslator {
    http: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self { http }
    }
}

#[async_trait]
impl TranslatorPort for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let resp = self
            .http
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| Error::Translation(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Translation(format!(
                "translate failed: {}",
                resp.status()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Translation(format!("json error: {e}")))?;

        extract_translation(&v)
            .ok_or_else(|| Error::Translation("unexpected response shape".to_string()))
    }
}

/// Response shape: `[[["Bonjour","Hello",...],["le monde","world",...]],...]`
/// — element 0 is a list of segments whose first field is the translated
/// text; the remaining elements are metadata we ignore.
fn extract_translation(v: &serde_json::Value) -> Option<String> {
    let segments = v.get(0)?.as_array()?;
    let mut out = String::new();
    for seg in segments {
        if let Some(part) = seg.get(0).and_then(|p| p.as_str()) {
            out.push_str(part);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
