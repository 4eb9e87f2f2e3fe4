//! Message formatting: gambling-notice layout detection, line-oriented
//! translation, and the fixed lexical substitution table.

use std::sync::Arc;

use tracing::warn;

use crate::ports::TranslatorPort;

/// Marker substrings that identify the gambling-notice layout. Substring
/// (not token) match, case-sensitive.
const GAMBLING_MARKERS: &[&str] = &[
    "♠️", "♥️", "♦️", "♣️", "₽", "игрок", "выигрыш", "проигрыш",
];

/// Fixed substitutions applied to each translated line of a gambling
/// notice, in order. Longest-first so no entry undoes an earlier one
/// (`проигрышь` must match before its prefix `проигрыш`).
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("проигрышь", "PERTE"),
    ("проигрыш", "PERTE"),
    ("выигрыш", "GAIN"),
    ("игрок", "Joueur"),
    ("Догон", "Suite"),
    ("игры", "parties"),
];

pub fn is_gambling_notice(text: &str) -> bool {
    GAMBLING_MARKERS.iter().any(|m| text.contains(m))
}

/// Decides between the gambling-notice pipeline and plain translation,
/// and never fails: backend errors fall back to the untranslated input.
pub struct Formatter {
    translator: Arc<dyn TranslatorPort>,
    target_language: String,
}

impl Formatter {
    pub fn new(translator: Arc<dyn TranslatorPort>, target_language: impl Into<String>) -> Self {
        Self {
            translator,
            target_language: target_language.into(),
        }
    }

    pub async fn format(&self, text: &str) -> String {
        if text.is_empty() {
            return text.to_string();
        }
        if is_gambling_notice(text) {
            self.format_gambling(text).await
        } else {
            self.translate_lenient(text).await
        }
    }

    /// Line-level translation: blank lines pass through verbatim without a
    /// backend call, each non-blank line is translated independently and
    /// then run through the substitution table.
    async fn format_gambling(&self, text: &str) -> String {
        let mut out = Vec::new();
        for line in text.split('\n') {
            if line.trim().is_empty() {
                out.push(line.to_string());
                continue;
            }
            let translated = self.translate_lenient(line).await;
            out.push(apply_substitutions(&translated));
        }
        out.join("\n")
    }

    async fn translate_lenient(&self, text: &str) -> String {
        match self.translator.translate(text, &self.target_language).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("translation failed, keeping original text: {e}");
                text.to_string()
            }
        }
    }
}

fn apply_substitutions(line: &str) -> String {
    let mut out = line.to_string();
    for (from, to) in SUBSTITUTIONS {
        out = out.replace(from, to);
    }
    out
}
