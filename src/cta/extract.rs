//! Best-effort field extraction from a partially streamed JSON object.
//!
//! While a model streams `{"cta": "Try It`, the buffer is not valid JSON
//! yet, but the UI still wants the label so far. [`PartialFieldExtractor`]
//! pulls the current value of one string field out of any prefix; the
//! complete buffer is decoded into [`CtaResponse`] once the stream ends.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Decoded model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaResponse {
    /// Button label.
    #[serde(default)]
    pub cta: Option<String>,
    /// Model's explanation of the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Extracts the value of one string field from a JSON prefix.
#[derive(Debug, Clone)]
pub struct PartialFieldExtractor {
    pattern: Regex,
}

static CTA_EXTRACTOR: LazyLock<Option<PartialFieldExtractor>> =
    LazyLock::new(|| PartialFieldExtractor::new("cta").ok());

impl PartialFieldExtractor {
    /// Builds an extractor for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the pattern cannot be compiled.
    pub fn new(field: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r#""{}"\s*:\s*"([^"]*)"#, regex::escape(field)))?;
        Ok(Self { pattern })
    }

    /// Shared extractor for the `cta` field.
    #[must_use]
    pub fn cta() -> Option<&'static Self> {
        CTA_EXTRACTOR.as_ref()
    }

    /// Current value of the field, or `None` while it has not started or
    /// is still empty. Never fails on incomplete input.
    #[must_use]
    pub fn extract<'a>(&self, buffer: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(buffer)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Accumulates streamed deltas and reports the field value each time it
/// changes.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
    last_emitted: Option<String>,
}

impl StreamAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `delta` and returns the extracted value when it differs from
    /// the one last returned.
    pub fn push(&mut self, delta: &str, extractor: &PartialFieldExtractor) -> Option<String> {
        self.buffer.push_str(delta);
        let current = extractor.extract(&self.buffer)?;
        if self.last_emitted.as_deref() == Some(current) {
            return None;
        }
        let current = current.to_string();
        self.last_emitted = Some(current.clone());
        Some(current)
    }

    /// Everything received so far.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Value last returned by [`StreamAccumulator::push`].
    #[must_use]
    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    /// Decodes the complete buffer.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the buffer is not a complete JSON
    /// object.
    pub fn finish(&self) -> Result<CtaResponse, serde_json::Error> {
        serde_json::from_str(&self.buffer)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn extractor() -> &'static PartialFieldExtractor {
        let Some(extractor) = PartialFieldExtractor::cta() else {
            panic!("cta pattern must compile");
        };
        extractor
    }

    #[test]
    fn extracts_from_prefixes() {
        let e = extractor();
        assert_eq!(e.extract(""), None);
        assert_eq!(e.extract(r#"{"ct"#), None);
        assert_eq!(e.extract(r#"{"cta": ""#), None);
        assert_eq!(e.extract(r#"{"cta": "Try"#), Some("Try"));
        assert_eq!(e.extract(r#"{"cta":"Try It Now","reason"#), Some("Try It Now"));
        assert_eq!(e.extract("{\n  \"cta\"\n  :  \"Spaced"), Some("Spaced"));
    }

    #[test]
    fn other_fields_do_not_match() {
        let e = extractor();
        assert_eq!(e.extract(r#"{"reasoning": "because", "ct"#), None);
    }

    #[test]
    fn field_names_are_escaped() {
        let Ok(e) = PartialFieldExtractor::new("a.b") else {
            panic!("pattern must compile");
        };
        assert_eq!(e.extract(r#"{"axb": "no"}"#), None);
        assert_eq!(e.extract(r#"{"a.b": "yes"}"#), Some("yes"));
    }

    #[test]
    fn accumulator_reports_only_changes() {
        let e = extractor();
        let mut acc = StreamAccumulator::new();
        let emitted: Vec<String> = [r#"{"ct"#, r#"a": "Tr"#, "y", r#"""#, r#", "reasoning": "x"}"#]
            .iter()
            .filter_map(|delta| acc.push(delta, e))
            .collect();
        assert_eq!(emitted, vec!["Tr".to_string(), "Try".to_string()]);
        assert_eq!(acc.last_emitted(), Some("Try"));

        let Ok(response) = acc.finish() else {
            panic!("complete buffer should decode");
        };
        assert_eq!(response.cta.as_deref(), Some("Try"));
        assert_eq!(response.reasoning.as_deref(), Some("x"));
    }

    #[test]
    fn incomplete_buffer_does_not_decode() {
        let mut acc = StreamAccumulator::new();
        let _ = acc.push(r#"{"cta": "Half"#, extractor());
        assert!(acc.finish().is_err());
        assert_eq!(acc.buffer(), r#"{"cta": "Half"#);
    }
}
