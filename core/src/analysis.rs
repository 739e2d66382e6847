use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Fixed safety sentence. Whenever the model flags crisis content, the
/// pipeline overwrites the reflection with exactly this text; the model's
/// own wording is never trusted for it.
pub const SAFETY_MESSAGE: &str = "I'm sorry you're feeling this way. If you're in immediate danger \
     please contact local emergency services or a crisis hotline now.";

/// At most two themes per entry.
const MAX_THEMES: usize = 2;
/// At most three evidence snippets per entry.
const MAX_EVIDENCE: usize = 3;

/// A broad topic detected in the entry (e.g. "work stress", "sleep").
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Theme {
    pub name: String,
    /// Confidence in [0.00, 1.00]
    pub confidence: f64,
}

/// The dominant emotion detected in the entry.
/// An empty label means the model did not identify one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Emotion {
    pub label: String,
    /// Confidence in [0.00, 1.00]
    pub confidence: f64,
}

/// The normalized output contract of one analysis.
///
/// Always structurally complete: every field is present (and non-null) in
/// the serialized JSON even when the model omitted it. Built exclusively by
/// [`interpret_model_output`]; there is no `Deserialize` on purpose, so a
/// raw model payload can never masquerade as a normalized result.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalysisResult {
    /// Up to two detected themes, strongest first
    pub themes: Vec<Theme>,
    /// Dominant emotion (empty label when none detected)
    pub emotion: Emotion,
    /// Empathic reflection, 1–2 sentences, at most 40 words
    pub reflection: String,
    /// True when the entry contains self-harm/suicidal language
    pub crisis_flag: bool,
    /// Up to three verbatim substrings of the original entry
    pub evidence: Vec<String>,
    /// Overall confidence in [0.00, 1.00]
    pub confidence: f64,
    /// ISO-like language code of the entry (defaults to "en")
    pub language: String,
}

/// Raised when the model's text is not valid JSON. Carries the raw text so
/// the error boundary can log it for offline prompt-tuning. Never retried:
/// sampling is deterministic, so a structural retry is unlikely to help.
#[derive(Debug, Error)]
#[error("model output is not valid JSON: {source}")]
pub struct MalformedModelOutput {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// Parse and normalize raw model text into a structurally complete
/// [`AnalysisResult`].
///
/// Parsing is strict JSON; anything else fails with [`MalformedModelOutput`].
/// Normalization fills safe defaults for missing fields and treats
/// wrong-typed fields as absent; values are never coerced or guessed. The
/// original entry `content` is needed to verify evidence snippets.
pub fn interpret_model_output(
    raw: &str,
    content: &str,
) -> Result<AnalysisResult, MalformedModelOutput> {
    let value: Value = serde_json::from_str(raw).map_err(|source| MalformedModelOutput {
        raw: raw.to_string(),
        source,
    })?;
    Ok(normalize_analysis(&value, content))
}

/// If the crisis flag is set, overwrite the reflection with the fixed
/// [`SAFETY_MESSAGE`] regardless of what the model produced, so prompt
/// injection or model drift can never suppress the safety message once the
/// flag is up. Total function, no failure mode.
pub fn apply_crisis_policy(mut result: AnalysisResult) -> AnalysisResult {
    if result.crisis_flag {
        result.reflection = SAFETY_MESSAGE.to_string();
    }
    result
}

fn normalize_analysis(value: &Value, content: &str) -> AnalysisResult {
    AnalysisResult {
        themes: parse_themes(value.get("themes")),
        emotion: parse_emotion(value.get("emotion")),
        reflection: value
            .get("reflection")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        crisis_flag: value
            .get("crisis_flag")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        evidence: parse_evidence(value.get("evidence"), content),
        confidence: value
            .get("confidence")
            .and_then(Value::as_f64)
            .map(clamp_confidence)
            .unwrap_or(0.0),
        language: value
            .get("language")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .unwrap_or("en")
            .to_string(),
    }
}

/// Keep array items that carry a string `name`; a missing or wrong-typed
/// per-item confidence defaults to 0.0 rather than dropping the theme.
fn parse_themes(value: Option<&Value>) -> Vec<Theme> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("name").and_then(Value::as_str)?;
                    let confidence = item
                        .get("confidence")
                        .and_then(Value::as_f64)
                        .map(clamp_confidence)
                        .unwrap_or(0.0);
                    Some(Theme {
                        name: name.to_string(),
                        confidence,
                    })
                })
                .take(MAX_THEMES)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_emotion(value: Option<&Value>) -> Emotion {
    value
        .and_then(|emotion| {
            let label = emotion.get("label").and_then(Value::as_str)?;
            let confidence = emotion
                .get("confidence")
                .and_then(Value::as_f64)
                .map(clamp_confidence)
                .unwrap_or(0.0);
            Some(Emotion {
                label: label.to_string(),
                confidence,
            })
        })
        .unwrap_or_default()
}

/// Evidence must be verbatim substrings of the original entry. Snippets the
/// model invented (or altered) are dropped before the cap is applied.
fn parse_evidence(value: Option<&Value>, content: &str) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|snippet| !snippet.is_empty() && content.contains(snippet))
                .map(str::to_string)
                .take(MAX_EVIDENCE)
                .collect()
        })
        .unwrap_or_default()
}

fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}
