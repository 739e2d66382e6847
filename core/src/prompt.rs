use crate::analysis::SAFETY_MESSAGE;

/// Lines fencing the journal text inside the prompt. The entry is embedded
/// verbatim (never escaped), so a journal that itself contains a marker line
/// can confuse the model about where the entry ends. That residual risk is
/// accepted: the markers are unlikely in natural journal text, and the
/// validator downstream never trusts the model output anyway.
const ENTRY_BEGIN: &str = "BEGIN_ENTRY";
const ENTRY_END: &str = "END_ENTRY";

/// Render the fixed analysis instruction with `content` embedded verbatim.
///
/// Pure function of the content: identical input yields an identical prompt,
/// which together with deterministic sampling makes whole-pipeline replays
/// reproducible.
pub fn build_analysis_prompt(content: &str) -> String {
    format!(
        r#"ANALYZE_JOURNAL_ENTRY — RETURN ONLY JSON.

Analyze the journal entry below and return EXACTLY one JSON object (no surrounding text) with these fields and types:

{{
  "themes": [ {{ "name": string, "confidence": number }} ],
  "emotion": {{ "label": string, "confidence": number }},
  "reflection": string,
  "crisis_flag": boolean,
  "evidence": [ string ],
  "confidence": number,
  "language": string
}}

RULES:
1) Output must be STRICT JSON only. No extra keys, no commentary.
2) Up to TWO themes (broad labels like "work stress", "relationship conflict", "sleep", "self-esteem", "finances", "health").
3) One dominant emotion label (e.g., "anxious", "sad") with confidence.
4) reflection: empathic, non-diagnostic, non-judgemental. 1–2 sentences, <=40 words.
5) If explicit self-harm/suicidal language is present, set crisis_flag = true and return a single safety sentence: "{SAFETY_MESSAGE}"
6) evidence: exact substrings copied from the entry (up to 3 snippets).
7) confidences must be decimals 0.00–1.00 with two decimals.
8) Return language code in "language".
9) Do not output internal reasoning.

INPUT JOURNAL ENTRY (between {ENTRY_BEGIN} and {ENTRY_END} lines):
{ENTRY_BEGIN}
{content}
{ENTRY_END}"#
    )
}
