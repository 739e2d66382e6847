//! The analysis pipeline: validate, prompt, generate, normalize, enforce,
//! persist. Strictly linear with no branching concurrency; the only
//! suspension points are the model call and the entry update.

use serde::Deserialize;
use uuid::Uuid;

use solace_core::analysis::{self, AnalysisResult};
use solace_core::prompt;

use crate::error::AppError;
use crate::gateway::TextGenerator;
use crate::store::EntryStore;

/// Longest accepted entry text. Guards the prompt against payloads that
/// could never fit the model's context window anyway.
const MAX_CONTENT_CHARS: usize = 16_000;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Journal entry text, analyzed verbatim
    pub content: String,
    /// Entry to persist the analysis onto; omit to analyze without saving
    #[serde(default)]
    pub entry_id: Option<Uuid>,
    /// When true, return the model's raw text instead of the normalized
    /// result, and never persist
    #[serde(default)]
    pub is_test: bool,
}

/// What a successful run hands to the emitter.
#[derive(Debug)]
pub enum AnalyzeOutcome {
    /// Test mode: raw model text, unparsed and unpersisted. The crisis
    /// policy deliberately does not run here; this output is for human
    /// inspection of model behavior, never for end users.
    Raw(String),
    /// Normal mode: normalized, policy-enforced result
    Analysis(AnalysisResult),
}

/// Run the whole pipeline for one request.
///
/// Test mode stops right after the model call. Normal mode parses,
/// normalizes, enforces the crisis policy, and only then persists, so a
/// stored reflection can never predate the safety override and a request
/// that fails anywhere performs no write at all.
pub async fn run<G, S>(
    request: AnalyzeRequest,
    generator: &G,
    store: &S,
) -> Result<AnalyzeOutcome, AppError>
where
    G: TextGenerator,
    S: EntryStore,
{
    let content = validate_content(&request.content)?;

    tracing::info!(
        entry_id = ?request.entry_id,
        is_test = request.is_test,
        content_chars = content.chars().count(),
        "analyzing journal entry"
    );

    let rendered = prompt::build_analysis_prompt(content);
    let raw_output = generator.generate(&rendered).await?;

    if request.is_test {
        return Ok(AnalyzeOutcome::Raw(raw_output));
    }

    let analysis = analysis::interpret_model_output(&raw_output, content)?;
    let analysis = analysis::apply_crisis_policy(analysis);

    if let Some(entry_id) = request.entry_id {
        store.complete_entry(entry_id, &analysis, &raw_output).await?;
    }

    Ok(AnalyzeOutcome::Analysis(analysis))
}

fn validate_content(raw: &str) -> Result<&str, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation {
            message: "Content is required".to_string(),
            field: Some("content".to_string()),
        });
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation {
            message: format!("content must be <= {MAX_CONTENT_CHARS} characters"),
            field: Some("content".to_string()),
        });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use solace_core::analysis::SAFETY_MESSAGE;

    use super::*;

    const CALM_REPLY: &str = r#"{
        "themes": [{"name": "work", "confidence": 0.92}],
        "emotion": {"label": "proud", "confidence": 0.88},
        "reflection": "It sounds like your effort really paid off today.",
        "crisis_flag": false,
        "evidence": ["amazing day at work"],
        "confidence": 0.85,
        "language": "en"
    }"#;

    const CRISIS_REPLY: &str = r#"{
        "themes": [{"name": "hopelessness", "confidence": 0.95}],
        "emotion": {"label": "despairing", "confidence": 0.93},
        "reflection": "Things will look brighter tomorrow!",
        "crisis_flag": true,
        "evidence": [],
        "confidence": 0.9,
        "language": "en"
    }"#;

    struct CannedGenerator {
        reply: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.to_string())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            Err(AppError::Gateway {
                status: Some(503),
                detail: "upstream overloaded".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(Uuid, AnalysisResult, String)>>,
    }

    impl RecordingStore {
        fn writes(&self) -> Vec<(Uuid, AnalysisResult, String)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl EntryStore for RecordingStore {
        async fn complete_entry(
            &self,
            entry_id: Uuid,
            analysis: &AnalysisResult,
            raw_output: &str,
        ) -> Result<(), AppError> {
            self.writes
                .lock()
                .unwrap()
                .push((entry_id, analysis.clone(), raw_output.to_string()));
            Ok(())
        }
    }

    struct RejectingStore;

    impl EntryStore for RejectingStore {
        async fn complete_entry(
            &self,
            entry_id: Uuid,
            _analysis: &AnalysisResult,
            _raw_output: &str,
        ) -> Result<(), AppError> {
            Err(AppError::Persistence {
                detail: format!("journal entry {entry_id} not found"),
            })
        }
    }

    fn request(content: &str, entry_id: Option<Uuid>, is_test: bool) -> AnalyzeRequest {
        AnalyzeRequest {
            content: content.to_string(),
            entry_id,
            is_test,
        }
    }

    #[test]
    fn request_json_uses_camel_case_keys() {
        let parsed: AnalyzeRequest = serde_json::from_str(
            r#"{"content": "slept well", "entryId": "4b4a8f6e-5f7d-4a2b-9a64-07a2752cd2cb", "isTest": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.content, "slept well");
        assert!(parsed.entry_id.is_some());
        assert!(parsed.is_test);

        let minimal: AnalyzeRequest = serde_json::from_str(r#"{"content": "slept well"}"#).unwrap();
        assert_eq!(minimal.entry_id, None);
        assert!(!minimal.is_test);
    }

    #[test]
    fn content_validation_trims_and_bounds() {
        assert!(matches!(
            validate_content("   "),
            Err(AppError::Validation { .. })
        ));
        assert_eq!(validate_content("  slept well \n").unwrap(), "slept well");

        let oversized = "a".repeat(MAX_CONTENT_CHARS + 1);
        assert!(matches!(
            validate_content(&oversized),
            Err(AppError::Validation { .. })
        ));
        let at_limit = "a".repeat(MAX_CONTENT_CHARS);
        assert!(validate_content(&at_limit).is_ok());
    }

    #[tokio::test]
    async fn test_mode_returns_raw_text_and_never_persists() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();

        let outcome = run(
            request("Had an amazing day at work today!", Some(Uuid::new_v4()), true),
            &generator,
            &store,
        )
        .await
        .unwrap();

        match outcome {
            AnalyzeOutcome::Raw(raw) => assert_eq!(raw, CALM_REPLY),
            other => panic!("expected raw outcome, got {other:?}"),
        }
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_mode_skips_parsing_entirely() {
        let generator = CannedGenerator::new("definitely not json");
        let store = RecordingStore::default();

        let outcome = run(request("slept well", None, true), &generator, &store)
            .await
            .unwrap();
        assert!(matches!(outcome, AnalyzeOutcome::Raw(_)));
    }

    #[tokio::test]
    async fn normal_mode_persists_then_emits_the_same_analysis() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();
        let entry_id = Uuid::new_v4();

        let outcome = run(
            request("Had an amazing day at work today!", Some(entry_id), false),
            &generator,
            &store,
        )
        .await
        .unwrap();

        let analysis = match outcome {
            AnalyzeOutcome::Analysis(analysis) => analysis,
            other => panic!("expected analysis outcome, got {other:?}"),
        };
        assert_eq!(analysis.themes[0].name, "work");
        assert_eq!(analysis.evidence, vec!["amazing day at work".to_string()]);

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        let (written_id, written_analysis, written_raw) = &writes[0];
        assert_eq!(*written_id, entry_id);
        assert_eq!(written_analysis, &analysis);
        assert_eq!(written_raw, CALM_REPLY);
    }

    #[tokio::test]
    async fn crisis_reflection_is_replaced_before_the_write() {
        let generator = CannedGenerator::new(CRISIS_REPLY);
        let store = RecordingStore::default();

        let outcome = run(
            request("I don't want to be here anymore.", Some(Uuid::new_v4()), false),
            &generator,
            &store,
        )
        .await
        .unwrap();

        let analysis = match outcome {
            AnalyzeOutcome::Analysis(analysis) => analysis,
            other => panic!("expected analysis outcome, got {other:?}"),
        };
        assert!(analysis.crisis_flag);
        assert_eq!(analysis.reflection, SAFETY_MESSAGE);

        // The stored copy must already carry the override, not the model's text.
        let writes = store.writes();
        assert_eq!(writes[0].1.reflection, SAFETY_MESSAGE);
    }

    #[tokio::test]
    async fn analysis_without_entry_id_skips_persistence() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();

        let outcome = run(
            request("Had an amazing day at work today!", None, false),
            &generator,
            &store,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, AnalyzeOutcome::Analysis(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_any_model_call() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();

        let err = run(request("   \n ", Some(Uuid::new_v4()), false), &generator, &store)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_without_a_write() {
        let store = RecordingStore::default();

        let err = run(
            request("slept well", Some(Uuid::new_v4()), false),
            &FailingGenerator,
            &store,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Gateway { status: Some(503), .. }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn malformed_model_output_fails_without_a_write() {
        let generator = CannedGenerator::new("Here is your analysis: {\"themes\"");
        let store = RecordingStore::default();

        let err = run(
            request("slept well", Some(Uuid::new_v4()), false),
            &generator,
            &store,
        )
        .await
        .unwrap_err();

        match err {
            AppError::MalformedResponse { raw } => {
                assert_eq!(raw, "Here is your analysis: {\"themes\"")
            }
            other => panic!("expected malformed response, got {other:?}"),
        }
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn store_rejection_surfaces_as_persistence_error() {
        let generator = CannedGenerator::new(CALM_REPLY);

        let err = run(
            request("Had an amazing day at work today!", Some(Uuid::new_v4()), false),
            &generator,
            &RejectingStore,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Persistence { .. }));
    }

    #[tokio::test]
    async fn prompt_embeds_the_trimmed_entry_verbatim() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();
        let content = "Wrote {\"json\": true} in my diary today.";

        run(
            request(&format!("  {content}  "), None, false),
            &generator,
            &store,
        )
        .await
        .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(content));
    }

    #[tokio::test]
    async fn identical_requests_produce_byte_identical_results() {
        let generator = CannedGenerator::new(CALM_REPLY);
        let store = RecordingStore::default();

        let first = run(
            request("Had an amazing day at work today!", None, false),
            &generator,
            &store,
        )
        .await
        .unwrap();
        let second = run(
            request("Had an amazing day at work today!", None, false),
            &generator,
            &store,
        )
        .await
        .unwrap();

        let (AnalyzeOutcome::Analysis(first), AnalyzeOutcome::Analysis(second)) = (first, second)
        else {
            panic!("expected analysis outcomes");
        };
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
