use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn lang(language: &str, version: &str, aliases: &[&str]) -> Language {
    Language {
        language: language.into(),
        version: version.into(),
        aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
    }
}

fn runtimes() -> Vec<Language> {
    vec![
        lang("javascript", "18.15.0", &["node-javascript", "node-js", "javascript", "js"]),
        lang("python", "3.10.0", &["py", "py3", "python3"]),
        lang("rust", "1.68.2", &[]),
        lang("bash", "5.2.0", &["sh"]),
    ]
}

#[test]
fn selects_by_alias() {
    let langs = runtimes();
    assert_eq!(select_language(&langs, "main.py").map(|l| l.language.as_str()), Some("python"));
    assert_eq!(select_language(&langs, "index.JS").map(|l| l.language.as_str()), Some("javascript"));
}

#[test]
fn selects_by_mapped_language_name() {
    let langs = runtimes();
    // No alias for "rs", but the extension maps to "rust".
    assert_eq!(select_language(&langs, "main.rs").map(|l| l.version.as_str()), Some("1.68.2"));
    // "shell" is unknown to the service but maps to bash.
    assert_eq!(select_language(&langs, "run.shell").map(|l| l.language.as_str()), Some("bash"));
}

#[test]
fn no_selection_without_match() {
    let langs = runtimes();
    assert!(select_language(&langs, "notes.txt").is_none());
    assert!(select_language(&langs, "Makefile").is_none());
}

#[test]
fn request_carries_single_file() {
    let request = build_request(&lang("python", "3.10.0", &[]), "main.py", "print(1)", "input");
    assert_eq!(request.files, vec![SourceFile { name: "main.py".into(), content: "print(1)".into() }]);
    assert_eq!(request.stdin, "input");

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["language"], "python");
    assert_eq!(json["version"], "3.10.0");
}

#[test]
fn output_prefers_stderr() {
    let ok: ExecuteResponse = parse_execute(r#"{"run":{"stdout":"hi\n","stderr":"","code":0}}"#).unwrap();
    assert_eq!(ok.output(), "hi\n");
    assert!(!ok.is_error());

    let failed: ExecuteResponse = parse_execute(r#"{"run":{"stdout":"partial","stderr":"boom"}}"#).unwrap();
    assert_eq!(failed.output(), "boom");
    assert!(failed.is_error());
}

#[test]
fn parse_runtimes_list() {
    let json = r#"[{"language":"go","version":"1.16.2","aliases":["go","golang"]},{"language":"c","version":"10.2.0"}]"#;
    let langs = parse_runtimes(json).unwrap();
    assert_eq!(langs.len(), 2);
    assert!(langs[1].aliases.is_empty());
    assert!(matches!(parse_runtimes("{}"), Err(RunError::ApiParse(_))));
}

#[test]
fn selection_round_trip() {
    let python = lang("python", "3.10.0", &["py"]);
    let encoded = encode_selection(&python);
    assert!(encoded.contains(r#""kind":"language""#));
    assert_eq!(decode_selection(&encoded).unwrap(), python);
}

#[test]
fn selection_rejects_schema_mismatch() {
    for raw in [
        "",
        "python",
        r#"{"language":"python","version":"3"}"#,
        r#"{"kind":"runtime","language":"python","version":"3"}"#,
        r#"{"kind":"language","language":"","version":"3"}"#,
        r#"{"kind":"language","language":"python","version":" "}"#,
    ] {
        let err = decode_selection(raw).unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse selected language. Please try again.", "{raw}");
        assert_eq!(err.error_code(), "E_PARSE_LANGUAGE");
    }
}

#[test]
fn finds_language_by_name_or_alias() {
    let langs = runtimes();
    assert_eq!(find_language(&langs, "Python").map(|l| l.version.as_str()), Some("3.10.0"));
    assert_eq!(find_language(&langs, " sh ").map(|l| l.language.as_str()), Some("bash"));
    assert!(find_language(&langs, "cobol").is_none());
}

struct FakeRunner {
    runtimes_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CodeRunner for FakeRunner {
    async fn runtimes(&self) -> Result<Vec<Language>, RunError> {
        self.runtimes_calls.fetch_add(1, Ordering::SeqCst);
        Ok(runtimes())
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, RunError> {
        let stdout = format!("{} {} {}", request.language, request.files[0].name, request.stdin);
        Ok(ExecuteResponse { run: RunResult { stdout, stderr: String::new() } })
    }
}

fn job(file_name: &str, language: Option<Language>) -> RunJob {
    RunJob { file_name: file_name.into(), code: "x".into(), stdin: "in".into(), language }
}

#[tokio::test]
async fn job_auto_selects_from_runtimes() {
    let runner = FakeRunner { runtimes_calls: 0.into() };
    let response = job("main.py", None).run(&runner).await.unwrap();
    assert_eq!(response.output(), "python main.py in");
    assert_eq!(runner.runtimes_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chosen_language_skips_the_runtimes_lookup() {
    let runner = FakeRunner { runtimes_calls: 0.into() };
    let response = job("notes.txt", Some(lang("bash", "5.2.0", &[]))).run(&runner).await.unwrap();
    assert_eq!(response.output(), "bash notes.txt in");
    assert_eq!(runner.runtimes_calls.load(Ordering::SeqCst), 0);

    let err = job("notes.txt", None).run(&runner).await.unwrap_err();
    assert!(matches!(err, RunError::NoLanguage { file_name } if file_name == "notes.txt"));
}

#[test]
fn error_messages_match_ui_copy() {
    assert!(RunError::Runtimes("x".into()).to_string().starts_with("Failed to fetch supported languages"));
    assert!(RunError::Execute("x".into()).to_string().starts_with("Failed to run the code"));
    assert!(RunError::Execute("x".into()).retryable());
    assert!(!RunError::NoLanguage { file_name: "a.txt".into() }.retryable());
}

#[test]
fn client_trims_base_url() {
    let client = ExecutionClient::new("http://localhost:2000/api/v2/piston/").unwrap();
    assert_eq!(client.url("/runtimes"), "http://localhost:2000/api/v2/piston/runtimes");
}
