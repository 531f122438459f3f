use super::*;

fn file() -> FileId {
    FileId::from("f-1")
}

#[test]
fn pause_fires_once_after_quiet_window() {
    let start = Instant::now();
    let mut editor = EditorState::default();
    editor.keystroke(start);
    editor.keystroke(start + Duration::from_millis(400));

    assert!(!editor.pause_elapsed(start + Duration::from_millis(1000)));
    assert!(editor.pause_elapsed(start + Duration::from_millis(1400)));
    assert!(!editor.pause_elapsed(start + Duration::from_millis(5000)));
    assert_eq!(editor.deadline(), None);
}

#[test]
fn suggestion_requires_ai_enabled() {
    let mut editor = EditorState::new(false);
    assert!(editor.begin_suggestion(&file(), "a.py", "print(1)").is_none());

    editor.set_ai_enabled(true);
    let request = editor.begin_suggestion(&file(), "a.py", "print(1)").unwrap();
    assert_eq!(request.language, "python");
    assert!(request.prompt.contains("python code snippet"));
    assert!(request.prompt.ends_with("print(1)"));
}

#[test]
fn only_one_suggestion_in_flight() {
    let mut editor = EditorState::new(true);
    assert!(editor.begin_suggestion(&file(), "a.js", "x").is_some());
    assert!(editor.begin_suggestion(&file(), "a.js", "x").is_none());
    assert_eq!(editor.suggestion(), &Suggestion::Processing { file_id: file() });
}

#[test]
fn blank_code_gets_no_suggestion() {
    let mut editor = EditorState::new(true);
    assert!(editor.begin_suggestion(&file(), "a.js", "  \n").is_none());
}

#[test]
fn finished_suggestion_is_trimmed_and_held() {
    let mut editor = EditorState::new(true);
    editor.begin_suggestion(&file(), "a.js", "x");
    assert!(editor.finish_suggestion(&file(), Some("  let y = 2;\n".into())));

    assert!(editor.take_ready(&FileId::from("other")).is_none());
    assert_eq!(editor.take_ready(&file()).as_deref(), Some("let y = 2;"));
    assert_eq!(editor.suggestion(), &Suggestion::Idle);
}

#[test]
fn failed_or_empty_suggestion_returns_to_idle() {
    let mut editor = EditorState::new(true);
    editor.begin_suggestion(&file(), "a.js", "x");
    assert!(!editor.finish_suggestion(&file(), None));
    assert_eq!(editor.suggestion(), &Suggestion::Idle);

    editor.begin_suggestion(&file(), "a.js", "x");
    assert!(!editor.finish_suggestion(&file(), Some("   ".into())));
    assert_eq!(editor.suggestion(), &Suggestion::Idle);
}

#[test]
fn stale_result_is_ignored() {
    let mut editor = EditorState::new(true);
    editor.begin_suggestion(&file(), "a.js", "x");
    editor.dismiss();
    assert!(!editor.finish_suggestion(&file(), Some("late".into())));
    assert_eq!(editor.suggestion(), &Suggestion::Idle);
}

#[test]
fn reset_cancels_timer_and_suggestion() {
    let start = Instant::now();
    let mut editor = EditorState::new(true);
    editor.keystroke(start);
    editor.begin_suggestion(&file(), "a.js", "x");
    editor.reset();

    assert!(!editor.pause_elapsed(start + TYPING_PAUSE * 2));
    assert_eq!(editor.suggestion(), &Suggestion::Idle);
}
