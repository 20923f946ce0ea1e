//! `Debugger` を通したブレークポイントの結合テスト

use shiori_core::{
    Bindings, BreakpointError, Debugger, ErrorKind, HitCondition, Setting, Settings, SourceId,
    Value,
};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn session() -> (Debugger, SourceId) {
    let mut debugger = Debugger::new();
    let id = debugger.load_source(fixture("breakpoint1.rb")).unwrap();
    (debugger, id)
}

fn scope(b: i64) -> Bindings {
    Bindings::new().with("a", Value::Int(2)).with("b", Value::Int(b))
}

#[test]
fn file_line_breakpoint_starts_enabled_and_unhit() {
    let (mut debugger, id) = session();
    let created = debugger
        .create_breakpoint(&format!("{}:14", id.path().display()))
        .unwrap();

    let bp = &created.breakpoint;
    assert!(created.condition_error.is_none());
    assert_eq!(bp.id, 1);
    assert_eq!(bp.source, id);
    assert_eq!(bp.line, 14);
    assert!(bp.enabled);
    assert_eq!(bp.hit_count, 0);
    assert_eq!(bp.condition, None);
    assert_eq!(
        debugger.created_message(bp),
        format!("Breakpoint 1 file {}, line 14", id.path().display())
    );
}

#[test]
fn line_out_of_range_leaves_registry_unchanged() {
    let (mut debugger, _) = session();
    let err = debugger.create_breakpoint("100").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LineOutOfRange);
    assert_eq!(err.to_string(), "There are only 17 lines in file \"breakpoint1.rb\".");
    assert_eq!(debugger.breakpoints().count(), 0);
}

#[test]
fn non_stopping_line_is_rejected() {
    let (mut debugger, _) = session();
    let err = debugger.create_breakpoint("8").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAStoppingPoint);
    assert_eq!(err.to_string(), "Line 8 is not a stopping point in file \"breakpoint1.rb\".");
    assert_eq!(debugger.breakpoints().count(), 0);
}

#[test]
fn listing_follows_creation_order() {
    let (mut debugger, _) = session();
    debugger.create_breakpoint("14").unwrap();
    debugger.create_breakpoint("15").unwrap();

    let listed: Vec<_> = debugger.breakpoints().map(|bp| (bp.id, bp.line)).collect();
    assert_eq!(listed, vec![(1, 14), (2, 15)]);

    debugger.set(Setting::Basename, true);
    assert_eq!(
        debugger.listing(),
        "Num Enb What\n  1 y   at breakpoint1.rb:14\n  2 y   at breakpoint1.rb:15\n"
    );
}

#[test]
fn disable_then_enable_keeps_state() {
    let (mut debugger, id) = session();
    let bp_id = debugger.create_breakpoint("14 if b == 5").unwrap().breakpoint.id;
    debugger.notify_reached(&id, 14, &scope(5)).unwrap();

    assert_eq!(debugger.disable_breakpoints(&[bp_id]), vec![Ok(bp_id)]);
    assert!(debugger.notify_reached(&id, 14, &scope(5)).is_none());
    assert_eq!(debugger.enable_breakpoints(&[bp_id]), vec![Ok(bp_id)]);

    let bp = debugger.breakpoint(bp_id).unwrap();
    assert!(bp.enabled);
    assert_eq!(bp.hit_count, 1);
    assert_eq!(bp.expr(), Some("b == 5"));
}

#[test]
fn deleted_breakpoint_no_longer_stops() {
    let (mut debugger, id) = session();
    let bp_id = debugger.create_breakpoint("14").unwrap().breakpoint.id;
    assert!(debugger.notify_reached(&id, 14, &scope(5)).is_some());

    debugger.delete_breakpoint(bp_id).unwrap();
    assert_eq!(debugger.breakpoints().count(), 0);
    assert!(debugger.notify_reached(&id, 14, &scope(5)).is_none());
}

#[test]
fn conditional_breakpoint_fires_only_when_true() {
    let (mut debugger, id) = session();
    debugger.create_breakpoint("14 if b == 5").unwrap();

    assert!(debugger.notify_reached(&id, 14, &scope(3)).is_none());
    let hit = debugger.notify_reached(&id, 14, &scope(5)).unwrap();
    assert_eq!(hit.hit_count, 1);
    assert_eq!(
        debugger.hit_message(&hit),
        format!("Breakpoint 1 at {}:14", id.path().display())
    );
}

#[test]
fn malformed_condition_at_creation_is_dropped() {
    let (mut debugger, id) = session();
    let created = debugger.create_breakpoint("14 if b -=) 3").unwrap();

    assert_eq!(
        created.condition_error.as_ref().map(|e| e.to_string()),
        Some("Expression \"b -=) 3\" syntactically incorrect; breakpoint disabled.".to_string())
    );
    assert_eq!(created.breakpoint.condition, None);
    assert!(created.breakpoint.enabled);
    assert_eq!(debugger.breakpoints().count(), 1);

    // 条件なしとして停止する
    assert!(debugger.notify_reached(&id, 14, &scope(3)).is_some());
}

#[test]
fn malformed_condition_keeps_breakpoint_disabled() {
    let (mut debugger, _) = session();
    let bp_id = debugger.create_breakpoint("14").unwrap().breakpoint.id;
    debugger.disable_breakpoints(&[bp_id]);
    debugger.set_condition(bp_id, Some("b -=( 3")).unwrap();

    let results = debugger.enable_breakpoints(&[bp_id]);
    assert_eq!(
        results[0].as_ref().unwrap_err().to_string(),
        "Expression \"b -=( 3\" syntactically incorrect; breakpoint remains disabled."
    );
    assert!(!debugger.breakpoint(bp_id).unwrap().enabled);

    // 条件を外せば有効化できる
    debugger.set_condition(bp_id, None).unwrap();
    assert_eq!(debugger.enable_breakpoints(&[bp_id]), vec![Ok(bp_id)]);
}

#[test]
fn method_locations() {
    let (mut debugger, id) = session();

    let bp = debugger.create_breakpoint("A#b").unwrap().breakpoint;
    assert_eq!((bp.source.clone(), bp.line), (id.clone(), 5));

    let bp = debugger.create_breakpoint("A.a").unwrap().breakpoint;
    assert_eq!((bp.source, bp.line), (id, 2));

    let err = debugger.create_breakpoint("B.a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownClass);
    assert_eq!(err.to_string(), "Unknown class B.");
    assert_eq!(debugger.breakpoints().count(), 2);
}

#[test]
fn hit_count_is_exact() {
    let (mut debugger, id) = session();
    let bp_id = debugger.create_breakpoint("15").unwrap().breakpoint.id;

    for _ in 0..7 {
        assert!(debugger.notify_reached(&id, 15, &Bindings::new()).is_some());
    }
    assert!(debugger.notify_reached(&id, 14, &Bindings::new()).is_none());
    assert_eq!(debugger.breakpoint(bp_id).unwrap().hit_count, 7);
}

#[test]
fn hit_condition_delays_stop() {
    let (mut debugger, id) = session();
    let bp_id = debugger.create_breakpoint("15").unwrap().breakpoint.id;
    debugger
        .set_hit_condition(bp_id, HitCondition::Equal, 2)
        .unwrap();

    let stops: Vec<bool> = (0..3)
        .map(|_| debugger.notify_reached(&id, 15, &Bindings::new()).is_some())
        .collect();
    assert_eq!(stops, vec![false, true, false]);
    assert_eq!(debugger.breakpoint(bp_id).unwrap().hit_count, 3);
}

#[test]
fn unknown_source_can_be_forced() {
    let (mut debugger, _) = session();
    let err = debugger.create_breakpoint("asf:324").unwrap_err();
    assert_eq!(err.to_string(), "No source file named asf");
    assert_eq!(debugger.breakpoints().count(), 0);

    let pending = err.pending().cloned().unwrap();
    let created = debugger.create_unverified(&pending);
    assert_eq!(created.breakpoint.source, SourceId::new("asf"));
    assert_eq!(created.breakpoint.line, 324);
    assert_eq!(debugger.breakpoints().count(), 1);
}

#[test]
fn second_file_by_relative_path() {
    let (mut debugger, _) = session();
    let other = debugger.load_source(fixture("breakpoint2.rb")).unwrap();

    let bp = debugger
        .create_breakpoint("tests/fixtures/breakpoint2.rb:4")
        .unwrap()
        .breakpoint;
    assert_eq!(bp.source, other);

    let err = debugger
        .create_breakpoint("tests/fixtures/breakpoint2.rb:5")
        .unwrap_err();
    assert_eq!(err.to_string(), "Line 5 is not a stopping point in file \"breakpoint2.rb\".");

    // 行番号だけの指定は最初に読み込んだファイルが対象
    assert_eq!(debugger.create_breakpoint("4").unwrap_err().kind(), ErrorKind::NotAStoppingPoint);
}

#[test]
fn malformed_break_arguments() {
    let (mut debugger, _) = session();
    assert_eq!(
        debugger.create_breakpoint("14 ifa b == 3").unwrap_err().to_string(),
        "Expecting 'if' in breakpoint condition; got: ifa b == 3."
    );
    assert_eq!(
        debugger.create_breakpoint("foo").unwrap_err().to_string(),
        "Invalid breakpoint location: foo."
    );
    assert_eq!(debugger.breakpoints().count(), 0);
}

#[test]
fn empty_registry_and_unknown_ids() {
    let (mut debugger, _) = session();
    let results = debugger.disable_breakpoints(&[1]);
    assert_eq!(results, vec![Err(BreakpointError::EmptyRegistry)]);
    assert_eq!(results[0].as_ref().unwrap_err().to_string(), "No breakpoints have been set.");

    debugger.create_breakpoint("14").unwrap();
    let results = debugger.disable_breakpoints(&[1, 5]);
    assert_eq!(results[0], Ok(1));
    assert_eq!(results[1].as_ref().unwrap_err().to_string(), "Breakpoint 5 not found.");
    assert!(!debugger.breakpoint(1).unwrap().enabled);
}

#[test]
fn delete_all_keeps_ids_increasing() {
    let (mut debugger, _) = session();
    debugger.create_breakpoint("14").unwrap();
    debugger.create_breakpoint("15").unwrap();
    assert_eq!(debugger.delete_all(), 2);
    assert_eq!(debugger.create_breakpoint("14").unwrap().breakpoint.id, 3);
}

#[test]
fn basename_reports() {
    let mut debugger = Debugger::with_settings(Settings {
        basename: true,
        ..Settings::default()
    });
    let id = debugger.load_source(fixture("breakpoint1.rb")).unwrap();
    let bp = debugger.create_breakpoint("14").unwrap().breakpoint;
    assert_eq!(debugger.created_message(&bp), "Breakpoint 1 file breakpoint1.rb, line 14");

    let hit = debugger.notify_reached(&id, 14, &Bindings::new()).unwrap();
    assert_eq!(debugger.hit_message(&hit), "Breakpoint 1 at breakpoint1.rb:14");
}

fn scratch_copy(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("breakpoint1.rb");
    fs::copy(fixture("breakpoint1.rb"), &path).unwrap();
    path
}

fn blank_line_14(path: &Path) {
    let text = fs::read_to_string(path).unwrap();
    let edited: Vec<&str> = text
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 13 { "" } else { line })
        .collect();
    fs::write(path, edited.join("\n") + "\n").unwrap();
}

#[test]
fn edited_source_is_reloaded_with_autoreload() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_copy(&dir);

    let mut debugger = Debugger::with_settings(Settings {
        autoreload: true,
        ..Settings::default()
    });
    debugger.load_source(&path).unwrap();
    let existing = debugger.create_breakpoint("14").unwrap().breakpoint;

    blank_line_14(&path);

    let err = debugger.create_breakpoint("14").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAStoppingPoint);
    // 既存のブレークポイントの行は変わらない
    assert_eq!(debugger.breakpoint(existing.id).unwrap().line, 14);
}

#[test]
fn edited_source_is_ignored_without_autoreload() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_copy(&dir);

    let mut debugger = Debugger::new();
    debugger.load_source(&path).unwrap();

    blank_line_14(&path);
    assert!(debugger.create_breakpoint("14").is_ok());

    // 設定を有効にした時点から変更が反映される
    debugger.set(Setting::Autoreload, true);
    assert_eq!(
        debugger.create_breakpoint("14").unwrap_err().kind(),
        ErrorKind::NotAStoppingPoint
    );
}

#[test]
fn bare_if_with_bad_expression_targets_current_line() {
    let (mut debugger, id) = session();
    assert!(debugger.notify_reached(&id, 14, &scope(5)).is_none());

    let created = debugger.create_breakpoint("if b -=) 3").unwrap();
    assert_eq!(
        created.condition_error.map(|e| e.to_string()),
        Some("Expression \"b -=) 3\" syntactically incorrect; breakpoint disabled.".to_string())
    );
    assert_eq!((created.breakpoint.source, created.breakpoint.line), (id, 14));
    assert_eq!(created.breakpoint.condition, None);
    assert!(created.breakpoint.enabled);
}

#[test]
fn lone_if_reports_empty_condition() {
    let (mut debugger, _) = session();
    let created = debugger.create_breakpoint("14 if").unwrap();
    let err = created.condition_error.unwrap();
    assert_eq!(err.kind(), ErrorKind::ConditionSyntax);
    assert_eq!(err.to_string(), "Expression \"\" syntactically incorrect; breakpoint disabled.");
    assert_eq!(created.breakpoint.condition, None);
}

#[test]
fn deeply_nested_condition_is_a_syntax_error() {
    let (mut debugger, id) = session();
    let n = 1000;
    let created = debugger
        .create_breakpoint(&format!("14 if {}b{}", "(".repeat(n), ")".repeat(n)))
        .unwrap();
    assert_eq!(created.condition_error.map(|e| e.kind()), Some(ErrorKind::ConditionSyntax));

    let bp_id = created.breakpoint.id;
    debugger.disable_breakpoints(&[bp_id]);
    debugger
        .set_condition(bp_id, Some(&format!("{}b == 5", "-".repeat(100_000))))
        .unwrap();
    assert_eq!(
        debugger.enable_breakpoints(&[bp_id])[0].as_ref().unwrap_err().kind(),
        ErrorKind::ConditionSyntax
    );
    assert!(debugger.notify_reached(&id, 14, &scope(5)).is_none());
}

#[test]
fn delete_reports_unknown_ids_individually() {
    let (mut debugger, _) = session();
    debugger.create_breakpoint("14").unwrap();
    debugger.create_breakpoint("15").unwrap();

    let results = debugger.delete_breakpoints(&[1, 9, 2]);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().map(|bp| bp.line), Ok(14));
    assert_eq!(results[1].as_ref().unwrap_err().to_string(), "Breakpoint 9 not found.");
    assert_eq!(results[2].as_ref().map(|bp| bp.line), Ok(15));
    assert_eq!(debugger.breakpoints().count(), 0);

    let results = debugger.delete_breakpoints(&[1]);
    assert_eq!(results, vec![Err(BreakpointError::EmptyRegistry)]);
}

#[test]
fn reaching_a_line_reloads_edited_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_copy(&dir);

    let mut debugger = Debugger::with_settings(Settings {
        autoreload: true,
        ..Settings::default()
    });
    let id = debugger.load_source(&path).unwrap();
    let existing = debugger.create_breakpoint("15").unwrap().breakpoint;

    blank_line_14(&path);
    let hit = debugger.notify_reached(&id, 15, &Bindings::new()).unwrap();
    assert_eq!((hit.id, hit.line), (existing.id, 15));

    // 到達時に読み直されているので、自動再読込を切っても変更後の内容で検証される
    debugger.set(Setting::Autoreload, false);
    assert_eq!(
        debugger.create_breakpoint("14").unwrap_err().kind(),
        ErrorKind::NotAStoppingPoint
    );
}
