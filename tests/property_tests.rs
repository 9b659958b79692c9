//! Property-based tests for rust_context_logger using proptest

use proptest::prelude::*;
use rust_context_logger::core::log_record::{is_reserved, RESERVED_FIELDS};
use rust_context_logger::prelude::*;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back regardless of case
    #[test]
    fn test_log_level_str_roundtrip(level in any_level(), use_lower in any::<bool>()) {
        let name = if use_lower { level.to_str().to_lowercase() } else { level.to_str().to_string() };
        prop_assert_eq!(name.parse::<LogLevel>().unwrap(), level);
    }

    /// Ordering follows the numeric severity
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a < b, (a as u8) < (b as u8));
    }
}

// ============================================================================
// Context Store Tests
// ============================================================================

/// Enter one scope per id; panic at `fail_at` depth if set
fn nest(ids: &[String], depth: usize, fail_at: Option<usize>) {
    if depth == ids.len() {
        return;
    }
    ContextStore::scoped(LogContext::builder().correlation_id(ids[depth].clone()), |id| {
        assert_eq!(id, ids[depth]);
        assert_eq!(ContextStore::get().unwrap().correlation_id, ids[depth]);
        if fail_at == Some(depth) {
            panic!("failure at depth {}", depth);
        }
        nest(ids, depth + 1, fail_at);
        // the inner scope un-shadowed this one
        assert_eq!(ContextStore::get().unwrap().correlation_id, ids[depth]);
    });
}

proptest! {
    /// Save/restore is a perfect stack, on success and on failure
    #[test]
    fn test_nested_scopes_restore(
        initial in proptest::option::of("[a-z]{1,8}"),
        ids in proptest::collection::vec("[a-z0-9]{1,12}", 0..8),
        fail_at in proptest::option::of(0usize..8),
    ) {
        match &initial {
            Some(id) => ContextStore::set(LogContext::new(id.clone())),
            None => ContextStore::clear(),
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| nest(&ids, 0, fail_at)));
        let should_fail = fail_at.map_or(false, |d| d < ids.len());
        prop_assert_eq!(outcome.is_err(), should_fail);

        let after = ContextStore::get().map(|c| c.correlation_id.clone());
        prop_assert_eq!(after, initial);
        ContextStore::clear();
    }
}

// ============================================================================
// Record Builder Tests
// ============================================================================

fn field_key() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(RESERVED_FIELDS).prop_map(str::to_string),
        "[a-z_]{1,10}",
    ]
}

proptest! {
    /// Built records never carry reserved names in `fields`
    #[test]
    fn test_reserved_fields_never_in_record(
        keys in proptest::collection::vec(field_key(), 0..16),
        level in any_level(),
    ) {
        let mut builder = RecordBuilder::new(level, "msg");
        for (i, key) in keys.iter().enumerate() {
            builder = builder.field(key.clone(), i as i64);
        }
        let record = builder.build("prop");

        prop_assert!(record.fields.keys().all(|k| !is_reserved(k)));
        for key in keys.iter().filter(|k| !is_reserved(k)) {
            prop_assert!(record.fields.contains_key(key));
        }
        prop_assert_eq!(record.level, level);
        prop_assert_eq!(record.message.as_str(), "msg");
    }

    /// Messages never span lines, whatever the input
    #[test]
    fn test_message_sanitization(message in ".*") {
        let record = RecordBuilder::new(LogLevel::Info, message).build("prop");
        prop_assert!(!record.message.contains('\n'));
        prop_assert!(!record.message.contains('\r'));
    }
}

// ============================================================================
// Formatter Tests
// ============================================================================

proptest! {
    /// Structured output is one parseable line that preserves primitive types
    #[test]
    fn test_structured_line_roundtrip(
        message in ".*",
        text in ".*",
        int in any::<i64>(),
        flag in any::<bool>(),
        // quarter steps print and parse back exactly
        float in (-4_000_000i32..4_000_000).prop_map(|v| f64::from(v) / 4.0),
    ) {
        let record = RecordBuilder::new(LogLevel::Info, message)
            .field("text", text.clone())
            .field("int", int)
            .field("flag", flag)
            .field("float", float)
            .field("none", Option::<String>::None)
            .build("prop");
        let line = StructuredFormatter::new().format(&record);

        prop_assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(parsed["message"].as_str().unwrap(), record.message.as_str());
        prop_assert_eq!(parsed["text"].as_str().unwrap(), text.as_str());
        prop_assert_eq!(parsed["int"].as_i64().unwrap(), int);
        prop_assert_eq!(parsed["flag"].as_bool().unwrap(), flag);
        prop_assert_eq!(parsed["float"].as_f64().unwrap(), float);
        prop_assert!(parsed["none"].is_null());
    }

    /// The console ID tag is the first eight characters of the correlation id
    #[test]
    fn test_console_id_prefix(id in "[a-f0-9-]{1,40}", message in "[ -~]{0,40}") {
        let record = RecordBuilder::new(LogLevel::Warning, message.clone())
            .context(Some(Arc::new(LogContext::new(id.clone()))))
            .build("prop");
        let line = ConsoleFormatter::with_color_mode(ColorMode::Never).format(&record);

        let prefix: String = id.chars().take(8).collect();
        let expected_tail = format!("prop: {} [ID: {}]", message, prefix);
        prop_assert!(line.ends_with(&expected_tail));
    }
}

// ============================================================================
// Rotation Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Backups stay bounded, files stay under the limit unless they hold a
    /// single oversized line, and the newest line is always in the current file
    #[test]
    fn test_rotation_bounds(
        lengths in proptest::collection::vec(1usize..120, 1..60),
        max_size in 40u64..400,
        backups in 0usize..4,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("prop.log");
        let policy = RotationPolicy::new().with_max_size(max_size).with_max_backups(backups);
        let sink = RotatingFileSink::with_policy(&base, policy).unwrap();

        for (i, len) in lengths.iter().enumerate() {
            let line = format!("{:03}{}", i, "z".repeat(*len));
            sink.write(&line).unwrap();
        }

        prop_assert!(!sink.backup_path(backups + 1).exists());
        let files = fs::read_dir(dir.path()).unwrap().count();
        prop_assert!(files <= backups + 1);

        let mut paths = vec![base.clone()];
        paths.extend((1..=backups).map(|i| sink.backup_path(i)).filter(|p| p.exists()));
        for path in paths {
            let content = fs::read_to_string(&path).unwrap();
            let size = content.len() as u64;
            prop_assert!(size <= max_size || content.lines().count() == 1);
        }

        let current = fs::read_to_string(&base).unwrap();
        let last = format!("{:03}", lengths.len() - 1);
        prop_assert!(current.lines().last().unwrap().starts_with(&last));
    }
}
