use super::*;

fn rec(s: &str) -> Record {
    Record::parse(s)
}

#[test]
fn parse_bare_and_quoted_values() {
    let r = rec(r#"{name:"Alice" city:London}"#);
    assert_eq!(r.get("name").unwrap().value, "Alice");
    assert_eq!(r.get("name").unwrap().version, 1);
    assert_eq!(r.get("city").unwrap().value, "London");
}

#[test]
fn parse_without_outer_braces() {
    let r = rec(r#"name:"Alice" age:30"#);
    assert_eq!(r.len(), 2);
    assert_eq!(r.get("age").unwrap().value, "30");
}

#[test]
fn parse_explicit_versions() {
    let r = rec(r#"{address@2:"Wonderland" name:Alice}"#);
    assert_eq!(r.get("address").unwrap().version, 2);
    assert_eq!(r.get("name").unwrap().version, 1);
}

#[test]
fn quoted_value_keeps_spaces_and_braces() {
    let r = rec(r#"{note:"a b {c}" x:1}"#);
    assert_eq!(r.get("note").unwrap().value, "a b {c}");
    assert_eq!(r.get("x").unwrap().value, "1");
}

#[test]
fn duplicate_field_last_occurrence_wins() {
    let r = rec("{x:a x:b}");
    assert_eq!(r.len(), 1);
    assert_eq!(r.get("x").unwrap().value, "b");
}

#[test]
fn malformed_fragment_is_skipped() {
    // "broken" has no colon; the scanner resumes at the next field.
    let r = rec("{broken x:1}");
    assert_eq!(r.len(), 1);
    assert_eq!(r.get("x").unwrap().value, "1");
}

#[test]
fn unterminated_quote_discards_the_rest() {
    let r = rec(r#"{a:1 b:"oops"#);
    assert_eq!(r.len(), 1);
    assert!(r.get("a").is_some());
}

#[test]
fn garbage_input_yields_empty_record() {
    assert!(rec("{:::}").is_empty());
    assert!(rec("").is_empty());
    assert!(rec("{}").is_empty());
}

#[test]
fn version_overflow_is_malformed() {
    let r = rec("{f@99999999999:x g:1}");
    assert!(r.get("f").is_none());
    assert_eq!(r.get("g").unwrap().value, "1");
}

#[test]
fn display_sorts_fields_and_elides_version_one() {
    let r = rec(r#"{b@3:two a:one}"#);
    assert_eq!(r.to_string(), r#"{a:"one" b@3:"two"}"#);
}

#[test]
fn display_always_quotes_values() {
    let mut r = Record::new();
    r.insert("note", FieldValue::new(1, "two words"));
    r.insert("plain", FieldValue::new(1, "word"));
    assert_eq!(r.to_string(), r#"{note:"two words" plain:"word"}"#);
}

#[test]
fn empty_record_serializes_to_braces() {
    assert_eq!(Record::new().to_string(), "{}");
}

#[test]
fn parse_serialize_round_trip() {
    let cases = [
        "{a:1}",
        "{a:1 b@2:2}",
        r#"{name:"Alice Liddell" place:Wonderland}"#,
        "{x@42:y}",
    ];
    for case in cases {
        let r = rec(case);
        assert_eq!(Record::parse(&r.to_string()), r, "round trip of {case}");
    }
}

#[test]
fn merge_copies_one_sided_fields() {
    let mut a = rec("{a:1}");
    a.merge(&rec("{b:2}"));
    assert_eq!(a.to_string(), "{a:1 b:2}");
}

#[test]
fn merge_higher_version_wins_either_side() {
    let mut a = rec("{f@3:old}");
    a.merge(&rec("{f@2:older}"));
    assert_eq!(a.get("f").unwrap().value, "old");

    let mut b = rec("{f@2:old}");
    b.merge(&rec("{f@3:new}"));
    assert_eq!(b.get("f").unwrap().value, "new");
}

#[test]
fn merge_equal_versions_take_right_operand() {
    let mut a = rec(r#"{x:"a"}"#);
    a.merge(&rec(r#"{x:"b"}"#));
    assert_eq!(a.get("x").unwrap().value, "b");
}

#[test]
fn merge_is_idempotent() {
    let mut a = rec(r#"{a:1 b@2:"two words"}"#);
    let orig = a.clone();
    a.merge(&orig);
    assert_eq!(a, orig);
}

#[test]
fn merge_commutes_without_version_ties() {
    let a = rec("{x@1:a z@5:q}");
    let b = rec("{x@2:b y:c}");

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);
    assert_eq!(ab, ba);
}

#[test]
fn merge_left_fold_matches_write_order() {
    // Folding writes oldest to newest: the newest write's value survives a
    // version tie at every step.
    let writes = ["{f:1}", "{f:2}", "{f:3 g:x}"];
    let mut acc = Record::new();
    for w in writes {
        acc.merge(&rec(w));
    }
    assert_eq!(acc.get("f").unwrap().value, "3");
    assert_eq!(acc.get("g").unwrap().value, "x");
}

#[test]
fn keyed_record_parses_wal_entry_forms() {
    let braced = KeyedRecord::parse("{@u-1 {a:1 b@2:2}}\n").unwrap();
    assert_eq!(braced.key, "u-1");
    assert_eq!(braced.fields.len(), 2);

    let bare = KeyedRecord::parse("{@u-2 a:1}").unwrap();
    assert_eq!(bare.key, "u-2");
    assert_eq!(bare.fields.get("a").unwrap().value, "1");
}

#[test]
fn quoted_input_round_trips_byte_for_byte() {
    let input = r#"{address@2:"Wonderland" name:"Alice"}"#;
    assert_eq!(rec(input).to_string(), input);
}

#[test]
fn keyed_record_display_round_trips() {
    let kr = KeyedRecord::new("6e88d1ce", rec(r#"{name:"Alice"}"#));
    let line = kr.to_string();
    assert_eq!(line, r#"{@6e88d1ce {name:"Alice"}}"#);
    assert_eq!(KeyedRecord::parse(&line).unwrap(), kr);
}

#[test]
fn keyed_record_rejects_shapeless_lines() {
    assert!(KeyedRecord::parse("not an entry").is_none());
    assert!(KeyedRecord::parse("{a:1}").is_none());
    assert!(KeyedRecord::parse("{@}").is_none());
    assert!(KeyedRecord::parse("{@nospace}").is_none());
}
