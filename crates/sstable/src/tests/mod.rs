mod writer_tests;

use record::Record;

pub(crate) fn rec(s: &str) -> Record {
    Record::parse(s)
}

pub(crate) fn sample_entries() -> Vec<(String, Record)> {
    vec![
        ("a".to_string(), rec(r#"{name:"Alice" age:30}"#)),
        ("b".to_string(), rec(r#"{fruit:banana}"#)),
        ("c".to_string(), rec(r#"{note:"two words" v@7:x}"#)),
    ]
}
