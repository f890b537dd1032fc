//! Tests for whole programs loaded from JSON
//!
//! Each program goes through parse, serialize, deserialize and compile before
//! it runs, so these also cover the program document format.

use super::helpers::{context_with, images, ints, load_program};
use crate::config::EngineConfig;
use crate::interpreter::{run_main, EngineError, RunMode, Value};
use crate::model::ProgramDecl;
use maplit::hashmap;
use std::collections::HashMap;
use std::sync::Arc;

/// In-place quicksort with Lomuto partitioning over 1-based lists
const QUICKSORT: &str = r#"{
    "methods": [
        {
            "name": "qsort",
            "params": ["l", "lo", "hi"],
            "locals": ["p"],
            "body": [
                {"type": "If",
                 "cond": {"type": "Call", "name": "<", "args": [{"type": "Var", "name": "lo"}, {"type": "Var", "name": "hi"}]},
                 "then_e": {"type": "Block", "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "p"},
                     "value": {"type": "Call", "name": "partition", "args": [
                        {"type": "Var", "name": "l"}, {"type": "Var", "name": "lo"}, {"type": "Var", "name": "hi"}]}},
                    {"type": "Call", "name": "qsort", "args": [
                        {"type": "Var", "name": "l"},
                        {"type": "Var", "name": "lo"},
                        {"type": "Call", "name": "-", "args": [{"type": "Var", "name": "p"}, {"type": "Lit", "v": 1}]}]},
                    {"type": "Call", "name": "qsort", "args": [
                        {"type": "Var", "name": "l"},
                        {"type": "Call", "name": "+", "args": [{"type": "Var", "name": "p"}, {"type": "Lit", "v": 1}]},
                        {"type": "Var", "name": "hi"}]}
                 ]}},
                {"type": "Return", "value": {"type": "Var", "name": "l"}}
            ]
        },
        {
            "name": "partition",
            "params": ["l", "lo", "hi"],
            "locals": ["pivot", "i", "j"],
            "body": [
                {"type": "Assign", "target": {"type": "Var", "name": "pivot"},
                 "value": {"type": "Index", "object": {"type": "Var", "name": "l"}, "key": {"type": "Var", "name": "hi"}}},
                {"type": "Assign", "target": {"type": "Var", "name": "i"},
                 "value": {"type": "Call", "name": "-", "args": [{"type": "Var", "name": "lo"}, {"type": "Lit", "v": 1}]}},
                {"type": "Every",
                 "expr": {"type": "Assign", "target": {"type": "Var", "name": "j"},
                          "value": {"type": "Range",
                                    "from": {"type": "Var", "name": "lo"},
                                    "to": {"type": "Call", "name": "-", "args": [{"type": "Var", "name": "hi"}, {"type": "Lit", "v": 1}]}}},
                 "body": {"type": "If",
                          "cond": {"type": "Call", "name": "<=", "args": [
                              {"type": "Index", "object": {"type": "Var", "name": "l"}, "key": {"type": "Var", "name": "j"}},
                              {"type": "Var", "name": "pivot"}]},
                          "then_e": {"type": "Block", "body": [
                              {"type": "AugAssign", "op": "+", "target": {"type": "Var", "name": "i"}, "value": {"type": "Lit", "v": 1}},
                              {"type": "Swap",
                               "left": {"type": "Index", "object": {"type": "Var", "name": "l"}, "key": {"type": "Var", "name": "i"}},
                               "right": {"type": "Index", "object": {"type": "Var", "name": "l"}, "key": {"type": "Var", "name": "j"}}}
                          ]}}},
                {"type": "Swap",
                 "left": {"type": "Index", "object": {"type": "Var", "name": "l"},
                          "key": {"type": "Call", "name": "+", "args": [{"type": "Var", "name": "i"}, {"type": "Lit", "v": 1}]}},
                 "right": {"type": "Index", "object": {"type": "Var", "name": "l"}, "key": {"type": "Var", "name": "hi"}}},
                {"type": "Return", "value": {"type": "Call", "name": "+", "args": [{"type": "Var", "name": "i"}, {"type": "Lit", "v": 1}]}}
            ]
        },
        {
            "name": "main",
            "params": ["args"],
            "body": [
                {"type": "Assign", "target": {"type": "Var", "name": "l"},
                 "value": {"type": "List", "items": [
                    {"type": "Lit", "v": 5}, {"type": "Lit", "v": 3}, {"type": "Lit", "v": 8}, {"type": "Lit", "v": 1},
                    {"type": "Lit", "v": 9}, {"type": "Lit", "v": 2}, {"type": "Lit", "v": 7}, {"type": "Lit", "v": 4}]}},
                {"type": "Return", "value": {"type": "Call", "name": "qsort", "args": [
                    {"type": "Var", "name": "l"},
                    {"type": "Lit", "v": 1},
                    {"type": "Call", "name": "size", "args": [{"type": "Var", "name": "l"}]}]}}
            ]
        }
    ]
}"#;

/* ===================== Quicksort ===================== */

#[test]
fn test_quicksort_with_pool() {
    let (program, _) = load_program(QUICKSORT);
    let mut cx = context_with(&program, EngineConfig::default());
    let sorted = cx.first("main", &[Value::list(vec![])]).unwrap().unwrap();
    assert_eq!(sorted.image(), "[1,2,3,4,5,7,8,9]");
    assert!(cx.pool().stats().hits > 0);
}

#[test]
fn test_quicksort_without_pool() {
    let (program, _) = load_program(QUICKSORT);
    let mut cx = context_with(&program, EngineConfig::default().with_pool(false));
    let sorted = cx.first("main", &[Value::list(vec![])]).unwrap().unwrap();
    assert_eq!(sorted.image(), "[1,2,3,4,5,7,8,9]");
    assert_eq!(cx.pool().stats().hits, 0);
}

#[test]
fn test_quicksort_through_run_main() {
    let (program, _) = load_program(QUICKSORT);
    let results = run_main(program, Arc::new(EngineConfig::default()), vec![], RunMode::All).unwrap();
    assert_eq!(images(&results), vec!["[1,2,3,4,5,7,8,9]"]);
}

/// Loops, limitation and reversible assignment in one body
const MIX: &str = r#"{
    "methods": [
        {"name": "mix", "params": ["n"], "locals": ["out", "i", "x"], "body": [
            {"type": "Assign", "target": {"type": "Var", "name": "out"}, "value": {"type": "List", "items": []}},
            {"type": "Assign", "target": {"type": "Var", "name": "i"}, "value": {"type": "Lit", "v": 0}},
            {"type": "While",
             "cond": {"type": "Call", "name": "<", "args": [{"type": "Var", "name": "i"}, {"type": "Var", "name": "n"}]},
             "body": {"type": "Block", "body": [
                {"type": "AugAssign", "op": "+", "target": {"type": "Var", "name": "i"}, "value": {"type": "Lit", "v": 1}},
                {"type": "Call", "name": "put", "args": [{"type": "Var", "name": "out"}, {"type": "Var", "name": "i"}]}]}},
            {"type": "Every", "expr": {"type": "Call", "name": "put", "args": [
                {"type": "Var", "name": "out"},
                {"type": "Limit",
                 "expr": {"type": "Range", "from": {"type": "Lit", "v": 10}, "to": {"type": "Lit", "v": 100}},
                 "count": {"type": "Lit", "v": 2}}]}},
            {"type": "Assign", "target": {"type": "Var", "name": "x"}, "value": {"type": "Lit", "v": 7}},
            {"type": "Every",
             "expr": {"type": "RevAssign", "target": {"type": "Var", "name": "x"},
                      "value": {"type": "Range", "from": {"type": "Lit", "v": 1}, "to": {"type": "Lit", "v": 3}}},
             "body": {"type": "Call", "name": "put", "args": [{"type": "Var", "name": "out"}, {"type": "Var", "name": "x"}]}},
            {"type": "Call", "name": "put", "args": [{"type": "Var", "name": "out"}, {"type": "Var", "name": "x"}]},
            {"type": "Return", "value": {"type": "Var", "name": "out"}}
        ]}
    ]
}"#;

#[test]
fn test_pooled_and_fresh_bodies_agree() {
    let (program, _) = load_program(MIX);
    let mut pooled = context_with(&program, EngineConfig::default());
    let mut fresh = context_with(&program, EngineConfig::default().with_pool(false));
    for (n, expected) in [(3, "[1,2,3,10,11,1,2,3,7]"), (2, "[1,2,10,11,1,2,3,7]")] {
        let a = pooled.first("mix", &[n.into()]).unwrap().unwrap();
        let b = fresh.first("mix", &[n.into()]).unwrap().unwrap();
        assert_eq!(a.image(), expected);
        assert_eq!(b.image(), expected);
    }
    assert!(pooled.pool().stats().hits > 0);
    assert_eq!(fresh.pool().stats().hits, 0);
}

/* ===================== Entry points ===================== */

const COUNTDOWN: &str = r#"{
    "methods": [
        {"name": "main", "params": ["args"], "body": [
            {"type": "Suspend", "value": {"type": "Range",
                "from": {"type": "Call", "name": "integer", "args": [
                    {"type": "Index", "object": {"type": "Var", "name": "args"}, "key": {"type": "Lit", "v": 1}}]},
                "to": {"type": "Lit", "v": 1},
                "by": {"type": "Lit", "v": -1}}}
        ]}
    ]
}"#;

#[test]
fn test_run_main_modes() {
    let (program, _) = load_program(COUNTDOWN);
    let config = Arc::new(EngineConfig::default());

    let all = run_main(program.clone(), config.clone(), vec!["3".into()], RunMode::All).unwrap();
    assert_eq!(ints(&all), vec![3, 2, 1]);

    let first = run_main(program, config, vec!["3".into()], RunMode::First).unwrap();
    assert_eq!(ints(&first), vec![3]);
}

#[test]
fn test_run_main_requires_main() {
    let (program, _) = load_program(r#"{"methods": [{"name": "helper", "body": []}]}"#);
    let result = run_main(program, Arc::new(EngineConfig::default()), vec![], RunMode::All);
    assert_eq!(result, Err(EngineError::UnknownCallee("main".to_string())));
}

/* ===================== Output, globals and records ===================== */

#[test]
fn test_every_write_prints_each_result() {
    let (program, output) = load_program(
        r#"{"methods": [{"name": "main", "body": [
            {"type": "Every", "expr": {"type": "Call", "name": "write", "args": [
                {"type": "Range", "from": {"type": "Lit", "v": 1}, "to": {"type": "Lit", "v": 3}}]}}
        ]}]}"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    assert_eq!(cx.results("main", &[]).unwrap(), vec![]);
    assert_eq!(output.contents(), "1\n2\n3\n");
}

#[test]
fn test_globals_shared_between_calls() {
    let (program, _) = load_program(
        r#"{
            "globals": ["counter"],
            "methods": [
                {"name": "bump", "body": [
                    {"type": "If",
                     "cond": {"type": "Call", "name": "===", "args": [{"type": "Var", "name": "counter"}, {"type": "Null"}]},
                     "then_e": {"type": "Assign", "target": {"type": "Var", "name": "counter"}, "value": {"type": "Lit", "v": 0}}},
                    {"type": "AugAssign", "op": "+", "target": {"type": "Var", "name": "counter"}, "value": {"type": "Lit", "v": 1}},
                    {"type": "Return", "value": {"type": "Var", "name": "counter"}}
                ]},
                {"name": "main", "body": [
                    {"type": "Call", "name": "bump", "args": []},
                    {"type": "Call", "name": "bump", "args": []},
                    {"type": "Return", "value": {"type": "Call", "name": "bump", "args": []}}
                ]}
            ]
        }"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    assert_eq!(cx.first("main", &[]).unwrap(), Some(Value::Integer(3)));
    assert_eq!(program.globals().get("counter"), Value::Integer(3));
}

#[test]
fn test_record_fields() {
    let (program, _) = load_program(
        r#"{
            "records": [{"name": "point", "fields": ["x", "y"]}],
            "methods": [
                {"name": "main", "locals": ["p"], "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "p"},
                     "value": {"type": "Call", "name": "point", "args": [{"type": "Lit", "v": 1}, {"type": "Lit", "v": 2}]}},
                    {"type": "Assign", "target": {"type": "Field", "object": {"type": "Var", "name": "p"}, "name": "x"},
                     "value": {"type": "Lit", "v": 10}},
                    {"type": "Return", "value": {"type": "Call", "name": "+", "args": [
                        {"type": "Field", "object": {"type": "Var", "name": "p"}, "name": "x"},
                        {"type": "Field", "object": {"type": "Var", "name": "p"}, "name": "y"}]}}
                ]}
            ]
        }"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    assert_eq!(cx.first("main", &[]).unwrap(), Some(Value::Integer(12)));
}

#[test]
fn test_coexpression_in_program() {
    let (program, _) = load_program(
        r#"{
            "methods": [
                {"name": "gen", "body": [
                    {"type": "Suspend", "value": {"type": "Alt", "alts": [
                        {"type": "Lit", "v": "a"}, {"type": "Lit", "v": "b"}, {"type": "Lit", "v": "c"}]}}
                ]},
                {"name": "main", "locals": ["c"], "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "c"}, "value": {"type": "Create", "name": "gen", "args": []}},
                    {"type": "Return", "value": {"type": "List", "items": [
                        {"type": "Activate", "target": {"type": "Var", "name": "c"}},
                        {"type": "Activate", "target": {"type": "Var", "name": "c"}},
                        {"type": "Activate", "target": {"type": "Var", "name": "c"}},
                        {"type": "Call", "name": "size", "args": [{"type": "Var", "name": "c"}]}]}}
                ]}
            ]
        }"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    let result = cx.first("main", &[]).unwrap().unwrap();
    assert_eq!(result.image(), r#"["a","b","c",3]"#);
}

#[test]
fn test_table_word_count() {
    let (program, _) = load_program(
        r#"{
            "methods": [
                {"name": "main", "locals": ["t", "w"], "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "t"},
                     "value": {"type": "Call", "name": "table", "args": [{"type": "Lit", "v": 0}]}},
                    {"type": "Every",
                     "expr": {"type": "Assign", "target": {"type": "Var", "name": "w"},
                              "value": {"type": "Promote", "expr": {"type": "List", "items": [
                                  {"type": "Lit", "v": "a"}, {"type": "Lit", "v": "b"}, {"type": "Lit", "v": "a"}]}}},
                     "body": {"type": "AugAssign", "op": "+",
                              "target": {"type": "Index", "object": {"type": "Var", "name": "t"}, "key": {"type": "Var", "name": "w"}},
                              "value": {"type": "Lit", "v": 1}}},
                    {"type": "Return", "value": {"type": "Var", "name": "t"}}
                ]}
            ]
        }"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    let Some(Value::Table(table)) = cx.first("main", &[]).unwrap() else {
        panic!("expected a table");
    };
    let counts: HashMap<String, i64> = table
        .entries()
        .into_iter()
        .map(|(key, value)| {
            let word = key.to_value().to_text().unwrap().to_string();
            (word, value.to_integer().unwrap())
        })
        .collect();
    assert_eq!(counts, hashmap! {"a".to_string() => 2, "b".to_string() => 1});
}

/* ===================== Scanning, sets and comprehension ===================== */

#[test]
fn test_scanning_splits_words() {
    let (program, _) = load_program(
        r#"{
            "methods": [
                {"name": "words", "params": ["s"], "locals": ["out"], "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "out"}, "value": {"type": "List", "items": []}},
                    {"type": "Scan", "subject": {"type": "Var", "name": "s"}, "body": {"type": "Block", "body": [
                        {"type": "While",
                         "cond": {"type": "Call", "name": "put", "args": [
                            {"type": "Var", "name": "out"},
                            {"type": "Call", "name": "tab", "args": [
                                {"type": "Call", "name": "upto", "args": [{"type": "Lit", "v": " "}]}]}]},
                         "body": {"type": "Call", "name": "move", "args": [{"type": "Lit", "v": 1}]}},
                        {"type": "Call", "name": "put", "args": [
                            {"type": "Var", "name": "out"},
                            {"type": "Call", "name": "tab", "args": [{"type": "Lit", "v": 0}]}]}]}},
                    {"type": "Return", "value": {"type": "Var", "name": "out"}}
                ]}
            ]
        }"#,
    );
    let mut cx = context_with(&program, EngineConfig::default());
    let words = cx.first("words", &["the quick fox".into()]).unwrap().unwrap();
    assert_eq!(words.image(), r#"["the","quick","fox"]"#);
}

#[test]
fn test_sets_structure_keys_and_comprehension() {
    let (program, _) = load_program(
        r#"{
            "methods": [
                {"name": "main", "params": ["args"], "locals": ["s", "t", "k", "x", "seen"], "body": [
                    {"type": "Assign", "target": {"type": "Var", "name": "s"},
                     "value": {"type": "Call", "name": "set", "args": [{"type": "List", "items": [
                        {"type": "Lit", "v": 1}, {"type": "Lit", "v": 2}, {"type": "Lit", "v": 2}, {"type": "Lit", "v": 3}]}]}},
                    {"type": "Call", "name": "insert", "args": [{"type": "Var", "name": "s"}, {"type": "Lit", "v": 4}]},
                    {"type": "Assign", "target": {"type": "Var", "name": "t"},
                     "value": {"type": "Call", "name": "table", "args": [{"type": "Lit", "v": 0}]}},
                    {"type": "Assign", "target": {"type": "Var", "name": "k"}, "value": {"type": "List", "items": []}},
                    {"type": "Assign", "target": {"type": "Index", "object": {"type": "Var", "name": "t"}, "key": {"type": "Var", "name": "k"}},
                     "value": {"type": "Lit", "v": 5}},
                    {"type": "Assign", "target": {"type": "Var", "name": "seen"},
                     "value": {"type": "ListComp", "expr": {"type": "In", "name": "x",
                        "expr": {"type": "Range", "from": {"type": "Lit", "v": 1}, "to": {"type": "Lit", "v": 3}}}}},
                    {"type": "If",
                     "cond": {"type": "Call", "name": "===", "args": [{"type": "Main"}, {"type": "Current"}]},
                     "then_e": {"type": "Return", "value": {"type": "List", "items": [
                        {"type": "Call", "name": "size", "args": [{"type": "Var", "name": "s"}]},
                        {"type": "Index", "object": {"type": "Var", "name": "t"}, "key": {"type": "Var", "name": "k"}},
                        {"type": "Index", "object": {"type": "Var", "name": "t"}, "key": {"type": "List", "items": []}},
                        {"type": "Var", "name": "x"},
                        {"type": "Call", "name": "size", "args": [{"type": "Var", "name": "seen"}]}]}}}
                ]}
            ]
        }"#,
    );
    let results = run_main(program, Arc::new(EngineConfig::default()), vec![], RunMode::All).unwrap();
    assert_eq!(images(&results), vec!["[4,5,0,3,3]"]);
}

/* ===================== Document format ===================== */

#[test]
fn test_program_document_round_trip() {
    let decl = ProgramDecl::from_json(QUICKSORT).unwrap();
    let again = ProgramDecl::from_json(&decl.to_json().unwrap()).unwrap();
    assert_eq!(decl, again);
    assert_eq!(decl.methods.len(), 3);
}
