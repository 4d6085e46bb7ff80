// Copyright (c) 2018 Fabian Schuiki

#[path = "../demos/json_grammar.rs"]
mod json_grammar;

use assert_matches::assert_matches;
use foresight::{
    Error, Expected, Occurrence, OccurrenceKey, OccurrenceKind, ParseError, ParseNode, ParserConfig,
    Token,
};
use std::sync::Arc;
use std::thread;

use crate::json_grammar::Json;

#[test]
fn parses_nested_document() {
    let json = Json::new().unwrap();
    let tree = json
        .parser
        .parse_text(&json.lexer, json.value, r#"{"a":1,"b":[true,false,null]}"#)
        .unwrap();
    assert_eq!(tree.rule, json.value);
    assert_eq!(tree.token_count(), 15);

    let object = tree.subtrees(json.object).next().unwrap();
    let items: Vec<_> = object.subtrees(json.object_item).collect();
    assert_eq!(items.len(), 2);
    match items[1].children[0] {
        ParseNode::Token(ref t) => {
            assert_eq!(t.kind, json.tokens.string);
            assert_eq!(t.image, r#""b""#);
            assert_eq!(t.offset, 7);
        }
        ref other => panic!("unexpected child {:?}", other),
    }
}

#[test]
fn keywords_keep_their_own_type() {
    let json = Json::new().unwrap();
    let out = json.lexer.tokenize("[true, null]").unwrap();
    let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            json.tokens.lsquare,
            json.tokens.tru,
            json.tokens.comma,
            json.tokens.null,
            json.tokens.rsquare,
        ]
    );
    assert!(json.parser.vocabulary().matches(json.tokens.tru, json.tokens.keyword));
}

#[test]
fn trailing_comma_in_object() {
    let json = Json::new().unwrap();
    let err = json
        .parser
        .parse_text(&json.lexer, json.value, r#"{"a":1,}"#)
        .unwrap_err();
    assert_matches!(err, Error::Parse(ParseError {
        ref rule,
        occurrence: Some(Occurrence { kind: OccurrenceKind::Consume, index: 1 }),
        ref expected,
        found: Some(ref found),
        position: 5,
    }) if rule == "objectItem"
        && expected == &Expected::Tokens(vec!["StringLiteral".into()])
        && found.image == "}");
}

#[test]
fn missing_colon() {
    let json = Json::new().unwrap();
    let err = json
        .parser
        .parse_text(&json.lexer, json.value, r#"{"a" 1}"#)
        .unwrap_err();
    assert_matches!(err, Error::Parse(ParseError {
        ref expected,
        found: Some(ref found),
        position: 2,
        ..
    }) if expected == &Expected::Tokens(vec!["Colon".into()]) && found.image == "1");
}

#[test]
fn missing_comma_in_array() {
    let json = Json::new().unwrap();
    let err = json
        .parser
        .parse_text(&json.lexer, json.value, "[1 2]")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "in `array` at CONSUME1: expected RSquare, found `2` at 1:4"
    );
}

#[test]
fn empty_input_expects_a_value() {
    let json = Json::new().unwrap();
    let out = json.lexer.tokenize(" \n\t ").unwrap();
    assert!(out.tokens.is_empty());
    let err = json.parser.parse(json.value, &out.tokens).unwrap_err();
    assert_eq!(err.expected, Expected::Description("a value".into()));
    assert_eq!(err.found, None);
    assert_eq!(err.position, 0);
}

#[test]
fn trailing_document_is_rejected() {
    let json = Json::new().unwrap();
    let err = json
        .parser
        .parse_text(&json.lexer, json.value, "{}\n{}")
        .unwrap_err();
    assert_matches!(err, Error::Parse(ParseError {
        expected: Expected::EndOfInput,
        found: Some(ref found),
        position: 2,
        ..
    }) if found.line == 2 && found.column == 1);
}

#[test]
fn unknown_characters_fail_to_lex() {
    let json = Json::new().unwrap();
    let err = json
        .parser
        .parse_text(&json.lexer, json.value, "[1,\n tru]")
        .unwrap_err();
    assert_matches!(err, Error::Lex(ref e) if e.line == 2 && e.column == 2 && e.offset == 5);
}

#[test]
fn parsing_is_repeatable() {
    let json = Json::new().unwrap();
    let text = r#"[{"x": -1.5e3}, [], {}, "s\"q"]"#;
    let first = json.parser.parse_text(&json.lexer, json.value, text).unwrap();
    let second = json.parser.parse_text(&json.lexer, json.value, text).unwrap();
    assert_eq!(first, second);
    assert!(json
        .parser
        .parse_text(&json.lexer, json.value, "[1,]")
        .is_err());
    assert_eq!(
        json.parser.parse_text(&json.lexer, json.value, text).unwrap(),
        first
    );
}

#[test]
fn introspection() {
    let json = Json::new().unwrap();
    let parser = &json.parser;
    assert_eq!(parser.rule_by_name("objectItem"), Some(json.object_item));
    assert_eq!(parser.rule_by_name("pair"), None);
    assert_eq!(parser.rule_name(json.array), "array");
    let or = parser
        .lookahead(&OccurrenceKey::new(json.value, OccurrenceKind::Or, 1))
        .unwrap();
    assert_eq!(or.branch_count(), 7);
    assert_eq!(or.depth(), 1);
    assert_eq!(or.first_tokens(2), &[json.tokens.lcurly]);
    assert!(parser
        .lookahead(&OccurrenceKey::new(json.object, OccurrenceKind::Many, 1))
        .is_some());
    assert!(parser
        .lookahead(&OccurrenceKey::new(json.object, OccurrenceKind::Many, 2))
        .is_none());
}

#[test]
fn shared_between_threads() {
    let json = Arc::new(Json::new().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let json = json.clone();
            thread::spawn(move || {
                let text = format!("[{}, {{\"n\": {}}}]", i, i + 1);
                json.parser
                    .parse_text(&json.lexer, json.value, &text)
                    .map(|tree| tree.token_count())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(9));
    }
}

#[test]
fn object_entry_point_consumes_everything() {
    let json = Json::new().unwrap();
    let out = json
        .lexer
        .tokenize(r#"{"a":1,"b":[true,false,null]}"#)
        .unwrap();
    let tree = json.parser.parse(json.object, &out.tokens).unwrap();
    assert_eq!(tree.rule, json.object);
    assert_eq!(tree.token_count(), out.tokens.len());
}

fn failure_position(json: &Json, tokens: &[Token]) -> usize {
    match json.parser.parse(json.value, tokens) {
        Err(err) => err.position,
        Ok(_) => panic!("damaged input was accepted"),
    }
}

#[test]
fn deleting_any_token_fails_where_detected() {
    let json = Json::new().unwrap();
    let tokens = json.lexer.tokenize(r#"{"a":[1,true]}"#).unwrap().tokens;
    assert!(json.parser.parse(json.value, &tokens).is_ok());
    // Deleting `{` leaves a complete string, so leftover input is reported.
    // Deleting `[` turns `,` into an object separator, so `true` is rejected.
    let detected_at = [1, 1, 2, 5, 4, 5, 6, 7, 8];
    for (i, &position) in detected_at.iter().enumerate() {
        let mut damaged = tokens.clone();
        damaged.remove(i);
        assert_eq!(failure_position(&json, &damaged), position, "deleting token {}", i);
    }
}

#[test]
fn swapping_any_token_fails_at_its_position() {
    let json = Json::new().unwrap();
    let tokens = json.lexer.tokenize(r#"{"a":[1,true]}"#).unwrap().tokens;
    for i in 0..tokens.len() {
        let mut damaged = tokens.clone();
        let (kind, image) = if tokens[i].kind == json.tokens.colon {
            (json.tokens.comma, ",")
        } else {
            (json.tokens.colon, ":")
        };
        damaged[i] = Token {
            kind,
            image: image.into(),
            ..tokens[i].clone()
        };
        let err = json.parser.parse(json.value, &damaged).unwrap_err();
        assert_eq!(err.position, i, "swapping token {}", i);
        assert_eq!(err.found.as_ref().map(|t| t.kind), Some(kind));
    }
}

fn nested_arrays(depth: usize) -> String {
    "[".repeat(depth) + &"]".repeat(depth)
}

#[test]
fn nesting_is_limited() {
    let json = Json::new().unwrap();
    let tree = json
        .parser
        .parse_text(&json.lexer, json.value, &nested_arrays(40))
        .unwrap();
    assert_eq!(tree.token_count(), 80);

    let err = json
        .parser
        .parse_text(&json.lexer, json.value, &nested_arrays(100))
        .unwrap_err();
    assert_matches!(err, Error::Parse(ParseError {
        ref rule,
        expected: Expected::NestingLimit(128),
        position: 64,
        ..
    }) if rule == "value");
}

#[test]
fn nesting_limit_is_configurable() {
    let json = Json::with_config(ParserConfig::default().max_depth(2000)).unwrap();
    let count = thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(move || {
            json.parser
                .parse_text(&json.lexer, json.value, &nested_arrays(500))
                .map(|tree| tree.token_count())
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(count, Ok(1000));
}
