use crate::Settings;
use maplit::btreemap;
use pretty_assertions::assert_eq;

fn settings() -> Settings {
    Settings::from_pairs(btreemap! {
        "FOO_INT_1" => "5",
        "FOO_INT_2" => "42",
        "FOO_STR_A" => "\"Text A\"",
        "FOO_STR_B" => "\"\"",
        "FLAG" => "TRUE",
    })
    .unwrap()
}

#[test]
fn whitespace_and_left_to_right() {
    let s = Settings::new();
    assert!(s.evaluate("  FALSE || FALSE  ==  FALSE  || TRUE ").unwrap());
    assert!(!s.evaluate(" FALSE || FALSE  == (FALSE  || TRUE)").unwrap());
    assert!(!s.evaluate("TRUE && ((FALSE == TRUE) || FALSE)").unwrap());
    assert!(s.evaluate("2 < 10").unwrap());
}

#[test]
fn string_equality() {
    let s = settings();
    assert!(s.evaluate("FOO_STR_B == ''").unwrap());
    assert!(!s.evaluate("FOO_STR_B == 'Text A'").unwrap());
    assert!(s.evaluate("FOO_STR_A == \"Text A\"").unwrap());
    assert!(s.evaluate("FOO_STR_A != FOO_STR_B").unwrap());
}

#[test]
fn integers() {
    let s = settings();
    assert!(s.evaluate("FOO_INT_1 == 5").unwrap());
    assert!(!s.evaluate("FOO_INT_1 == 42").unwrap());
    assert!(s.evaluate("FOO_INT_1 < FOO_INT_2").unwrap());
    assert!(s.evaluate("-3 < FOO_INT_1").unwrap());
    assert_eq!(s.get_value("FOO_INT_2"), Some("42"));
}

#[test]
fn negation() {
    let s = settings();
    assert!(!s.evaluate("!FLAG").unwrap());
    assert!(s.evaluate("!(FOO_INT_1 == 42)").unwrap());
    assert!(s.evaluate("FLAG && !FALSE").unwrap());
}

#[test]
fn nested_parentheses() {
    let s = settings();
    assert!(s
        .evaluate("(FLAG && (FOO_INT_1 > 1)) && ((FOO_STR_A == 'Text A') || FALSE)")
        .unwrap());
}
