use crate::Settings;
use maplit::btreemap;

#[test]
fn no_precedence() {
    // Read as ((TRUE || FALSE) && FALSE), not TRUE || (FALSE && FALSE)
    let s = Settings::new();
    assert!(!s.evaluate("TRUE || FALSE && FALSE").unwrap());

    // ((1 < 2) == TRUE)
    assert!(s.evaluate("1 < 2 == TRUE").unwrap());
}

#[test]
fn group_collapses_to_bool() {
    // A parenthetical always yields a bool, even around a single integer
    let s = Settings::from_pairs(btreemap! {"n" => "3"}).unwrap();
    assert!(s.evaluate("(n) == TRUE").unwrap());
    assert!(s.evaluate("(n) == 1").is_err());
}

#[test]
fn ambiguous_values_are_malformed() {
    // Values are typed by shape only; there is no fallback to string
    let s = Settings::from_pairs(btreemap! {"v" => "abc"}).unwrap();
    assert!(s.evaluate("v == 'abc'").is_err());
}
