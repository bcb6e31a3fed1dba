mod operators;
mod quirks;

#[cfg(test)]
mod test {
    use crate::Settings;
    use maplit::btreemap;

    #[test_log::test]
    fn doc_examples() {
        let s = Settings::new();
        assert!(s.evaluate("FALSE || FALSE == FALSE || TRUE").unwrap());
        assert!(!s.evaluate("FALSE || FALSE == (FALSE || TRUE)").unwrap());
    }

    #[test]
    fn comparisons() {
        let s = Settings::from_pairs(btreemap! {"a" => "1", "b" => "2"}).unwrap();
        assert!(s.evaluate("a < b").unwrap());
        assert!(s.evaluate("a == 1").unwrap());
        assert!(s.evaluate("a = 1").unwrap());
        assert!(!s.evaluate("a != 1").unwrap());
        assert!(s.evaluate("b >= 2").unwrap());
        assert!(!s.evaluate("b > 2").unwrap());
        assert!(s.evaluate("a <= b").unwrap());
    }
}
