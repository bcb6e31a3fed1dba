use globforge_settings::{Settings, SettingsError};

#[test]
fn later_layers_win() {
    let mut effective = Settings::new();

    let mut base = Settings::new();
    base.set("BOARD", "\"devkit\"").unwrap();
    base.set("UART_COUNT", "2").unwrap();

    let mut product = Settings::new();
    product.set("UART_COUNT", "4").unwrap();
    product.set("USE_DMA", "TRUE").unwrap();

    effective.extend(&base);
    effective.extend(&product);

    assert!(effective.evaluate("UART_COUNT == 4 && USE_DMA").unwrap());
    assert!(effective.evaluate("BOARD == 'devkit'").unwrap());
    assert_eq!(effective.len(), 3);
}

#[test]
fn lookup_errors() {
    let s = Settings::new();
    assert_eq!(
        s.get_typed("NOPE").unwrap_err(),
        SettingsError::NotDefined("NOPE".to_string())
    );
}
