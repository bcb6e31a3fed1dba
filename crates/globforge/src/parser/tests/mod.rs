mod project;

use globforge_settings::Settings;

/// Settings from `KEY => value` pairs.
fn settings<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Settings {
    let mut settings = Settings::new();
    for (key, value) in pairs {
        settings.set(key, value).unwrap();
    }
    settings
}
