//! Configuration access port trait.

/// Sectioned key/value lookups. Typed parsing and defaults live in
/// `config_validation`, which reports bad values instead of masking them.
pub trait ConfigPort {
    /// Raw value, or `None` when the section or key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, sorted. Empty if the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
