//! Configuration access port.
//!
//! Values are looked up by `[section] key` as raw strings; parsing and
//! rejection of bad values belong to the loaders.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Every section name present, lowercased.
    fn sections(&self) -> Vec<String>;
}
