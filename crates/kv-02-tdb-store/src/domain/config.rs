//! # Store Configuration

/// Largest value the record format can describe (`value_len` is a `u32`).
pub const MAX_RECORD_VALUE: usize = u32::MAX as usize;

/// Configuration for a `TdbStore`.
///
/// All values have defaults suitable for small flash parts; use the
/// `with_*` builders to override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdbConfig {
    /// Format blank media during `init` instead of reporting it
    /// uninitialized (default: false).
    ///
    /// When `false`, a device with no valid Area header leaves the store
    /// uninitialized and the caller must `reset` it explicitly.
    pub auto_format: bool,

    /// Maximum simultaneously open iterators (default: 16).
    pub max_open_iterators: usize,

    /// Largest value accepted by `set` (default: 1 MiB). Never more than
    /// `MAX_RECORD_VALUE`, whatever is set here.
    ///
    /// Values that pass this check but do not fit an empty Area still
    /// fail with `MediaFull`.
    pub max_value_size: usize,
}

impl Default for TdbConfig {
    fn default() -> Self {
        Self {
            auto_format: false,
            max_open_iterators: 16,
            max_value_size: 1024 * 1024,
        }
    }
}

impl TdbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format blank media on `init`.
    pub fn with_auto_format(mut self, auto_format: bool) -> Self {
        self.auto_format = auto_format;
        self
    }

    pub fn with_max_open_iterators(mut self, max: usize) -> Self {
        self.max_open_iterators = max;
        self
    }

    /// Clamped to `MAX_RECORD_VALUE`.
    pub fn with_max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size.min(MAX_RECORD_VALUE);
        self
    }

    /// The limit `set` enforces.
    pub fn value_limit(&self) -> usize {
        self.max_value_size.min(MAX_RECORD_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = TdbConfig::new()
            .with_auto_format(true)
            .with_max_open_iterators(2);
        assert!(config.auto_format);
        assert_eq!(config.max_open_iterators, 2);
        assert_eq!(config.max_value_size, TdbConfig::default().max_value_size);
    }

    #[test]
    fn test_value_limit_fits_record_format() {
        let config = TdbConfig::new().with_max_value_size(usize::MAX);
        assert_eq!(config.max_value_size, MAX_RECORD_VALUE);

        let direct = TdbConfig {
            max_value_size: usize::MAX,
            ..TdbConfig::default()
        };
        assert_eq!(direct.value_limit(), MAX_RECORD_VALUE);
        assert_eq!(TdbConfig::default().value_limit(), 1024 * 1024);
    }
}
