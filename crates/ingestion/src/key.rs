//! Indicator key resolution.
//!
//! Maps a record to the identity string of its indicator group.

use econ_core::Record;

/// Maps a record to its indicator-group key.
pub trait KeyResolver {
    /// Resolve the group key. An empty key drops the record.
    fn resolve(&self, record: &Record) -> String;

    /// Whether keys produced by this resolver are normalized.
    ///
    /// Allow/deny lists are normalized the same way when this is true and
    /// matched verbatim otherwise.
    fn normalizes(&self) -> bool {
        false
    }
}

/// Resolver using the record's name, then its indicator key, then its id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyResolver;

impl KeyResolver for DefaultKeyResolver {
    fn resolve(&self, record: &Record) -> String {
        [record.name.as_deref(), record.indicator_key.as_deref(), Some(record.id.as_str())]
            .into_iter()
            .flatten()
            .map(normalize_key)
            .find(|key| !key.is_empty())
            .unwrap_or_default()
    }

    fn normalizes(&self) -> bool {
        true
    }
}

/// Caller-supplied resolvers are used verbatim.
impl<F> KeyResolver for F
where
    F: Fn(&Record) -> String,
{
    fn resolve(&self, record: &Record) -> String {
        self(record)
    }
}

/// Trim, lowercase, and collapse internal whitespace.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve a record's key with the given resolver, or the default one.
pub fn resolve_key(record: &Record, resolver: Option<&dyn KeyResolver>) -> String {
    match resolver {
        Some(resolver) => resolver.resolve(record),
        None => DefaultKeyResolver.resolve(record),
    }
}
