//! In-memory catalogue of the jobs known to the current process.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{BatchError, JobDefinition};

/// Jobs registered for the lifetime of one process.
///
/// Nothing here is persisted: the scheduler re-registers the same definitions
/// on every start before asking for pages. Registering a definition whose
/// identifier already exists replaces the in-memory definition and leaves the
/// job's persisted progress untouched.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: BTreeMap<String, JobDefinition>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition under its identifier, returning the identifier.
    pub fn register(&mut self, definition: JobDefinition) -> String {
        let identifier = definition.identifier().to_string();
        let replaced = self.jobs.insert(identifier.clone(), definition).is_some();
        debug!(job = %identifier, replaced, "Registered job");
        identifier
    }

    /// Find a definition by identifier.
    pub fn lookup(&self, identifier: &str) -> Result<&JobDefinition, BatchError> {
        self.jobs.get(identifier).ok_or_else(|| BatchError::NotFound {
            identifier: identifier.to_string(),
        })
    }

    /// Identifiers of all registered jobs, in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Derive a job identifier from its name: lowercase ASCII alphanumerics with
/// single dashes between words.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryArgs;

    fn job(name: &str, number: u64) -> JobDefinition {
        JobDefinition::builder()
            .name(name)
            .record_type("term")
            .callback_fn(|_| async { Ok(()) })
            .query_args(QueryArgs::new().number(number))
            .build()
            .unwrap()
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hey there"), "hey-there");
        assert_eq!(slugify("  Re-index   ALL posts!  "), "re-index-all-posts");
        assert_eq!(slugify("user_meta.v2"), "user-meta-v2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn lookup_unknown_is_not_found() {
        let registry = JobRegistry::new();
        match registry.lookup("missing") {
            Err(BatchError::NotFound { identifier }) => assert_eq!(identifier, "missing"),
            other => panic!("Expected not found, got {other:?}"),
        }
    }

    #[test]
    fn register_then_lookup() {
        let mut registry = JobRegistry::new();
        assert!(registry.is_empty());

        let identifier = registry.register(job("Hey there", 10));

        assert_eq!(identifier, "hey-there");
        assert_eq!(registry.lookup("hey-there").unwrap().name(), "Hey there");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistering_replaces_definition() {
        let mut registry = JobRegistry::new();
        registry.register(job("Hey there", 10));
        registry.register(job("hey THERE", 5));

        assert_eq!(registry.len(), 1);
        let definition = registry.lookup("hey-there").unwrap();
        assert_eq!(definition.query_args().page_size(), Some(5));
    }

    #[test]
    fn identifiers_are_sorted() {
        let mut registry = JobRegistry::new();
        registry.register(job("Zeta", 1));
        registry.register(job("Alpha", 1));

        let identifiers: Vec<&str> = registry.identifiers().collect();
        assert_eq!(identifiers, ["alpha", "zeta"]);
    }
}
