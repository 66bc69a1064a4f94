use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::fix::Fix;
use crate::region::Region;

/// Initializer diagnostics. Their text and offsets change between reruns of
/// the checker, so they are compared by kind and region only.
pub const METHOD_INITIALIZER_ERROR: &str = "METHOD_NO_INIT";
pub const FIELD_INITIALIZER_ERROR: &str = "FIELD_NO_INIT";

pub fn is_initialization_kind(message_type: &str) -> bool {
    message_type == METHOD_INITIALIZER_ERROR || message_type == FIELD_INITIALIZER_ERROR
}

/// A diagnostic reported by the null-safety checker.
#[derive(Debug, Clone)]
pub struct CheckError {
    pub message_type: SmolStr,
    pub message: String,
    pub region: Region,
    pub offset: u32,
    resolving_fixes: Vec<Fix>,
}

impl CheckError {
    pub fn new(
        message_type: impl Into<SmolStr>,
        message: impl Into<String>,
        region: Region,
        offset: u32,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            message: message.into(),
            region,
            offset,
            resolving_fixes: Vec::new(),
        }
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.add_resolving_fix(fix);
        self
    }

    /// Record another fix that resolves this error. Duplicate fixes only merge
    /// their reasons.
    pub fn add_resolving_fix(&mut self, fix: Fix) {
        match self.resolving_fixes.iter_mut().find(|known| **known == fix) {
            Some(known) => known.merge_reasons(&fix),
            None => self.resolving_fixes.push(fix),
        }
    }

    pub fn resolving_fixes(&self) -> &[Fix] {
        &self.resolving_fixes
    }

    pub fn is_initialization_error(&self) -> bool {
        is_initialization_kind(&self.message_type)
    }

    pub fn has_fix(&self) -> bool {
        !self.resolving_fixes.is_empty()
    }

    pub fn is_single_fix(&self) -> bool {
        self.resolving_fixes.len() == 1
    }

    /// Resolving fixes that modify the module under inference.
    pub fn fixes_in_module(&self) -> impl Iterator<Item = &Fix> {
        self.resolving_fixes.iter().filter(|fix| fix.in_module)
    }

    /// An error is unresolvable when no resolving fix targets the module under
    /// inference.
    pub fn is_unresolvable(&self) -> bool {
        self.fixes_in_module().next().is_none()
    }

    /// True when every fix needed to resolve this error is part of `fixes`.
    pub fn is_resolvable_with(&self, fixes: &FxHashSet<Fix>) -> bool {
        self.has_fix() && self.resolving_fixes.iter().all(|fix| fixes.contains(fix))
    }

    fn same_fixes(&self, other: &Self) -> bool {
        self.resolving_fixes.len() == other.resolving_fixes.len()
            && self
                .resolving_fixes
                .iter()
                .all(|fix| other.resolving_fixes.contains(fix))
    }
}

impl PartialEq for CheckError {
    fn eq(&self, other: &Self) -> bool {
        if self.message_type != other.message_type || self.region != other.region {
            return false;
        }
        if self.is_initialization_error() {
            return true;
        }
        self.message == other.message && self.offset == other.offset && self.same_fixes(other)
    }
}

impl Eq for CheckError {}

impl Hash for CheckError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message_type.hash(state);
        self.region.hash(state);
        if !self.is_initialization_error() {
            self.message.hash(state);
            self.offset.hash(state);
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.message_type, self.region, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::{Change, DEFAULT_ANNOTATION};
    use crate::location::Location;

    fn field_fix() -> Fix {
        Fix::new(
            Change::add(Location::field("Foo", ["bar"]), DEFAULT_ANNOTATION),
            FIELD_INITIALIZER_ERROR,
            true,
        )
    }

    #[test]
    fn initializer_errors_ignore_message_and_offset() {
        let class = Region::class_level("Foo");
        let a = CheckError::new(FIELD_INITIALIZER_ERROR, "bar not initialized", class.clone(), 10);
        let b = CheckError::new(
            FIELD_INITIALIZER_ERROR,
            "@NonNull field bar not initialized",
            class,
            42,
        )
        .with_fix(field_fix());
        assert_eq!(a, b);
        let set: FxHashSet<CheckError> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn other_errors_need_full_equality() {
        let a = CheckError::new("DEREFERENCE_NULLABLE", "deref", Region::new("Foo", "m()"), 10);
        let moved = CheckError::new("DEREFERENCE_NULLABLE", "deref", Region::new("Foo", "m()"), 11);
        let with_fix = a.clone().with_fix(field_fix());
        assert_ne!(a, moved);
        assert_ne!(a, with_fix);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn resolvability() {
        let fix = field_fix();
        let unfixable =
            CheckError::new("DEREFERENCE_NULLABLE", "deref", Region::new("Foo", "m()"), 0);
        let fixable = unfixable.clone().with_fix(fix.clone());
        let tree: FxHashSet<Fix> = [fix].into_iter().collect();

        assert!(!unfixable.has_fix());
        assert!(unfixable.is_unresolvable());
        assert!(!unfixable.is_resolvable_with(&tree));
        assert!(fixable.is_single_fix());
        assert!(fixable.is_resolvable_with(&tree));
        assert!(!fixable.is_resolvable_with(&FxHashSet::default()));
    }
}
