use std::collections::BTreeSet;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use crate::location::Location;

pub const DEFAULT_ANNOTATION: &str = "javax.annotation.Nullable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Remove,
}

/// A single annotation change at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Change {
    pub location: Location,
    pub annotation: SmolStr,
    pub kind: ChangeKind,
}

impl Change {
    pub fn add(location: Location, annotation: impl Into<SmolStr>) -> Self {
        Self {
            location,
            annotation: annotation.into(),
            kind: ChangeKind::Add,
        }
    }

    /// The change that undoes this one.
    pub fn inverse(&self) -> Self {
        let kind = match self.kind {
            ChangeKind::Add => ChangeKind::Remove,
            ChangeKind::Remove => ChangeKind::Add,
        };
        Self {
            location: self.location.clone(),
            annotation: self.annotation.clone(),
            kind,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.kind {
            ChangeKind::Add => '+',
            ChangeKind::Remove => '-',
        };
        let short = self
            .annotation
            .rsplit('.')
            .next()
            .unwrap_or(&self.annotation);
        write!(f, "{sign}@{short} {}", self.location)
    }
}

/// One atomic proposed change. Two fixes are the same fix when their change
/// sets are equal; `reasons` and `in_module` do not take part in equality.
#[derive(Debug, Clone)]
pub struct Fix {
    changes: Vec<Change>,
    /// Error kinds that made the checker suggest this fix.
    pub reasons: BTreeSet<SmolStr>,
    /// Whether the fix modifies a declaration of the module under inference.
    pub in_module: bool,
}

impl Fix {
    pub fn new(change: Change, reason: impl Into<SmolStr>, in_module: bool) -> Self {
        Self {
            changes: vec![change],
            reasons: BTreeSet::from([reason.into()]),
            in_module,
        }
    }

    /// Build a fix from several changes. Returns `None` for an empty change set.
    pub fn from_changes(
        changes: impl IntoIterator<Item = Change>,
        reasons: BTreeSet<SmolStr>,
        in_module: bool,
    ) -> Option<Self> {
        let mut deduped: Vec<Change> = Vec::new();
        for change in changes {
            if !deduped.contains(&change) {
                deduped.push(change);
            }
        }
        if deduped.is_empty() {
            return None;
        }
        Some(Self {
            changes: deduped,
            reasons,
            in_module,
        })
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// The primary location of the fix.
    pub fn location(&self) -> &Location {
        &self.changes[0].location
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.changes.iter().map(|change| &change.location)
    }

    /// Accumulate the reasons of a duplicate observation of this fix.
    pub fn merge_reasons(&mut self, other: &Fix) {
        self.reasons.extend(other.reasons.iter().cloned());
    }

    /// The fix that reverts this one.
    pub fn inverse(&self) -> Fix {
        Fix {
            changes: self.changes.iter().map(Change::inverse).collect(),
            reasons: self.reasons.clone(),
            in_module: self.in_module,
        }
    }
}

impl PartialEq for Fix {
    fn eq(&self, other: &Self) -> bool {
        self.changes.len() == other.changes.len()
            && self.changes.iter().all(|c| other.changes.contains(c))
    }
}

impl Eq for Fix {}

impl Hash for Fix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order independent: the change list is a set.
        let combined = self
            .changes
            .iter()
            .map(|change| FxBuildHasher.hash_one(change))
            .fold(0u64, u64::wrapping_add);
        combined.hash(state);
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{change}")?;
        }
        Ok(())
    }
}
