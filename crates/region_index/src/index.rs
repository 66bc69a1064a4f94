// ==============================================================================
// Region Index
// ==============================================================================
//
// A multimap from `hash(class)` or `hash(class, member)` to the records loaded
// from interchange files. Buckets may hold records of several keys when hashes
// collide, so every lookup filters on exact key equality after finding the
// bucket.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use fix_model::{Hashable, LoadError};
use rustc_hash::{FxHashMap, FxHasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    ByClass,
    ByMember,
}

#[derive(Debug, Clone)]
pub struct Index<T> {
    kind: IndexKind,
    buckets: FxHashMap<u64, Vec<T>>,
    len: usize,
}

fn class_key(class: &str) -> u64 {
    let mut hasher = FxHasher::default();
    class.hash(&mut hasher);
    hasher.finish()
}

fn member_key(class: &str, member: &str) -> u64 {
    let mut hasher = FxHasher::default();
    class.hash(&mut hasher);
    member.hash(&mut hasher);
    hasher.finish()
}

impl<T: Hashable> Index<T> {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            buckets: FxHashMap::default(),
            len: 0,
        }
    }

    pub fn from_records(kind: IndexKind, records: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self::new(kind);
        index.extend(records);
        index
    }

    /// Drop every record and reload from `paths`. Loading the same files twice
    /// yields the same lookups.
    pub fn index(
        &mut self,
        paths: &[PathBuf],
        load: impl Fn(&Path) -> Result<Vec<T>, LoadError>,
    ) -> Result<(), LoadError> {
        self.clear();
        for path in paths {
            let records = load(path)?;
            log::debug!("indexed {} records from {}", records.len(), path.display());
            self.extend(records);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    pub fn insert(&mut self, record: T) {
        let key = match self.kind {
            IndexKind::ByClass => class_key(record.class()),
            IndexKind::ByMember => member_key(record.class(), record.member()),
        };
        self.buckets.entry(key).or_default().push(record);
        self.len += 1;
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = T>) {
        for record in records {
            self.insert(record);
        }
    }

    /// All records of `class`. A by-member index has no class buckets, so this
    /// falls back to a scan.
    pub fn get_by_class<'a>(&'a self, class: &'a str) -> Box<dyn Iterator<Item = &'a T> + 'a> {
        match self.kind {
            IndexKind::ByClass => Box::new(
                self.buckets
                    .get(&class_key(class))
                    .into_iter()
                    .flatten()
                    .filter(move |record| record.class() == class),
            ),
            IndexKind::ByMember => {
                Box::new(self.values().filter(move |record| record.class() == class))
            }
        }
    }

    /// Records keyed by exactly `(class, member)`.
    pub fn get_by_member<'a>(
        &'a self,
        class: &'a str,
        member: &'a str,
    ) -> impl Iterator<Item = &'a T> + 'a {
        let key = match self.kind {
            IndexKind::ByClass => class_key(class),
            IndexKind::ByMember => member_key(class, member),
        };
        self.buckets
            .get(&key)
            .into_iter()
            .flatten()
            .filter(move |record| record.class() == class && record.member() == member)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_model::wire::read_usages;
    use fix_model::{Region, UsageKind, UsageRecord};
    use indoc::indoc;

    fn usage(using: (&str, &str), used: (&str, &str)) -> UsageRecord {
        UsageRecord {
            region: Region::new(using.0, using.1),
            used_class: used.0.into(),
            used_member: used.1.into(),
            kind: UsageKind::Call,
        }
    }

    #[test]
    fn lookups_filter_on_exact_keys() {
        let index = Index::from_records(
            IndexKind::ByMember,
            [
                usage(("A", "a()"), ("Foo", "m()")),
                usage(("B", "b()"), ("Foo", "m()")),
                usage(("C", "c()"), ("Foo", "n()")),
            ],
        );
        assert_eq!(index.len(), 3);
        assert_eq!(index.get_by_member("Foo", "m()").count(), 2);
        assert_eq!(index.get_by_member("Foo", "x()").count(), 0);
        assert_eq!(index.get_by_class("Foo").count(), 3);
    }

    #[test]
    fn colliding_buckets_are_filtered() {
        // A by-class index stores every member of a class in one bucket, which
        // is the worst case of a collision for member lookups.
        let index = Index::from_records(
            IndexKind::ByClass,
            [
                usage(("A", "a()"), ("Foo", "m()")),
                usage(("B", "b()"), ("Foo", "n()")),
            ],
        );
        let found: Vec<_> = index.get_by_member("Foo", "n()").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].region, Region::new("B", "b()"));
    }

    #[test]
    fn reindexing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.tsv");
        std::fs::write(
            &path,
            indoc! {"
                using_class\tusing_member\tused_member\tused_class\tsource_kind
                Bar\trun()\tm(int)\tFoo\tSOURCE
                Baz\tnull\tm(int)\tFoo\tSOURCE
                Baz\tgo()\tn()\tFoo\tSOURCE
            "},
        )
        .unwrap();
        let paths = vec![path];
        let load = |p: &Path| read_usages(p, UsageKind::Call);

        let mut index = Index::new(IndexKind::ByMember);
        index.index(&paths, load).unwrap();
        let mut first: Vec<Region> = index
            .get_by_member("Foo", "m(int)")
            .map(|u| u.region.clone())
            .collect();

        index.index(&paths, load).unwrap();
        let mut second: Vec<Region> = index
            .get_by_member("Foo", "m(int)")
            .map(|u| u.region.clone())
            .collect();

        first.sort_by_key(|r| r.to_string());
        second.sort_by_key(|r| r.to_string());
        assert_eq!(index.len(), 3);
        assert_eq!(first, second);
    }
}
