use fix_model::{FieldRecord, Location, MethodRecord, RegionKind, Visibility};
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

pub type MethodId = Idx<MethodNode>;

/// A method declaration linked into the override tree of its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub record: MethodRecord,
    pub parent: Option<MethodId>,
    pub children: Vec<MethodId>,
}

// ==============================================================================
// MethodRegistry
// ==============================================================================

/// Method declarations of one module, with their override relation.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: Arena<MethodNode>,
    by_member: FxHashMap<(SmolStr, SmolStr), MethodId>,
    by_class: FxHashMap<SmolStr, Vec<MethodId>>,
}

impl MethodRegistry {
    pub fn new(records: impl IntoIterator<Item = MethodRecord>) -> Self {
        let mut registry = Self::default();
        let mut by_record_id: FxHashMap<u32, MethodId> = FxHashMap::default();

        for record in records {
            let key = (record.class.clone(), record.signature.clone());
            let record_id = record.id;
            let id = registry.methods.alloc(MethodNode {
                record,
                parent: None,
                children: Vec::new(),
            });
            registry.by_class.entry(key.0.clone()).or_default().push(id);
            registry.by_member.insert(key, id);
            by_record_id.insert(record_id, id);
        }

        // Second pass: parents may be declared after their children.
        let links: Vec<(MethodId, MethodId)> = registry
            .methods
            .iter()
            .filter_map(|(id, node)| {
                let parent_record = node.record.parent?;
                match by_record_id.get(&parent_record) {
                    Some(parent) => Some((id, *parent)),
                    None => {
                        log::debug!(
                            "parent {parent_record} of {}.{} is not declared in this module",
                            node.record.class,
                            node.record.signature
                        );
                        None
                    }
                }
            })
            .collect();
        for (child, parent) in links {
            registry.methods[child].parent = Some(parent);
            registry.methods[parent].children.push(child);
        }

        registry
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn find(&self, class: &str, signature: &str) -> Option<MethodId> {
        self.by_member
            .get(&(SmolStr::from(class), SmolStr::from(signature)))
            .copied()
    }

    pub fn get(&self, id: MethodId) -> &MethodRecord {
        &self.methods[id].record
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.iter().map(|(_, node)| &node.record)
    }

    /// The nearest method that `class.signature` overrides.
    pub fn closest_super_method(&self, class: &str, signature: &str) -> Option<&MethodRecord> {
        let id = self.find(class, signature)?;
        let parent = self.methods[id].parent?;
        Some(&self.methods[parent].record)
    }

    /// Every method that overrides `class.signature`, directly or transitively.
    pub fn sub_methods(&self, class: &str, signature: &str) -> Vec<&MethodRecord> {
        let Some(root) = self.find(class, signature) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut stack = self.methods[root].children.clone();
        while let Some(id) = stack.pop() {
            let node = &self.methods[id];
            found.push(&node.record);
            stack.extend(node.children.iter().copied());
        }
        found
    }

    pub fn constructors_of<'a>(
        &'a self,
        class: &str,
    ) -> impl Iterator<Item = &'a MethodRecord> + 'a {
        self.by_class
            .get(class)
            .into_iter()
            .flatten()
            .map(|id| &self.methods[*id].record)
            .filter(|record| record.region().kind == RegionKind::Constructor)
    }

    /// Methods whose return value other modules could observe as nullable.
    pub fn public_non_primitive_methods(&self) -> impl Iterator<Item = &MethodRecord> {
        self.iter().filter(|record| {
            record.visibility == Visibility::Public
                && !record.primitive_return
                && record.region().kind == RegionKind::Method
        })
    }
}

// ==============================================================================
// FieldRegistry
// ==============================================================================

/// Field declaration statements of one module.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    by_class: FxHashMap<SmolStr, Vec<FieldRecord>>,
}

impl FieldRegistry {
    pub fn new(records: impl IntoIterator<Item = FieldRecord>) -> Self {
        let mut by_class: FxHashMap<SmolStr, Vec<FieldRecord>> = FxHashMap::default();
        for record in records {
            by_class.entry(record.class.clone()).or_default().push(record);
        }
        Self { by_class }
    }

    pub fn len(&self) -> usize {
        self.by_class.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// The declaration statement that declares `class.variable`.
    pub fn declaration_of(&self, class: &str, variable: &str) -> Option<&FieldRecord> {
        self.by_class
            .get(class)?
            .iter()
            .find(|record| record.variables.iter().any(|var| var == variable))
    }

    /// Declarations touched by a field location.
    pub fn declarations_for<'a>(
        &'a self,
        location: &'a Location,
    ) -> impl Iterator<Item = &'a FieldRecord> + 'a {
        let mut seen: Vec<&FieldRecord> = Vec::new();
        for var in location.variables() {
            if let Some(record) = self.declaration_of(&location.class, var) {
                if !seen.contains(&record) {
                    seen.push(record);
                }
            }
        }
        seen.into_iter()
    }

    /// True when one of the declarations behind `location` has no initializer.
    pub fn is_uninitialized(&self, location: &Location) -> bool {
        self.declarations_for(location)
            .any(|record| !record.initialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn method(id: u32, parent: Option<u32>, class: &str, signature: &str) -> MethodRecord {
        MethodRecord {
            id,
            parent,
            class: class.into(),
            signature: signature.into(),
            visibility: Visibility::Public,
            primitive_return: false,
            path: PathBuf::from(format!("/src/{class}.java")),
        }
    }

    #[test]
    fn override_tree_links_out_of_order() {
        let registry = MethodRegistry::new([
            method(3, Some(2), "C", "m()"),
            method(2, Some(1), "B", "m()"),
            method(1, None, "A", "m()"),
            method(4, None, "A", "A()"),
        ]);

        assert_eq!(registry.closest_super_method("C", "m()").unwrap().class, "B");
        assert!(registry.closest_super_method("A", "m()").is_none());

        let mut subs: Vec<_> = registry
            .sub_methods("A", "m()")
            .into_iter()
            .map(|m| m.class.clone())
            .collect();
        subs.sort();
        assert_eq!(subs, vec!["B", "C"]);

        assert_eq!(registry.constructors_of("A").count(), 1);
        assert_eq!(registry.public_non_primitive_methods().count(), 3);
    }

    #[test]
    fn field_declarations_cover_co_declared_variables() {
        let registry = FieldRegistry::new([
            FieldRecord {
                class: "Foo".into(),
                variables: vec!["a".into(), "b".into()],
                initialized: false,
                path: PathBuf::from("/src/Foo.java"),
            },
            FieldRecord {
                class: "Foo".into(),
                variables: vec!["c".into()],
                initialized: true,
                path: PathBuf::from("/src/Foo.java"),
            },
        ]);

        assert!(registry.is_uninitialized(&Location::field("Foo", ["b"])));
        assert!(!registry.is_uninitialized(&Location::field("Foo", ["c"])));
        assert_eq!(
            registry.declaration_of("Foo", "b").unwrap().variables.len(),
            2
        );
        assert!(registry.declaration_of("Bar", "a").is_none());
    }
}
