use std::fmt;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

/// Member string used by the checker for class-level regions.
pub const CLASS_LEVEL_MEMBER: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Method,
    Field,
    Constructor,
    InitBlock,
}

/// Where the body of a region lives. Library regions come from pre-built
/// code and never change between builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SourceType {
    #[default]
    Source,
    Library,
}

/// A body in which an error or a usage occurs, identified by the enclosing
/// class and member. Equality and hashing only look at `(class, member)`.
#[derive(Debug, Clone)]
pub struct Region {
    pub class: SmolStr,
    pub member: SmolStr,
    pub kind: RegionKind,
    pub source_type: SourceType,
}

impl Region {
    pub fn new(class: impl Into<SmolStr>, member: impl Into<SmolStr>) -> Self {
        let class = class.into();
        let member = member.into();
        let kind = classify_member(&class, &member);
        Self {
            class,
            member,
            kind,
            source_type: SourceType::Source,
        }
    }

    /// The class-level region (field initializers and initializer blocks).
    pub fn class_level(class: impl Into<SmolStr>) -> Self {
        Self::new(class, CLASS_LEVEL_MEMBER)
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.member == other.member
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.member.hash(state);
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.member)
    }
}

/// Classify a member string the way the checker serializes it:
/// `null`/`static`/empty are initializer blocks, callables are recognised by
/// their parameter list, everything else is a field initializer.
pub fn classify_member(class: &str, member: &str) -> RegionKind {
    if member.is_empty() || member == CLASS_LEVEL_MEMBER || member == "static" {
        return RegionKind::InitBlock;
    }
    let Some(paren) = member.find('(') else {
        return RegionKind::Field;
    };
    let name = &member[..paren];
    if name == "<init>" || name == simple_class_name(class) {
        RegionKind::Constructor
    } else {
        RegionKind::Method
    }
}

/// `com.example.Outer$Inner` -> `Inner`.
pub fn simple_class_name(class: &str) -> &str {
    let start = class
        .rfind(['.', '$'])
        .map(|idx| idx + 1)
        .unwrap_or(0);
    &class[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn classifies_members() {
        assert_eq!(classify_member("a.Foo", "null"), RegionKind::InitBlock);
        assert_eq!(classify_member("a.Foo", "static"), RegionKind::InitBlock);
        assert_eq!(classify_member("a.Foo", "Foo(int)"), RegionKind::Constructor);
        assert_eq!(classify_member("a.Foo$Bar", "Bar()"), RegionKind::Constructor);
        assert_eq!(classify_member("a.Foo", "<init>()"), RegionKind::Constructor);
        assert_eq!(classify_member("a.Foo", "run(java.lang.Object)"), RegionKind::Method);
        assert_eq!(classify_member("a.Foo", "counter"), RegionKind::Field);
    }

    #[test]
    fn equality_ignores_kind_and_source() {
        let a = Region::new("Foo", "m()");
        let b = Region::new("Foo", "m()").with_source_type(SourceType::Library);
        assert_eq!(a, b);

        let set: FxHashSet<Region> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
