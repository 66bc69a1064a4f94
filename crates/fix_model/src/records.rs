use std::path::PathBuf;

use smol_str::SmolStr;

use crate::check_error::CheckError;
use crate::region::Region;

/// Records that can be stored in a region index.
pub trait Hashable {
    fn class(&self) -> &str;
    fn member(&self) -> &str;
}

impl Hashable for CheckError {
    fn class(&self) -> &str {
        &self.region.class
    }

    fn member(&self) -> &str {
        &self.region.member
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    /// A region reads or writes a field.
    Field,
    /// A region calls a method.
    Call,
    /// A region flows a value into a parameter without a plain call (method
    /// references, lambdas passed as arguments).
    Parameter,
}

/// A usage edge `(using region) -> (used class, used member)`, as written by
/// the usage-graph scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageRecord {
    pub region: Region,
    pub used_class: SmolStr,
    pub used_member: SmolStr,
    pub kind: UsageKind,
}

/// Usage records are keyed by what they use.
impl Hashable for UsageRecord {
    fn class(&self) -> &str {
        &self.used_class
    }

    fn member(&self) -> &str {
        &self.used_member
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "package" | "" => Some(Visibility::Package),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A method declaration of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub id: u32,
    /// Id of the closest method this one overrides.
    pub parent: Option<u32>,
    pub class: SmolStr,
    pub signature: SmolStr,
    pub visibility: Visibility,
    pub primitive_return: bool,
    pub path: PathBuf,
}

impl MethodRecord {
    pub fn region(&self) -> Region {
        Region::new(self.class.clone(), self.signature.clone())
    }
}

/// A field declaration statement of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub class: SmolStr,
    pub variables: Vec<SmolStr>,
    /// Whether the declaration carries an initializer.
    pub initialized: bool,
    pub path: PathBuf,
}
