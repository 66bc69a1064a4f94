use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKind {
    Field,
    Method,
    Parameter,
}

impl LocationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FIELD" => Some(LocationKind::Field),
            "METHOD" => Some(LocationKind::Method),
            "PARAMETER" => Some(LocationKind::Parameter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Field => "FIELD",
            LocationKind::Method => "METHOD",
            LocationKind::Parameter => "PARAMETER",
        }
    }
}

/// The declaration an annotation is attached to.
#[derive(Debug, Clone)]
pub enum Target {
    /// One field declaration statement. `int a, b;` names both variables since a
    /// single annotation covers all of them.
    Field { variables: BTreeSet<SmolStr> },
    /// The return type of a method.
    Method { signature: SmolStr },
    /// The `index`-th parameter of a method.
    Parameter { signature: SmolStr, index: u32 },
}

#[derive(Debug, Clone)]
pub struct Location {
    pub class: SmolStr,
    pub target: Target,
    pub path: Option<PathBuf>,
}

impl Location {
    pub fn field<I, S>(class: impl Into<SmolStr>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            class: class.into(),
            target: Target::Field {
                variables: variables.into_iter().map(Into::into).collect(),
            },
            path: None,
        }
    }

    pub fn method(class: impl Into<SmolStr>, signature: impl Into<SmolStr>) -> Self {
        Self {
            class: class.into(),
            target: Target::Method {
                signature: signature.into(),
            },
            path: None,
        }
    }

    pub fn parameter(class: impl Into<SmolStr>, signature: impl Into<SmolStr>, index: u32) -> Self {
        Self {
            class: class.into(),
            target: Target::Parameter {
                signature: signature.into(),
                index,
            },
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(&self) -> LocationKind {
        match self.target {
            Target::Field { .. } => LocationKind::Field,
            Target::Method { .. } => LocationKind::Method,
            Target::Parameter { .. } => LocationKind::Parameter,
        }
    }

    /// Variables of a field location, empty for callables.
    pub fn variables(&self) -> impl Iterator<Item = &SmolStr> {
        let vars = match &self.target {
            Target::Field { variables } => Some(variables.iter()),
            _ => None,
        };
        vars.into_iter().flatten()
    }

    /// Signature of the enclosing (or targeted) method, if any.
    pub fn signature(&self) -> Option<&SmolStr> {
        match &self.target {
            Target::Method { signature } | Target::Parameter { signature, .. } => Some(signature),
            Target::Field { .. } => None,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        if self.class != other.class {
            return false;
        }
        match (&self.target, &other.target) {
            (Target::Field { variables: a }, Target::Field { variables: b }) => {
                !a.is_disjoint(b)
            }
            (Target::Method { signature: a }, Target::Method { signature: b }) => a == b,
            (
                Target::Parameter {
                    signature: a,
                    index: i,
                },
                Target::Parameter {
                    signature: b,
                    index: j,
                },
            ) => a == b && i == j,
            _ => false,
        }
    }
}

// Field equality is "intersecting variable sets", which is not transitive in
// general. Co-declared variables always come from the same declaration
// statement though, so within one module it behaves as an equivalence.
impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.class.hash(state);
        match &self.target {
            Target::Field { .. } => {}
            Target::Method { signature } => signature.hash(state),
            Target::Parameter { signature, index } => {
                signature.hash(state);
                index.hash(state);
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Field { variables } => {
                write!(f, "{}.{{", self.class)?;
                for (i, var) in variables.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{var}")?;
                }
                write!(f, "}}")
            }
            Target::Method { signature } => write!(f, "{}.{signature}", self.class),
            Target::Parameter { signature, index } => {
                write!(f, "{}.{signature}#{index}", self.class)
            }
        }
    }
}
