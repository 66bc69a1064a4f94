mod check_error;
mod fix;
mod impact;
mod location;
mod records;
mod region;
pub mod wire;

#[cfg(feature = "proptest_support")]
pub mod arbitrary;

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub use check_error::{
    is_initialization_kind, CheckError, FIELD_INITIALIZER_ERROR, METHOD_INITIALIZER_ERROR,
};
pub use fix::{Change, ChangeKind, Fix, DEFAULT_ANNOTATION};
pub use impact::Impact;
pub use location::{Location, LocationKind, Target};
pub use records::{FieldRecord, Hashable, MethodRecord, UsageKind, UsageRecord, Visibility};
pub use region::{
    classify_member, simple_class_name, Region, RegionKind, SourceType, CLASS_LEVEL_MEMBER,
};
pub use wire::{FixContext, ModuleMembership, WireFormat};

/// Failure to read one of the interchange files. Always fatal for a run.
#[derive(Error, Diagnostic, Debug)]
pub enum LoadError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed record: {reason}", path.display())]
    #[diagnostic(help("the file must be tab separated with a single header row"))]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}
