pub mod declarations;
pub mod index;
mod module;
pub mod registry;

#[cfg(test)]
mod tests;

pub use declarations::{FieldRegistry, MethodId, MethodRegistry};
pub use index::{Index, IndexKind};
pub use module::{ModuleInfo, ModuleSources};
pub use registry::{CompoundRegistry, RegionRegistry};
