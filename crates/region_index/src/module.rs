use std::path::PathBuf;

use derive_more::Debug;
use fix_model::wire::{read_fields, read_methods, read_usages};
use fix_model::{LoadError, Location, ModuleMembership, Region, Target, UsageKind, UsageRecord};
use smol_str::SmolStr;

use crate::declarations::{FieldRegistry, MethodRegistry};
use crate::index::{Index, IndexKind};
use crate::registry::CompoundRegistry;

/// Where the producers write the files describing one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSources {
    pub name: SmolStr,
    /// Checker errors for the current build.
    pub errors: PathBuf,
    /// Extra candidate fixes, if the checker emits them separately.
    pub fixes: Option<PathBuf>,
    pub field_usages: Vec<PathBuf>,
    pub calls: Vec<PathBuf>,
    pub parameter_usages: Vec<PathBuf>,
    pub methods: Vec<PathBuf>,
    pub fields: Vec<PathBuf>,
}

/// Everything known about one module for the duration of an analysis
/// session. Rebuilt with [`ModuleInfo::reindex`] after each build.
#[derive(Debug)]
#[debug("ModuleInfo({})", sources.name)]
pub struct ModuleInfo {
    sources: ModuleSources,
    field_usages: Index<UsageRecord>,
    calls: Index<UsageRecord>,
    parameter_usages: Index<UsageRecord>,
    methods: MethodRegistry,
    fields: FieldRegistry,
}

impl ModuleInfo {
    pub fn load(sources: ModuleSources) -> Result<Self, LoadError> {
        let mut module = Self {
            sources,
            field_usages: Index::new(IndexKind::ByMember),
            calls: Index::new(IndexKind::ByMember),
            parameter_usages: Index::new(IndexKind::ByMember),
            methods: MethodRegistry::default(),
            fields: FieldRegistry::default(),
        };
        module.reindex()?;
        Ok(module)
    }

    /// Reload usages and declarations from disk.
    pub fn reindex(&mut self) -> Result<(), LoadError> {
        let sources = &self.sources;
        self.field_usages
            .index(&sources.field_usages, |p| read_usages(p, UsageKind::Field))?;
        self.calls
            .index(&sources.calls, |p| read_usages(p, UsageKind::Call))?;
        self.parameter_usages
            .index(&sources.parameter_usages, |p| {
                read_usages(p, UsageKind::Parameter)
            })?;

        let mut methods = Vec::new();
        for path in &sources.methods {
            methods.extend(read_methods(path)?);
        }
        self.methods = MethodRegistry::new(methods);

        let mut fields = Vec::new();
        for path in &sources.fields {
            fields.extend(read_fields(path)?);
        }
        self.fields = FieldRegistry::new(fields);

        log::debug!(
            "indexed module {}: {} methods, {} field declarations, {} calls, {} field usages",
            sources.name,
            self.methods.len(),
            self.fields.len(),
            self.calls.len(),
            self.field_usages.len(),
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.sources.name
    }

    pub fn sources(&self) -> &ModuleSources {
        &self.sources
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn registry(&self) -> CompoundRegistry<'_> {
        CompoundRegistry::new(self)
    }

    /// Regions of this module that call `class.signature`.
    pub fn callers_of<'a>(
        &'a self,
        class: &'a str,
        signature: &'a str,
    ) -> impl Iterator<Item = &'a Region> + 'a {
        self.calls
            .get_by_member(class, signature)
            .map(|usage| &usage.region)
    }

    /// Regions of this module that read or write `class.variable`.
    pub fn field_users<'a>(
        &'a self,
        class: &'a str,
        variable: &'a str,
    ) -> impl Iterator<Item = &'a Region> + 'a {
        self.field_usages
            .get_by_member(class, variable)
            .map(|usage| &usage.region)
    }

    /// Regions that pass values into `class.signature` without calling it
    /// directly, such as method references.
    pub fn parameter_users<'a>(
        &'a self,
        class: &'a str,
        signature: &'a str,
    ) -> impl Iterator<Item = &'a Region> + 'a {
        self.parameter_usages
            .get_by_member(class, signature)
            .map(|usage| &usage.region)
    }

    pub fn has_callers(&self, class: &str, signature: &str) -> bool {
        self.callers_of(class, signature).next().is_some()
    }

    /// Whether the declaration behind `location` belongs to this module.
    pub fn declares(&self, location: &Location) -> bool {
        match &location.target {
            Target::Field { variables } => variables
                .iter()
                .any(|var| self.fields.declaration_of(&location.class, var).is_some()),
            Target::Method { signature } | Target::Parameter { signature, .. } => {
                self.methods.find(&location.class, signature).is_some()
            }
        }
    }
}

impl ModuleMembership for ModuleInfo {
    fn contains(&self, location: &Location) -> bool {
        self.declares(location)
    }
}
