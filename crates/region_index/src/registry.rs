// ==============================================================================
// Region Registries
// ==============================================================================
//
// For a location, the regions whose checker outcome may change when the
// location's annotation changes. `None` means the location is not declared in
// the module, so nothing about it can be measured or injected there.

use fix_model::{Location, LocationKind, Region, Target};
use rustc_hash::FxHashSet;

use crate::module::ModuleInfo;

pub trait RegionRegistry {
    /// Every region that may be affected by changing `location`.
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>>;

    /// Only the regions that use `location` lexically.
    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>>;
}

pub struct FieldRegionRegistry<'a> {
    module: &'a ModuleInfo,
}

impl<'a> FieldRegionRegistry<'a> {
    pub fn new(module: &'a ModuleInfo) -> Self {
        Self { module }
    }

    fn users(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let fields = self.module.fields();
        let mut declared = fields.declarations_for(location).peekable();
        declared.peek()?;

        let mut regions = FxHashSet::default();
        for declaration in declared {
            for var in &declaration.variables {
                regions.extend(self.module.field_users(&location.class, var).cloned());
            }
        }
        Some(regions)
    }
}

impl RegionRegistry for FieldRegionRegistry<'_> {
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let mut regions = self.users(location)?;
        let fields = self.module.fields();
        for declaration in fields.declarations_for(location) {
            regions.extend(
                declaration
                    .variables
                    .iter()
                    .map(|var| Region::new(location.class.clone(), var.clone())),
            );
        }
        // Without an initializer every constructor must assign the field, and
        // the checker reports the miss on the class-level region.
        if fields.is_uninitialized(location) {
            regions.extend(
                self.module
                    .methods()
                    .constructors_of(&location.class)
                    .map(|ctor| ctor.region()),
            );
            regions.insert(Region::class_level(location.class.clone()));
        }
        Some(regions)
    }

    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
        self.users(location)
    }
}

pub struct MethodRegionRegistry<'a> {
    module: &'a ModuleInfo,
}

impl<'a> MethodRegionRegistry<'a> {
    pub fn new(module: &'a ModuleInfo) -> Self {
        Self { module }
    }
}

impl RegionRegistry for MethodRegionRegistry<'_> {
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let Target::Method { signature } = &location.target else {
            return None;
        };
        let methods = self.module.methods();
        let record = methods.get(methods.find(&location.class, signature)?);

        let mut regions: FxHashSet<Region> = self
            .module
            .callers_of(&location.class, signature)
            .cloned()
            .collect();
        regions.insert(record.region());
        if let Some(parent) = methods.closest_super_method(&location.class, signature) {
            regions.insert(parent.region());
        }
        Some(regions)
    }

    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let signature = location.signature()?;
        self.module.methods().find(&location.class, signature)?;
        Some(
            self.module
                .callers_of(&location.class, signature)
                .cloned()
                .collect(),
        )
    }
}

pub struct ParameterRegionRegistry<'a> {
    module: &'a ModuleInfo,
}

impl<'a> ParameterRegionRegistry<'a> {
    pub fn new(module: &'a ModuleInfo) -> Self {
        Self { module }
    }
}

impl RegionRegistry for ParameterRegionRegistry<'_> {
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let Target::Parameter { signature, .. } = &location.target else {
            return None;
        };
        let methods = self.module.methods();
        let record = methods.get(methods.find(&location.class, signature)?);

        let mut regions = self.impacted_regions_by_use(location)?;
        regions.insert(record.region());
        // Overriding methods must accept the now nullable argument too.
        regions.extend(
            methods
                .sub_methods(&location.class, signature)
                .into_iter()
                .map(|sub| sub.region()),
        );
        Some(regions)
    }

    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
        let signature = location.signature()?;
        self.module.methods().find(&location.class, signature)?;
        let mut regions: FxHashSet<Region> = self
            .module
            .callers_of(&location.class, signature)
            .cloned()
            .collect();
        regions.extend(
            self.module
                .parameter_users(&location.class, signature)
                .cloned(),
        );
        Some(regions)
    }
}

/// Dispatches to the registry responsible for the kind of a location.
pub struct CompoundRegistry<'a> {
    field: FieldRegionRegistry<'a>,
    method: MethodRegionRegistry<'a>,
    parameter: ParameterRegionRegistry<'a>,
}

impl<'a> CompoundRegistry<'a> {
    pub fn new(module: &'a ModuleInfo) -> Self {
        Self {
            field: FieldRegionRegistry::new(module),
            method: MethodRegionRegistry::new(module),
            parameter: ParameterRegionRegistry::new(module),
        }
    }

    fn registry_for(&self, kind: LocationKind) -> &dyn RegionRegistry {
        match kind {
            LocationKind::Field => &self.field,
            LocationKind::Method => &self.method,
            LocationKind::Parameter => &self.parameter,
        }
    }
}

impl RegionRegistry for CompoundRegistry<'_> {
    fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
        self.registry_for(location.kind()).impacted_regions(location)
    }

    fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
        self.registry_for(location.kind())
            .impacted_regions_by_use(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{module_fixture, Fixture};

    fn regions(list: &[(&str, &str)]) -> FxHashSet<Region> {
        list.iter().map(|(c, m)| Region::new(*c, *m)).collect()
    }

    #[test]
    fn uninitialized_field_reaches_constructors_and_class_region() {
        let (_dir, module) = module_fixture(Fixture::default());
        let registry = module.registry();

        let impacted = registry
            .impacted_regions(&Location::field("Foo", ["bar"]))
            .unwrap();
        assert_eq!(
            impacted,
            regions(&[
                ("Foo", "bar"),
                ("Foo", "baz"),
                ("Foo", "Foo()"),
                ("Foo", "null"),
                ("Foo", "get()"),
                ("Bar", "run()"),
            ])
        );

        let by_use = registry
            .impacted_regions_by_use(&Location::field("Foo", ["baz"]))
            .unwrap();
        assert_eq!(by_use, regions(&[("Foo", "get()"), ("Bar", "run()")]));
    }

    #[test]
    fn method_reaches_callers_and_super_method() {
        let (_dir, module) = module_fixture(Fixture::default());
        let registry = module.registry();

        let impacted = registry
            .impacted_regions(&Location::method("Sub", "get()"))
            .unwrap();
        assert_eq!(
            impacted,
            regions(&[("Sub", "get()"), ("Foo", "get()"), ("Bar", "call(Sub)")])
        );
    }

    #[test]
    fn parameter_reaches_overriding_methods_and_references() {
        let (_dir, module) = module_fixture(Fixture::default());
        let registry = module.registry();

        let impacted = registry
            .impacted_regions(&Location::parameter("Foo", "set(java.lang.Object)", 0))
            .unwrap();
        assert_eq!(
            impacted,
            regions(&[
                ("Foo", "set(java.lang.Object)"),
                ("Sub", "set(java.lang.Object)"),
                ("Bar", "run()"),
                ("Bar", "bind()"),
            ])
        );
    }

    #[test]
    fn undeclared_locations_are_unresolvable() {
        let (_dir, module) = module_fixture(Fixture::default());
        let registry = module.registry();

        assert!(registry
            .impacted_regions(&Location::method("java.util.List", "get(int)"))
            .is_none());
        assert!(registry
            .impacted_regions(&Location::field("Foo", ["missing"]))
            .is_none());
        assert!(registry
            .impacted_regions_by_use(&Location::parameter("Foo", "nope()", 0))
            .is_none());
    }
}
