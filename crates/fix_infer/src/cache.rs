use fix_model::{Fix, Impact, Location, Region};
use region_index::RegionRegistry;
use rustc_hash::{FxHashMap, FxHashSet};

/// Per-fix measurements, valid until an injection touches one of the regions
/// an entry was observed over.
#[derive(Debug, Default)]
pub struct ImpactCache {
    store: FxHashMap<Location, Impact>,
}

impl ImpactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn fetch_impact(&self, fix: &Fix) -> Option<&Impact> {
        self.store
            .get(fix.location())
            .filter(|impact| impact.fix == *fix)
    }

    pub fn is_unknown(&self, fix: &Fix) -> bool {
        self.fetch_impact(fix).is_none()
    }

    pub fn update_cache_state(&mut self, impacts: impl IntoIterator<Item = Impact>) {
        for impact in impacts {
            self.store.insert(impact.location().clone(), impact);
        }
    }

    pub fn impacts(&self) -> impl Iterator<Item = &Impact> {
        self.store.values()
    }

    /// Drop every entry observed over a region that `injected` may have
    /// changed, along with the entries of the injected fixes themselves.
    pub fn update_impacts_after_injection(
        &mut self,
        injected: &[Fix],
        registry: &dyn RegionRegistry,
    ) {
        let mut touched: FxHashSet<Region> = FxHashSet::default();
        for fix in injected {
            for location in fix.locations() {
                touched.extend(registry.impacted_regions(location).into_iter().flatten());
            }
        }

        let before = self.store.len();
        self.store.retain(|_, impact| {
            impact.regions.is_disjoint(&touched) && !injected.contains(&impact.fix)
        });
        log::debug!(
            "evicted {} of {before} cached impacts after injecting {} fixes",
            before - self.store.len(),
            injected.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_model::{Change, CheckError, DEFAULT_ANNOTATION};

    struct Regions(Vec<(Location, FxHashSet<Region>)>);

    impl RegionRegistry for Regions {
        fn impacted_regions(&self, location: &Location) -> Option<FxHashSet<Region>> {
            self.0
                .iter()
                .find(|(known, _)| known == location)
                .map(|(_, regions)| regions.clone())
        }

        fn impacted_regions_by_use(&self, location: &Location) -> Option<FxHashSet<Region>> {
            self.impacted_regions(location)
        }
    }

    fn fix(location: Location) -> Fix {
        Fix::new(Change::add(location, DEFAULT_ANNOTATION), "TEST", true)
    }

    fn regions(list: &[(&str, &str)]) -> FxHashSet<Region> {
        list.iter().map(|(c, m)| Region::new(*c, *m)).collect()
    }

    #[test]
    fn fetch_by_location() {
        let mut cache = ImpactCache::new();
        let a = fix(Location::method("Foo", "a()"));
        let mut impact = Impact::new(a.clone(), regions(&[("Foo", "a()")]));
        impact
            .triggered_errors
            .push(CheckError::new("RETURN_NULLABLE", "r", Region::new("Foo", "a()"), 0));
        cache.update_cache_state([impact]);

        assert!(!cache.is_unknown(&a));
        assert_eq!(cache.fetch_impact(&a).unwrap().effect(), 1);
        assert!(cache.is_unknown(&fix(Location::method("Foo", "b()"))));
    }

    #[test]
    fn injection_evicts_overlapping_entries() {
        let a = fix(Location::method("Foo", "a()"));
        let b = fix(Location::method("Foo", "b()"));
        let c = fix(Location::method("Foo", "c()"));
        let mut cache = ImpactCache::new();
        cache.update_cache_state([
            Impact::new(a.clone(), regions(&[("Foo", "a()"), ("Bar", "run()")])),
            Impact::new(b.clone(), regions(&[("Foo", "b()")])),
            Impact::new(c.clone(), regions(&[("Foo", "c()")])),
        ]);

        let registry = Regions(vec![
            (c.location().clone(), regions(&[("Foo", "c()")])),
            (
                Location::method("Baz", "z()"),
                regions(&[("Baz", "z()"), ("Bar", "run()")]),
            ),
        ]);
        cache.update_impacts_after_injection(
            &[fix(Location::method("Baz", "z()"))],
            &registry,
        );
        assert!(cache.is_unknown(&a));
        assert!(!cache.is_unknown(&b));
        assert!(!cache.is_unknown(&c));

        cache.update_impacts_after_injection(&[c.clone()], &registry);
        assert!(cache.is_unknown(&c));
        assert_eq!(cache.len(), 1);
    }
}
