use proptest::prelude::{prop, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy};
use proptest::prop_compose;
use smol_str::SmolStr;

use crate::{Change, Fix, Location, Region, DEFAULT_ANNOTATION};

// Small name pools so that generated values collide often enough to exercise
// conflicts and cache evictions.
fn arb_class() -> impl Strategy<Value = SmolStr> {
    prop_oneof![Just("Foo"), Just("Bar"), Just("Baz"), Just("a.b.Qux")].prop_map(SmolStr::from)
}

fn arb_member() -> impl Strategy<Value = SmolStr> {
    prop_oneof![
        Just("null"),
        Just("f"),
        Just("g"),
        Just("m()"),
        Just("n(int)"),
        Just("run(java.lang.Object)"),
    ]
    .prop_map(SmolStr::from)
}

prop_compose! {
    pub fn arb_region()(class in arb_class(), member in arb_member()) -> Region {
        Region::new(class, member)
    }
}

pub fn arb_location() -> impl Strategy<Value = Location> {
    prop_oneof![
        (arb_class(), prop::sample::subsequence(vec!["f", "g", "h"], 1..3))
            .prop_map(|(class, vars)| Location::field(class, vars)),
        (arb_class(), prop_oneof![Just("m()"), Just("n(int)")])
            .prop_map(|(class, sig)| Location::method(class, sig)),
        (arb_class(), Just("n(int)"), 0u32..2)
            .prop_map(|(class, sig, index)| Location::parameter(class, sig, index)),
    ]
}

impl Arbitrary for Region {
    type Parameters = ();
    type Strategy = BoxedStrategy<Region>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        arb_region().boxed()
    }
}

impl Arbitrary for Fix {
    type Parameters = ();
    type Strategy = BoxedStrategy<Fix>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        arb_location()
            .prop_map(|location| {
                Fix::new(Change::add(location, DEFAULT_ANNOTATION), "PBT", true)
            })
            .boxed()
    }
}
