use std::fs;
use std::path::{Path, PathBuf};

use indoc::indoc;
use tempfile::TempDir;

use crate::module::{ModuleInfo, ModuleSources};

/// Usage and declaration tables for a small module:
///
/// ```text
/// class Foo { Object bar, baz; Object qux = ..; Foo(); Object get(); void set(Object) }
/// class Sub extends Foo { Object get(); void set(Object) }
/// class Bar { void run(); void call(Sub); void bind() }
/// ```
pub struct Fixture {
    pub methods: &'static str,
    pub fields: &'static str,
    pub field_usages: &'static str,
    pub calls: &'static str,
    pub parameter_usages: &'static str,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            methods: indoc! {"
                id\tparent\tclass\tsignature\tvisibility\tprimitive\tpath
                1\t-1\tFoo\tFoo()\tpublic\tfalse\t$SRC/Foo.java
                2\t-1\tFoo\tget()\tpublic\tfalse\t$SRC/Foo.java
                3\t2\tSub\tget()\tpublic\tfalse\t$SRC/Sub.java
                4\t-1\tFoo\tset(java.lang.Object)\tpublic\ttrue\t$SRC/Foo.java
                5\t4\tSub\tset(java.lang.Object)\tpublic\ttrue\t$SRC/Sub.java
                6\t-1\tBar\trun()\tpublic\ttrue\t$SRC/Bar.java
                7\t-1\tBar\tcall(Sub)\tpublic\ttrue\t$SRC/Bar.java
                8\t-1\tBar\tbind()\tprivate\ttrue\t$SRC/Bar.java
            "},
            fields: indoc! {"
                class\tvariables\tinitialized\tpath
                Foo\tbar,baz\tfalse\t$SRC/Foo.java
                Foo\tqux\ttrue\t$SRC/Foo.java
            "},
            field_usages: indoc! {"
                using_class\tusing_member\tused_member\tused_class\tsource_kind
                Foo\tget()\tbaz\tFoo\tSOURCE
                Bar\trun()\tbar\tFoo\tSOURCE
            "},
            calls: indoc! {"
                using_class\tusing_member\tused_member\tused_class\tsource_kind
                Bar\tcall(Sub)\tget()\tSub\tSOURCE
                Bar\trun()\tset(java.lang.Object)\tFoo\tSOURCE
                Bar\trun()\tsize()\tjava.util.List\tLIBRARY
            "},
            parameter_usages: indoc! {"
                using_class\tusing_member\tused_member\tused_class\tsource_kind
                Bar\tbind()\tset(java.lang.Object)\tFoo\tSOURCE
            "},
        }
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let src = dir.join("src");
    fs::write(&path, contents.replace("$SRC", &src.display().to_string())).unwrap();
    path
}

/// Write `fixture` into a fresh directory and load it as a module.
pub fn module_fixture(fixture: Fixture) -> (TempDir, ModuleInfo) {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    for class in ["Foo", "Sub", "Bar"] {
        fs::write(src.join(format!("{class}.java")), "").unwrap();
    }

    let sources = ModuleSources {
        name: "core".into(),
        errors: dir.path().join("errors.tsv"),
        fixes: None,
        methods: vec![write(dir.path(), "methods.tsv", fixture.methods)],
        fields: vec![write(dir.path(), "fields.tsv", fixture.fields)],
        field_usages: vec![write(dir.path(), "field_usages.tsv", fixture.field_usages)],
        calls: vec![write(dir.path(), "calls.tsv", fixture.calls)],
        parameter_usages: vec![write(
            dir.path(),
            "parameter_usages.tsv",
            fixture.parameter_usages,
        )],
    };
    let module = ModuleInfo::load(sources).unwrap();
    (dir, module)
}

#[test]
fn fixture_loads() {
    let (_dir, module) = module_fixture(Fixture::default());
    assert_eq!(module.methods().len(), 8);
    assert_eq!(module.fields().len(), 2);
    assert_eq!(module.methods().public_non_primitive_methods().count(), 2);
}
