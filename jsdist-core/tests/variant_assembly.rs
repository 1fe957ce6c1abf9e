use jsdist_core::assemble::{FragmentSet, SourceFragment, VariantAssembler};
use jsdist_core::config::{LibraryConfig, VariantConfig};
use jsdist_core::ReleaseError;

fn library() -> LibraryConfig {
    LibraryConfig {
        name: "DOMBuilder".into(),
        title: None,
        homepage: Some("https://github.com/insin/DOMBuilder".into()),
        license: "MIT".into(),
        mode_trailer: Some("DOMBuilder.mode = '{mode}';".into()),
    }
}

fn fragment(name: &str, contents: &str) -> SourceFragment {
    SourceFragment {
        name: name.into(),
        contents: contents.into(),
    }
}

fn variant(fragments: &[&str], modes: &str, pin_mode: Option<&str>) -> VariantConfig {
    VariantConfig {
        name: "test".into(),
        qualifier: None,
        fragments: fragments.iter().map(|f| f.to_string()).collect(),
        modes: modes.into(),
        pin_mode: pin_mode.map(str::to_string),
        compress: false,
    }
}

#[test]
fn header_names_title_version_modes_and_license() {
    let library = library();
    let assembler = VariantAssembler::new(&library, "2.1.6");
    assert_eq!(
        assembler.header("dom [default], html"),
        "/**\n * DOMBuilder 2.1.6 (modes: dom [default], html) - https://github.com/insin/DOMBuilder\n * MIT licensed\n */\n"
    );
}

#[test]
fn header_omits_missing_homepage() {
    let mut library = library();
    library.homepage = None;
    library.title = Some("DOM Builder".into());
    let assembler = VariantAssembler::new(&library, "1.0");
    assert_eq!(
        assembler.header("dom"),
        "/**\n * DOM Builder 1.0 (modes: dom)\n * MIT licensed\n */\n"
    );
}

#[test]
fn fragments_are_concatenated_in_declared_order() {
    let library = library();
    let assembler = VariantAssembler::new(&library, "2.0.0");
    let set = FragmentSet::new(vec![
        fragment("html", "html();\n"),
        fragment("core", "core();\n"),
        fragment("dom", "dom();\n"),
    ]);

    let assembled = assembler
        .assemble_variant(&set, &variant(&["core", "dom", "html"], "dom", None))
        .unwrap();
    assert_eq!(assembled.body, "core();\ndom();\nhtml();\n");

    let reversed = assembler
        .assemble_variant(&set, &variant(&["html", "core"], "html", None))
        .unwrap();
    assert_eq!(reversed.body, "html();\ncore();\n");
}

#[test]
fn pinned_mode_appends_trailer_last() {
    let library = library();
    let assembler = VariantAssembler::new(&library, "2.0.0");
    let set = FragmentSet::new(vec![fragment("core", "core();"), fragment("html", "html();")]);

    let assembled = assembler
        .assemble_variant(&set, &variant(&["core", "html"], "html [default]", Some("html")))
        .unwrap();
    assert_eq!(assembled.body, "core();\nhtml();\nDOMBuilder.mode = 'html';\n");
    assert!(assembled.text().starts_with("/**\n * DOMBuilder 2.0.0 (modes: html [default])"));
}

#[test]
fn pinning_without_trailer_is_a_configuration_error() {
    let mut library = library();
    library.mode_trailer = None;
    let assembler = VariantAssembler::new(&library, "2.0.0");
    let core = fragment("core", "core();\n");

    let err = assembler.assemble(&[&core], "html", Some("html")).unwrap_err();
    assert!(matches!(err, ReleaseError::Configuration(_)));
}

#[test]
fn unknown_fragment_is_a_configuration_error() {
    let library = library();
    let assembler = VariantAssembler::new(&library, "2.0.0");
    let set = FragmentSet::new(vec![fragment("core", "core();\n")]);

    let err = assembler
        .assemble_variant(&set, &variant(&["core", "template"], "template", None))
        .unwrap_err();
    assert!(err.to_string().contains("template"));
}

#[test]
fn assembly_is_idempotent() {
    let library = library();
    let set = FragmentSet::new(vec![fragment("core", "core();\n"), fragment("dom", "dom();")]);
    let definition = variant(&["core", "dom"], "dom [default]", Some("dom"));

    let first = VariantAssembler::new(&library, "2.1.0")
        .assemble_variant(&set, &definition)
        .unwrap();
    let second = VariantAssembler::new(&library, "2.1.0")
        .assemble_variant(&set, &definition)
        .unwrap();
    assert_eq!(first.text().as_bytes(), second.text().as_bytes());
}

#[test]
fn compressed_body_keeps_the_header() {
    let library = library();
    let assembler = VariantAssembler::new(&library, "2.1.0");
    let core = fragment("core", "var a = 1;\n");
    let assembled = assembler.assemble(&[&core], "dom", None).unwrap();

    let text = assembled.with_body("var a=1;");
    assert_eq!(text, format!("{}var a=1;\n", assembler.header("dom")));
}
