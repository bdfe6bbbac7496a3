use semver::Version;

use crate::{
    is_module_not_found, is_pseudo_version, module_path_for_major, next_major, parse_go_version,
    strip_major_suffix, Binary, Error, Kind, Module, ModuleVersion, Package, VersionConstraint,
};

#[test]
fn strip_major_suffix_only_strips_v2_and_above() {
    assert_eq!(
        strip_major_suffix("example.com/tool/v2"),
        ("example.com/tool", 2)
    );
    assert_eq!(
        strip_major_suffix("example.com/tool/v12"),
        ("example.com/tool", 12)
    );
    assert_eq!(strip_major_suffix("example.com/tool"), ("example.com/tool", 1));
    assert_eq!(
        strip_major_suffix("example.com/tool/v1"),
        ("example.com/tool/v1", 1)
    );
    assert_eq!(
        strip_major_suffix("example.com/tool/v0"),
        ("example.com/tool/v0", 1)
    );
    assert_eq!(
        strip_major_suffix("example.com/tool/v2beta"),
        ("example.com/tool/v2beta", 1)
    );
}

#[test]
fn module_path_for_major_round_trips() {
    assert_eq!(
        module_path_for_major("example.com/tool", 2),
        "example.com/tool/v2"
    );
    assert_eq!(
        module_path_for_major("example.com/tool/v2", 3),
        "example.com/tool/v3"
    );
    assert_eq!(
        module_path_for_major("example.com/tool/v3", 1),
        "example.com/tool"
    );
}

#[test]
fn next_major_skips_v1() {
    assert_eq!(next_major(0), 2);
    assert_eq!(next_major(1), 2);
    assert_eq!(next_major(2), 3);
    assert_eq!(next_major(11), 12);
}

#[test]
fn parse_go_version_requires_v_prefix() {
    assert_eq!(
        parse_go_version("v1.2.3").expect("must parse"),
        Version::new(1, 2, 3)
    );
    assert!(parse_go_version("1.2.3").is_err());
    assert!(parse_go_version("v1.2").is_err());
}

#[test]
fn pseudo_version_detection() {
    assert!(is_pseudo_version("v0.0.0-20240101120000-abcdef123456"));
    assert!(is_pseudo_version("v1.2.4-0.20240101120000-abcdef123456"));
    assert!(is_pseudo_version(
        "v1.2.4-pre.0.20240101120000-abcdef123456"
    ));
    assert!(!is_pseudo_version("v1.2.3"));
    assert!(!is_pseudo_version("v1.2.3-rc.1"));
    assert!(!is_pseudo_version("not-a-version"));
}

#[test]
fn module_version_display_is_go_shaped() {
    assert_eq!(ModuleVersion::Latest.to_string(), "latest");
    assert_eq!(
        ModuleVersion::parse("v2.1.0").expect("must parse").to_string(),
        "v2.1.0"
    );
    assert!(ModuleVersion::parse("two").is_err());
}

#[test]
fn package_splits_subpath_from_module() {
    let module = Module::new(
        "github.com/acme/tool",
        ModuleVersion::parse("v1.0.0").expect("must parse"),
    );
    let package = Package::from_package_path("github.com/acme/tool/cmd/tool", module.clone());
    assert_eq!(package.subpath.as_deref(), Some("cmd/tool"));
    assert_eq!(package.import_path(), "github.com/acme/tool/cmd/tool");
    assert_eq!(package.to_string(), "github.com/acme/tool/cmd/tool@v1.0.0");

    let bare = Package::from_package_path("github.com/acme/tool", module);
    assert_eq!(bare.subpath, None);
}

#[test]
fn package_spec_parsing_defaults_to_latest() {
    let bare = Package::from_spec("github.com/acme/tool/cmd/tool").expect("must parse");
    assert_eq!(bare.module.path, "github.com/acme/tool/cmd/tool");
    assert_eq!(bare.module.version, ModuleVersion::Latest);
    assert_eq!(bare.subpath, None);

    let versioned = Package::from_spec("github.com/acme/tool@v1.2.3").expect("must parse");
    assert_eq!(versioned.module.to_string(), "github.com/acme/tool@v1.2.3");

    assert!(Package::from_spec("@latest").is_err());
    assert!(Package::from_spec("github.com/acme/tool@1.2.3").is_err());
}

#[test]
fn package_import_path_reinserts_major_segment() {
    let module = Module::new(
        "github.com/acme/tool",
        ModuleVersion::parse("v1.0.0").expect("must parse"),
    );
    let package = Package::from_package_path("github.com/acme/tool/cmd/tool", module);
    assert_eq!(
        package.import_path_for_major(2),
        "github.com/acme/tool/v2/cmd/tool"
    );
    assert_eq!(
        package.import_path_for_major(1),
        "github.com/acme/tool/cmd/tool"
    );
}

#[test]
fn binary_spec_parsing() {
    let bare = Binary::parse("rg").expect("must parse");
    assert_eq!(bare.name, "rg");
    assert!(bare.constraint.is_none());

    let major = Binary::parse("rg@v14").expect("must parse");
    assert_eq!(major.constraint, Some(VersionConstraint::Major(14)));

    let minor = Binary::parse("rg@v14.1").expect("must parse");
    assert_eq!(minor.constraint, Some(VersionConstraint::MajorMinor(14, 1)));

    let exact = Binary::parse("rg@v14.1.0").expect("must parse");
    assert_eq!(
        exact.constraint,
        Some(VersionConstraint::Exact(Version::new(14, 1, 0)))
    );

    assert!(Binary::parse("@v1").is_err());
    assert!(Binary::parse("rg@14").is_err());
    assert!(Binary::parse("rg@v1.x").is_err());
}

#[test]
fn constraint_interval_matching() {
    let major = VersionConstraint::parse("v2").expect("must parse");
    assert!(major.matches(&Version::new(2, 0, 0)));
    assert!(major.matches(&Version::new(2, 9, 1)));
    assert!(!major.matches(&Version::new(3, 0, 0)));
    assert!(!major.matches(&Version::new(1, 9, 9)));

    let minor = VersionConstraint::parse("v2.1").expect("must parse");
    assert!(minor.matches(&Version::new(2, 1, 0)));
    assert!(minor.matches(&Version::new(2, 1, 7)));
    assert!(!minor.matches(&Version::new(2, 2, 0)));

    let exact = VersionConstraint::parse("v2.1.3").expect("must parse");
    assert!(exact.matches(&Version::new(2, 1, 3)));
    assert!(!exact.matches(&Version::new(2, 1, 4)));
}

#[test]
fn kind_alias_names() {
    let version = Version::new(2, 1, 0);
    assert_eq!(Kind::Latest.alias_name("rg", &version), "rg");
    assert_eq!(Kind::Major.alias_name("rg", &version), "rg-v2");
    assert_eq!(Kind::Minor.alias_name("rg", &version), "rg-v2.1");
}

#[test]
fn module_not_found_is_recognized_through_anyhow_chain() {
    let err = anyhow::Error::new(Error::ModuleNotFound("example.com/tool/v3".to_string()));
    assert!(is_module_not_found(&err));

    let other = anyhow::anyhow!("proxy unreachable");
    assert!(!is_module_not_found(&other));
}
