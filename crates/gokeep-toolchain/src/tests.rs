use semver::Version;

use gokeep_core::Error;

use crate::buildinfo::BuildInfo;
use crate::modfile::ModuleManifest;
use crate::system::{OsSystem, System};
use crate::vuln::parse_vulncheck_output;

const SAMPLE_VERSION_M: &str = "\
/home/user/go/bin/tool: go1.22.1
\tpath\tgithub.com/acme/tool/cmd/tool
\tmod\tgithub.com/acme/tool\tv1.4.2\th1:XaTxnvJEeSiuYstV2utQEBBPO3nc8vZ/ZdEcn1fFu5s=
\tdep\tgolang.org/x/sys\tv0.18.0\th1:DBdB3niSjOA/O0blCZBqDefyWNYveAYMNF1Wum0DYQ4=
\tbuild\t-buildmode=exe
\tbuild\tGOOS=linux
\tbuild\tGOARCH=amd64
\tbuild\tGOAMD64=v1
\tbuild\tCGO_ENABLED=1
\tbuild\tvcs.revision=0123456789abcdef0123456789abcdef01234567
\tbuild\tvcs.time=2024-03-01T10:00:00Z
";

#[test]
fn build_info_parses_version_m_report() {
    let info = BuildInfo::parse("/home/user/go/bin/tool", SAMPLE_VERSION_M).expect("must parse");
    assert_eq!(info.go_version, "go1.22.1");
    assert_eq!(info.package_path, "github.com/acme/tool/cmd/tool");
    assert_eq!(info.module_path, "github.com/acme/tool");
    assert_eq!(info.module_version, "v1.4.2");
    assert!(info.module_sum.starts_with("h1:"));

    let settings = info.classify_settings();
    assert_eq!(settings.os, "linux");
    assert_eq!(settings.arch, "amd64");
    assert_eq!(settings.feature, "GOAMD64=v1");
    assert_eq!(settings.env_vars.get("CGO_ENABLED").map(String::as_str), Some("1"));
    assert_eq!(
        settings.commit_revision.as_deref(),
        Some("0123456789abcdef0123456789abcdef01234567")
    );
    assert_eq!(settings.commit_time.as_deref(), Some("2024-03-01T10:00:00Z"));
}

#[test]
fn build_info_without_module_lines_is_a_typed_error() {
    let report = "/home/user/go/bin/old: go1.11\n";
    let err = BuildInfo::parse("/home/user/go/bin/old", report).expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::BuiltWithoutGoModules(_))
    ));
}

#[test]
fn build_info_without_sum_is_orphaned_shaped() {
    let report = "\
/tmp/tool: go1.22.1
\tpath\texample.com/tool
\tmod\texample.com/tool\tv0.0.0-20240101120000-abcdef123456
";
    let info = BuildInfo::parse("/tmp/tool", report).expect("must parse");
    assert!(info.module_sum.is_empty());
}

#[test]
fn build_info_rejects_unrecognized_header() {
    let err = BuildInfo::parse("/bin/ls", "/bin/ls: not a Go binary\n").expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::BinaryNotFound(_))
    ));
}

#[test]
fn modfile_parses_module_and_deprecation() {
    let raw = "\
// Deprecated: use example.com/tool/v2 instead.
module example.com/tool

go 1.21

require golang.org/x/sys v0.18.0
";
    let manifest = ModuleManifest::parse(raw).expect("must parse");
    assert_eq!(manifest.module_path, "example.com/tool");
    assert_eq!(
        manifest.deprecated.as_deref(),
        Some("use example.com/tool/v2 instead.")
    );
    assert!(manifest.retractions.is_empty());
}

#[test]
fn modfile_parses_retract_forms() {
    let raw = "\
module example.com/tool

retract v1.0.5 // broken release
retract [v1.1.0, v1.1.9]
retract (
    v1.2.0 // mistagged
    [v1.3.0, v1.3.2] // security
)
";
    let manifest = ModuleManifest::parse(raw).expect("must parse");
    assert_eq!(manifest.retractions.len(), 4);

    assert_eq!(
        manifest.retraction_for(&Version::new(1, 0, 5)).as_deref(),
        Some("broken release")
    );
    // Range retraction without rationale still reports the marker text.
    assert_eq!(
        manifest.retraction_for(&Version::new(1, 1, 4)).as_deref(),
        Some("retracted by module author")
    );
    assert_eq!(
        manifest.retraction_for(&Version::new(1, 3, 2)).as_deref(),
        Some("security")
    );
    assert!(manifest.retraction_for(&Version::new(1, 4, 0)).is_none());
}

#[test]
fn modfile_interval_is_inclusive() {
    let raw = "module m\nretract [v1.1.0, v1.2.0]\n";
    let manifest = ModuleManifest::parse(raw).expect("must parse");
    assert!(manifest.retraction_for(&Version::new(1, 1, 0)).is_some());
    assert!(manifest.retraction_for(&Version::new(1, 2, 0)).is_some());
    assert!(manifest.retraction_for(&Version::new(1, 0, 9)).is_none());
    assert!(manifest.retraction_for(&Version::new(1, 2, 1)).is_none());
}

#[test]
fn modfile_rejects_malformed_input() {
    assert!(ModuleManifest::parse("go 1.21\n").is_err());
    assert!(ModuleManifest::parse("module m\nretract [v1.0.0\n").is_err());
    assert!(ModuleManifest::parse("module m\nretract (\n  v1.0.0\n").is_err());
}

#[test]
fn vulncheck_keeps_only_affected_findings() {
    let stream = r#"
{"config":{"protocol_version":"v1.0.0"}}
{"osv":{"id":"GO-2024-1234","summary":"Thing is exploitable"}}
{"osv":{"id":"GO-2024-9999","summary":"Imported but unreachable"}}
{"finding":{"osv":"GO-2024-1234","trace":[{"module":"example.com/dep","function":"Parse"}]}}
{"finding":{"osv":"GO-2024-9999","trace":[{"module":"example.com/dep"}]}}
"#;
    let vulns = parse_vulncheck_output(stream).expect("must parse");
    assert_eq!(vulns.len(), 1);
    assert_eq!(vulns[0].id, "GO-2024-1234");
    assert_eq!(vulns[0].url, "https://pkg.go.dev/vuln/GO-2024-1234");
    assert_eq!(vulns[0].details, "Thing is exploitable");
}

#[test]
fn vulncheck_rejects_garbage() {
    assert!(parse_vulncheck_output("not json at all {").is_err());
    assert!(parse_vulncheck_output("").expect("empty is fine").is_empty());
}

#[cfg(unix)]
#[test]
fn executable_test_requires_execute_bit() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("must create tempdir");
    let plain = dir.path().join("plain");
    let exec = dir.path().join("exec");
    std::fs::write(&plain, b"data").expect("must write");
    std::fs::write(&exec, b"#!/bin/sh\n").expect("must write");
    std::fs::set_permissions(&exec, std::fs::Permissions::from_mode(0o755))
        .expect("must chmod");

    let system = OsSystem;
    assert!(!system.is_executable(&plain));
    assert!(system.is_executable(&exec));
    assert!(!system.is_executable(dir.path()));
}
