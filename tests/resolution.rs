// tests/resolution.rs

//! End-to-end tests of the directive resolution loop and flattened writes.

mod common;

use common::{project_with_venv, read, write_req};
use reqlock::resolver::ResolutionSet;
use reqlock::Error;

#[test]
fn test_acyclic_graph_fully_resolves() {
    let (_guard, base) = project_with_venv(&["requirements/dev"]);
    let dev = write_req(&base, "requirements/dev.in", "-c ../pins.in\npip>=24.2\n");
    write_req(&base, "pins.in", "requests==2.31\n");

    let resolution = ResolutionSet::load_sources(".venv", &[dev]).unwrap();
    assert_eq!(resolution.resolved().len(), 2, "dev.in plus discovered pins.in");

    let dev_container = resolution
        .resolved()
        .iter()
        .find(|c| c.file_abspath.ends_with("dev.in"))
        .unwrap();
    assert!(dev_container.constraints.is_empty());
    assert!(dev_container.donated.contains("requests==2.31"));
}

#[test]
fn test_donations_propagate_through_chain() {
    let (_guard, base) = project_with_venv(&["requirements/dev"]);
    let dev = write_req(
        &base,
        "requirements/dev.in",
        "-c mid.in\n-r pins.in\ncoverage>=7.0\n",
    );
    write_req(&base, "requirements/mid.in", "-c pins.in\nattrs\n");
    write_req(&base, "requirements/pins.in", "pip<25\n");

    let resolution = ResolutionSet::load_sources(".venv", &[dev]).unwrap();
    let dev_container = resolution
        .resolved()
        .iter()
        .find(|c| c.file_abspath.ends_with("dev.in"))
        .unwrap();

    // pip<25 arrives twice: directly via -r and again through mid.in's
    // donations; attrs arrives from mid.in itself
    assert!(dev_container.donated.contains("pip<25"));
    assert!(dev_container.donated.contains("attrs"));
}

#[test]
fn test_missing_directive_target_is_fatal() {
    let (_guard, base) = project_with_venv(&["requirements/dev"]);
    let dev = write_req(&base, "requirements/dev.in", "-c nope.in\npip\n");

    let err = ResolutionSet::load_sources(".venv", &[dev]).unwrap_err();
    match err {
        Error::MissingRequirementsFile(msg) => {
            assert!(msg.contains("nope.in"), "diagnostic names the missing file: {msg}");
        }
        other => panic!("expected MissingRequirementsFile, got {other:?}"),
    }
}

#[test]
fn test_missing_listed_source_is_fatal() {
    let (_guard, base) = project_with_venv(&["requirements/dev"]);
    let never_written = base.join("requirements/dev.in");

    let err = ResolutionSet::load_sources(".venv", &[never_written]).unwrap_err();
    assert!(matches!(err, Error::MissingRequirementsFile(_)));
}

#[test]
fn test_cyclic_graph_stalls_with_diagnostic() {
    let (_guard, base) = project_with_venv(&["requirements/a"]);
    let a = write_req(&base, "requirements/a.in", "-c b.in\npip\n");
    write_req(&base, "requirements/b.in", "-c a.in\nrequests\n");

    let err = ResolutionSet::load_sources(".venv", &[a]).unwrap_err();
    match err {
        Error::MissingRequirementsFile(msg) => {
            assert!(msg.contains("a.in"), "stall diagnostic lists a.in: {msg}");
            assert!(msg.contains("b.in"), "stall diagnostic lists b.in: {msg}");
        }
        other => panic!("expected MissingRequirementsFile, got {other:?}"),
    }
}

#[test]
fn test_write_flattened_merges_and_sorts() {
    let (_guard, base) = project_with_venv(&["requirements/dev"]);
    let dev = write_req(&base, "requirements/dev.in", "-c ../pins.in\npip>=24.2\n");
    write_req(&base, "pins.in", "requests==2.31\n");

    let resolution = ResolutionSet::load_sources(".venv", &[dev]).unwrap();
    let written = resolution.write_flattened().unwrap();

    let dev_unlock = base.join("requirements/dev.unlock");
    assert!(written.contains(&dev_unlock));
    assert_eq!(read(&dev_unlock), "pip>=24.2\nrequests==2.31\n");

    // a second pass finds everything current and writes nothing
    let rewritten = resolution.write_flattened().unwrap();
    assert!(rewritten.is_empty());
}

#[test]
fn test_shared_sources_are_never_rendered() {
    let (_guard, base) = project_with_venv(&["requirements/dev", "requirements/pins.shared"]);
    let dev = write_req(
        &base,
        "requirements/dev.in",
        "-c pins.shared.in\npip>=24.2\n",
    );
    let shared = write_req(&base, "requirements/pins.shared.in", "requests==2.31\n");

    let resolution = ResolutionSet::load_sources(".venv", &[dev, shared]).unwrap();
    resolution.write_flattened().unwrap();

    assert!(base.join("requirements/dev.unlock").is_file());
    assert!(
        !base.join("requirements/pins.shared.unlock").exists(),
        "shared sources belong to several venvs and are not rendered here"
    );
}
