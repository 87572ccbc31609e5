//! End-to-end generation tests: manifest in, three artifacts and a
//! ledger out, with identifier stability across successive runs.

use gatec::{ArtifactPaths, GeneratorConfig};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_V1: &str = r#"
[library]
name = "bagl"

[[function]]
name = "screen_update"

[[function]]
name = "screen_draw_rect"
return = "int"

[[function.param]]
type = "unsigned int"
name = "color"

[[function.param]]
type = "unsigned char *"
name = "bitmap"
length = "bitmap_len"
"#;

// v2 adds a call; existing declarations are untouched
const MANIFEST_V2: &str = r#"
[library]
name = "bagl"

[[function]]
name = "screen_update"

[[function]]
name = "screen_draw_rect"
return = "int"

[[function.param]]
type = "unsigned int"
name = "color"

[[function.param]]
type = "unsigned char *"
name = "bitmap"
length = "bitmap_len"

[[function]]
name = "seph_send"

[[function.param]]
type = "unsigned char *"
name = "buffer"
"#;

struct Workspace {
    _temp: tempfile::TempDir,
    manifest: PathBuf,
    outputs: ArtifactPaths,
    ledger: PathBuf,
}

fn workspace(manifest_content: &str) -> Workspace {
    let temp = tempfile::tempdir().unwrap();
    let manifest = temp.path().join("bagl.toml");
    fs::write(&manifest, manifest_content).unwrap();
    let outputs = ArtifactPaths {
        defs: temp.path().join("bagl_gate_defs.h"),
        stubs: temp.path().join("bagl_gate_stubs.c"),
        dispatch: temp.path().join("bagl_gate_dispatch.c"),
    };
    let ledger = temp.path().join("bagl.ledger");
    Workspace {
        manifest,
        outputs,
        ledger,
        _temp: temp,
    }
}

fn generate(ws: &Workspace, hardened: bool) {
    let config = GeneratorConfig::new()
        .with_ledger_path(&ws.ledger)
        .with_hardened(hardened);
    gatec::generate_files(
        std::slice::from_ref(&ws.manifest),
        &ws.outputs,
        &config,
    )
    .unwrap();
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_generate_writes_all_four_files() {
    let ws = workspace(MANIFEST_V1);
    generate(&ws, true);

    let defs = read(&ws.outputs.defs);
    let stubs = read(&ws.outputs.stubs);
    let dispatch = read(&ws.outputs.dispatch);
    let ledger = read(&ws.ledger);

    // the library name came from the manifest's [library] table
    assert!(defs.contains("GATECALL_bagl_screen_update_ID_IN"));
    assert!(stubs.contains("int screen_draw_rect ( unsigned int color, unsigned char * bitmap )"));
    assert!(stubs.contains("#include \"bagl_gate_defs.h\""));
    assert!(dispatch.contains("void gate_main(unsigned int *frame)"));
    assert_eq!(ledger.lines().count(), 2);
}

#[test]
fn test_second_run_is_byte_identical() {
    let ws = workspace(MANIFEST_V1);
    generate(&ws, true);
    let first = (
        read(&ws.outputs.defs),
        read(&ws.outputs.stubs),
        read(&ws.outputs.dispatch),
        read(&ws.ledger),
    );

    generate(&ws, true);
    let second = (
        read(&ws.outputs.defs),
        read(&ws.outputs.stubs),
        read(&ws.outputs.dispatch),
        read(&ws.ledger),
    );

    assert_eq!(first, second);
}

#[test]
fn test_adding_a_call_keeps_existing_identifiers() {
    let ws = workspace(MANIFEST_V1);
    generate(&ws, true);
    let defs_before = read(&ws.outputs.defs);
    let ledger_before = read(&ws.ledger);

    fs::write(&ws.manifest, MANIFEST_V2).unwrap();
    generate(&ws, true);
    let defs_after = read(&ws.outputs.defs);
    let ledger_after = read(&ws.ledger);

    // every line that existed before still exists, verbatim
    for line in defs_before.lines().filter(|l| l.starts_with("#define GATECALL_")) {
        assert!(defs_after.contains(line), "lost constant: {}", line);
    }
    assert!(ledger_after.starts_with(&ledger_before));
    assert_eq!(ledger_after.lines().count(), 3);
    assert!(defs_after.contains("GATECALL_bagl_seph_send_ID_IN"));
}

#[test]
fn test_removing_a_call_leaves_the_ledger_intact() {
    let ws = workspace(MANIFEST_V2);
    generate(&ws, true);
    let ledger_before = read(&ws.ledger);

    fs::write(&ws.manifest, MANIFEST_V1).unwrap();
    generate(&ws, true);
    let ledger_after = read(&ws.ledger);

    // no compaction: the removed call's entry survives
    assert_eq!(ledger_before, ledger_after);
    assert!(!read(&ws.outputs.defs).contains("seph_send"));
}

#[test]
fn test_missing_library_name_aborts() {
    let temp = tempfile::tempdir().unwrap();
    let manifest = temp.path().join("anon.toml");
    fs::write(&manifest, "[[function]]\nname = \"f\"\n").unwrap();
    let outputs = ArtifactPaths {
        defs: temp.path().join("defs.h"),
        stubs: temp.path().join("stubs.c"),
        dispatch: temp.path().join("dispatch.c"),
    };

    let result = gatec::generate_files(
        std::slice::from_ref(&manifest),
        &outputs,
        &GeneratorConfig::new(),
    );
    assert!(matches!(result, Err(gatec::Error::MissingLibraryName)));
    // nothing was written
    assert!(!outputs.defs.exists());
}

#[test]
fn test_corrupt_ledger_aborts_before_writing() {
    let ws = workspace(MANIFEST_V1);
    fs::write(&ws.ledger, "garbage\n").unwrap();

    let config = GeneratorConfig::new()
        .with_ledger_path(&ws.ledger)
        .with_hardened(true);
    let result = gatec::generate_files(std::slice::from_ref(&ws.manifest), &ws.outputs, &config);

    assert!(matches!(
        result,
        Err(gatec::Error::LedgerCorrupt { line_no: 1, .. })
    ));
    assert!(!ws.outputs.defs.exists());
    // the corrupt ledger was not clobbered
    assert_eq!(read(&ws.ledger), "garbage\n");
}

#[test]
fn test_hardened_flag_controls_the_integrity_check() {
    let ws = workspace(MANIFEST_V1);
    generate(&ws, false);
    assert!(!read(&ws.outputs.stubs).contains("gate_fault_security"));

    generate(&ws, true);
    let stubs = read(&ws.outputs.stubs);
    assert!(stubs.contains("if (frame[1] != GATECALL_bagl_screen_update_ID_OUT) {"));
    assert!(stubs.contains("gate_fault_security();"));
}
