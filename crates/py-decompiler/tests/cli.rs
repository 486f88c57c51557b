// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use std::{fs, path::Path, process::Command};

fn decompiler() -> Command {
    Command::new(env!("CARGO_BIN_EXE_py-decompiler"))
}

const IF_AND: &str = "
version 3.8
code @0 <module>
     0 LOAD_NAME         a
     2 POP_JUMP_IF_FALSE 14
     4 LOAD_NAME         b
     6 POP_JUMP_IF_FALSE 14
     8 LOAD_NAME         c
    10 CALL_FUNCTION     0
    12 POP_TOP
  14_0 COME_FROM         2
  14_1 COME_FROM         6
    14 LOAD_CONST        None
    16 RETURN_VALUE
";

const TRUNCATED: &str = "
version 3.8
code @0 <module>
     0 LOAD_NAME x
     2 POP_TOP
     4 LOAD_NAME y
";

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn batch_writes_one_file_per_outcome() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(inputs.path(), "good.pyasm", IF_AND);
    write(inputs.path(), "bad.pyasm", TRUNCATED);
    write(inputs.path(), "notes.txt", "not a listing");

    let run = decompiler()
        .arg(inputs.path())
        .args(["--verify", "-p", "2", "-o"])
        .arg(output.path())
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert_eq!(
        String::from_utf8_lossy(&run.stdout).trim(),
        "# decompiled 2 files: 1 okay, 1 failed, 0 verify failed"
    );

    let good = fs::read_to_string(output.path().join("good_dis.py")).unwrap();
    assert!(good.ends_with("if a and b:\n    c()\n"), "{}", good);
    let bad = fs::read_to_string(output.path().join("bad_dis_failed.py")).unwrap();
    assert!(bad.contains("no parse"), "{}", bad);
}

#[test]
fn subdirectories_need_recurse() {
    let inputs = tempfile::tempdir().unwrap();
    fs::create_dir(inputs.path().join("nested")).unwrap();
    write(&inputs.path().join("nested"), "good.pyasm", IF_AND);

    let flat = decompiler().arg(inputs.path()).output().unwrap();
    assert!(!flat.status.success());

    let deep = decompiler().arg(inputs.path()).arg("-r").output().unwrap();
    assert!(deep.status.success(), "{}", String::from_utf8_lossy(&deep.stderr));
    assert!(inputs.path().join("nested/good_dis.py").exists());
}

#[test]
fn config_file_supplies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "good.pyasm", IF_AND);
    write(dir.path(), "decompiler.toml", "tree = true\ntarget-version = \"3.7\"\n");

    let run = decompiler()
        .arg(dir.path().join("good.pyasm"))
        .arg("--config")
        .arg(dir.path().join("decompiler.toml"))
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    let text = fs::read_to_string(dir.path().join("good_dis.py")).unwrap();
    assert!(text.starts_with("# listing version 3.8, decompiled with 3.7 tables\n"), "{}", text);
    assert!(text.contains("# tree for code @0"), "{}", text);
}

#[test]
fn bad_config_exits_with_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "good.pyasm", IF_AND);
    write(dir.path(), "decompiler.toml", "threads = 4\n");

    let run = decompiler()
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("decompiler.toml"))
        .output()
        .unwrap();
    assert_eq!(run.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&run.stdout).contains("parsing config"));
}
