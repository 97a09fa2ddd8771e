// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn spec(dir: &TempDir, argv: &[&str]) -> ContainerSpec {
    ContainerSpec {
        name: "cc-test".to_string(),
        image: "crowd-test:latest".to_string(),
        argv: argv.iter().map(|s| s.to_string()).collect(),
        scratch_dir: dir.path().to_path_buf(),
    }
}

async fn run(runtime: &FakeRuntime, spec: &ContainerSpec) -> ContainerExit {
    runtime.spawn(spec).await.unwrap();
    runtime.wait(&spec.name).await.unwrap()
}

#[tokio::test]
async fn hashcat_finds_the_cracked_word() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("wordlist.txt"), "password123\nsecret\nhashcat\nadmin\n")
        .unwrap();

    // md5("hashcat")
    let spec = spec(
        &dir,
        &[
            "hashcat",
            "-m",
            "0",
            "-a",
            "0",
            "--potfile-disable",
            "--outfile",
            "result.txt",
            "8743b52063cd84097a65d1633f5c74f5",
            "wordlist.txt",
        ],
    );

    let exit = run(&FakeRuntime::new(), &spec).await;
    assert_eq!(exit.code, 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("result.txt")).unwrap(), "hashcat\n");
}

#[tokio::test]
async fn hashcat_exhausts_on_no_match() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("wordlist.txt"), "alpha\nbravo\n").unwrap();

    let spec = spec(
        &dir,
        &[
            "hashcat",
            "-m",
            "0",
            "-a",
            "0",
            "--potfile-disable",
            "--outfile",
            "result.txt",
            "8743b52063cd84097a65d1633f5c74f5",
            "wordlist.txt",
        ],
    );

    let exit = run(&FakeRuntime::new(), &spec).await;
    assert_eq!(exit.code, 1);
    assert!(exit.stderr_tail.contains("exhausted"));
    assert!(!dir.path().join("result.txt").exists());
}

#[tokio::test]
async fn sort_merges_inputs_preserving_duplicates() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "bravo\ndelta\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "alpha\nbravo\n").unwrap();

    let spec = spec(&dir, &["sort", "-m", "-o", "final.txt", "a.txt", "b.txt"]);
    let exit = run(&FakeRuntime::new(), &spec).await;

    assert_eq!(exit.code, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("final.txt")).unwrap(),
        "alpha\nbravo\nbravo\ndelta\n"
    );
}

#[tokio::test]
async fn sort_of_empty_inputs_writes_an_empty_output() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("empty.txt"), "").unwrap();

    let spec = spec(&dir, &["sort", "-o", "sorted.txt", "empty.txt"]);
    let exit = run(&FakeRuntime::new(), &spec).await;

    assert_eq!(exit.code, 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("sorted.txt")).unwrap(), "");
}

#[tokio::test]
async fn missing_input_file_fails() {
    let dir = TempDir::new().unwrap();
    let spec = spec(&dir, &["sort", "-o", "out.txt", "nope.txt"]);
    let exit = run(&FakeRuntime::new(), &spec).await;
    assert_eq!(exit.code, 2);
}

#[tokio::test]
async fn unknown_command_exits_127() {
    let dir = TempDir::new().unwrap();
    let spec = spec(&dir, &["frobnicate"]);
    let exit = run(&FakeRuntime::new(), &spec).await;
    assert_eq!(exit.code, 127);
}

#[tokio::test]
async fn injected_exit_code_skips_plugin_logic() {
    let dir = TempDir::new().unwrap();
    let spec = spec(&dir, &["sort", "-o", "out.txt"]);
    let exit = run(&FakeRuntime::with_behavior(FakeBehavior::Exit(9)), &spec).await;
    assert_eq!(exit.code, 9);
    assert!(!dir.path().join("out.txt").exists());
}

#[tokio::test]
async fn hanging_container_exits_when_killed() {
    let dir = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::with_behavior(FakeBehavior::Hang));
    let spec = spec(&dir, &["sort", "-o", "out.txt"]);

    runtime.spawn(&spec).await.unwrap();
    let waiter = {
        let runtime = Arc::clone(&runtime);
        let name = spec.name.clone();
        tokio::spawn(async move { runtime.wait(&name).await })
    };

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(runtime.running(), vec!["cc-test".to_string()]);
    runtime.kill(&spec.name).await.unwrap();

    let exit = waiter.await.unwrap().unwrap();
    assert_eq!(exit.code, 137);
    assert!(runtime.running().is_empty());
}

#[tokio::test]
async fn wait_on_unknown_container_fails() {
    let runtime = FakeRuntime::new();
    assert!(matches!(runtime.wait("ghost").await, Err(RuntimeError::NotFound(_))));
}
