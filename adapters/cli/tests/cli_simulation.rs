use std::{
    io::Write,
    process::{Command, Stdio},
};

#[test]
fn simulate_runs_a_seeded_session() {
    let output = Command::new(env!("CARGO_BIN_EXE_virus-smash"))
        .args(["--seed", "7", "simulate", "--max-secs", "5", "--blunder-rate", "0"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch the virus-smash binary");

    assert!(output.status.success(), "simulate should exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(virus_smash_core::WELCOME_BANNER));
    assert!(stdout.contains("stopped after 5s"));
}

#[test]
fn out_of_range_accuracy_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_virus-smash"))
        .args(["simulate", "--accuracy", "1.5"])
        .output()
        .expect("failed to launch the virus-smash binary");

    assert!(!output.status.success());
}

#[test]
fn play_rejects_waits_beyond_the_limit() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_virus-smash"))
        .args(["--seed", "3", "play"])
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to launch the virus-smash binary");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"start\nwait 18446744073709551615\nwait 500\nquit\n")
        .expect("failed to write commands");
    let output = child.wait_with_output().expect("binary exits");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("waits are capped at 300000 ms"));
    assert!(stdout.contains("hp 200"));
}
