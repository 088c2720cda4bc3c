use std::process::Command;

fn battle_city() -> Command {
    Command::new(env!("CARGO_BIN_EXE_battle-city"))
}

#[test]
fn demo_match_prints_a_summary() {
    let output = battle_city()
        .args(["--ticks", "120", "--seed", "3", "--log", "warn"])
        .output()
        .expect("failed to run the battle-city binary");

    assert!(output.status.success(), "battle-city exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ticks simulated:     120"), "{stdout}");
    assert!(stdout.contains("enemies spawned:"), "{stdout}");
}

#[test]
fn unreadable_configuration_fails_with_context() {
    let output = battle_city()
        .args(["--config", "/nonexistent/match.json", "--ticks", "1"])
        .output()
        .expect("failed to run the battle-city binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read match configuration"), "{stderr}");
}

#[test]
fn invalid_log_filters_are_rejected() {
    let output = battle_city()
        .args(["--ticks", "1", "--log", "battle_city=loud"])
        .output()
        .expect("failed to run the battle-city binary");

    assert!(!output.status.success());
}
