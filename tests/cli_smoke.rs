use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn tb_help_works() {
    Command::cargo_bin("tb")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("four-column to-do board"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "add",
        "list",
        "click",
        "status",
        "delete",
        "move",
        "restore",
        "archive",
        "reset",
        "stats",
        "reconcile",
        "board",
    ];

    for cmd in subcommands {
        Command::cargo_bin("tb")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn version_is_reported() {
    Command::cargo_bin("tb")
        .expect("binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
