use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_over_cancel_rejected() {
    let file = common::commands_file(&[
        "pay,p1,1234567890123456,1225,777,0,1000,",
        "cancel,p1,,,,,1200,",
        "find,p1,,,,,,",
    ]);

    let mut cmd = Command::new(cargo_bin!("payledger"));
    cmd.arg(file.path());

    // Rejected, and the payment is untouched.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("p1,,,,,,,,,illegal_state"))
        .stdout(predicate::str::contains(",PAY,1000,91,1000,91,,0,ok"));
}

#[test]
fn test_forbidden_terminal_state_rejected() {
    let file = common::commands_file(&[
        "pay,p1,1234567890123456,1225,777,0,1000,",
        // Full amount with zero vat would strand 91 of vat.
        "cancel,p1,,,,,1000,0",
        "find,p1,,,,,,",
    ]);

    let mut cmd = Command::new(cargo_bin!("payledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("p1,,,,,,,,,illegal_state"))
        .stdout(predicate::str::contains(",PAY,1000,91,1000,91,,0,ok"));
}

#[test]
fn test_unknown_reference_is_not_found() {
    let file = common::commands_file(&["find,99999999999999999999,,,,,,"]);

    let mut cmd = Command::new(cargo_bin!("payledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "99999999999999999999,,,,,,,,,not_found",
        ));
}

#[test]
fn test_unlabelled_short_reference_is_validation() {
    let file = common::commands_file(&["find,nope,,,,,,"]);

    let mut cmd = Command::new(cargo_bin!("payledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("nope,,,,,,,,,validation"));
}
