use assert_cmd::Command;
use predicates::prelude::*;

fn bookshelf() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env_remove("PORT")
        .env_remove("BOOKSHELF_ENV")
        .env("BOOKSHELF_CONFIG_DIR", "/nonexistent/bookshelf-config");
    cmd
}

#[test]
fn help_lists_subcommands() {
    bookshelf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn config_prints_defaults() {
    bookshelf()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 3000"));
}

#[test]
fn config_honours_port_and_prefixed_variables() {
    bookshelf()
        .arg("config")
        .env("PORT", "4321")
        .env("BOOKSHELF_DATABASE__URL", "memory")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 4321"))
        .stdout(predicate::str::contains("\"url\": \"memory\""));
}

#[test]
fn config_never_prints_the_password() {
    bookshelf()
        .arg("config")
        .env("BOOKSHELF_DATABASE__PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn unknown_environment_fails() {
    bookshelf()
        .arg("config")
        .env("BOOKSHELF_ENV", "qa")
        .assert()
        .failure();
}

#[test]
fn migrate_with_in_memory_store_is_a_no_op() {
    bookshelf()
        .arg("migrate")
        .env("BOOKSHELF_DATABASE__URL", "memory")
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 0 migration(s)"));
}
