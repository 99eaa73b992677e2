// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: preview without changing anything
fn dry_run_arg() -> Arg {
    Arg::new("dry_run")
        .long("dry-run")
        .action(ArgAction::SetTrue)
        .help("Show what would change without changing anything")
}

fn build_cli() -> Command {
    Command::new("keel")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Keel Contributors")
        .about("Reconcile declared package requirements with a workspace")
        .subcommand_required(true)
        .arg(
            Arg::new("workspace")
                .short('w')
                .long("workspace")
                .global(true)
                .default_value(".")
                .help("Workspace directory"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show debug output (RUST_LOG takes precedence)"),
        )
        .subcommand(
            Command::new("init")
                .about("Create keel.toml and the state directory")
                .arg(Arg::new("index").long("index").help("Availability index file"))
                .arg(Arg::new("mirror").long("mirror").help("Artifact mirror root")),
        )
        .subcommand(
            Command::new("add")
                .about("Require a package and sync")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(Arg::new("constraint").help("Version constraint; any version if omitted"))
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Stop requiring a package and sync")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("sync")
                .about("Resolve requirements and apply the result")
                .arg(dry_run_arg()),
        )
        .subcommand(
            Command::new("update")
                .about("Refresh the availability index, then sync")
                .arg(Arg::new("from").long("from").help("Index file to refresh from"))
                .arg(dry_run_arg()),
        )
        .subcommand(Command::new("check").about("Check that every indexed version is installable"))
        .subcommand(Command::new("status").about("Show materialized packages and whether they may move"))
        .subcommand(
            Command::new("hold")
                .about("Keep a materialized package at its current version")
                .arg(Arg::new("package").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("release")
                .about("Let the resolver move a held package again")
                .arg(Arg::new("package").required(true).help("Package name")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("keel.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
