// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: configuration directories
fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("DIR")
        .action(ArgAction::Append)
        .default_value("debian/config")
        .help("Configuration directory; repeat to overlay, the first match wins")
}

fn build_cli() -> Command {
    Command::new("gencontrol")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gencontrol Contributors")
        .about("Generate Debian kernel packaging from arch/featureset/flavour configuration")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate control and rules files")
                .arg(config_arg())
                .arg(
                    Arg::new("templates")
                        .short('t')
                        .long("templates")
                        .value_name("DIR")
                        .action(ArgAction::Append)
                        .default_value("debian/templates")
                        .help("Template directory; repeat to overlay, the first match wins"),
                )
                .arg(
                    Arg::new("changelog")
                        .long("changelog")
                        .value_name("FILE")
                        .default_value("debian/changelog")
                        .help("Changelog providing the package version"),
                )
                .arg(
                    Arg::new("version")
                        .long("version")
                        .help("Use this version instead of reading the changelog"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .default_value("debian")
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("installer_dir")
                        .long("installer-dir")
                        .value_name("DIR")
                        .help("Run kernel-wedge gen-control in this directory for installer packages"),
                )
                .arg(
                    Arg::new("no_dump")
                        .long("no-dump")
                        .action(ArgAction::SetTrue)
                        .help("Skip writing the configuration dump"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show the resolved configuration of a category at one scope")
                .arg(Arg::new("category").required(true).help("Config category, e.g. base, image, description"))
                .arg(Arg::new("arch").long("arch"))
                .arg(Arg::new("featureset").long("featureset"))
                .arg(Arg::new("flavour").long("flavour"))
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("tree")
                .about("Show the axis tree, marking disabled nodes")
                .arg(config_arg()),
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

    let man_path = man_dir.join("gencontrol.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
