// tests/common/mod.rs

//! Shared test utilities: config and template trees written into a TempDir.

#![allow(dead_code)]

use gencontrol::config::ConfigStore;
use gencontrol::control::Templates;
use gencontrol::generator::kernel::{self, KernelSettings};
use gencontrol::generator::{Generator, LevelState, Output};
use gencontrol::version::LinuxVersion;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const VERSION: &str = "6.12.9-1";

/// A throwaway `debian/` tree
///
/// Keep the value alive for as long as the paths are used.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path("config")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.path("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// Write `text` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, text: &str) -> &Self {
        write_file(&self.path(relative), text);
        self
    }

    /// Write a file below the primary config dir
    pub fn config(&self, relative: &str, text: &str) -> &Self {
        write_file(&self.config_dir().join(relative), text);
        self
    }

    /// Write `<name>.in` into the template dir
    pub fn template(&self, name: &str, text: &str) -> &Self {
        write_file(&self.template_dir().join(format!("{name}.in")), text);
        self
    }

    pub fn load(&self) -> ConfigStore {
        ConfigStore::load(&[self.config_dir()]).unwrap()
    }

    pub fn templates(&self) -> Templates {
        Templates::new(&[self.template_dir()])
    }

    /// Run the kernel generator over this tree
    pub fn generate(&self) -> gencontrol::Result<Output> {
        let config = ConfigStore::load(&[self.config_dir()])?;
        let templates = self.templates();
        let hooks = kernel::hooks(KernelSettings {
            version: LinuxVersion::parse(VERSION)?,
            installer_dir: None,
        });
        Generator::new(&config, &templates, hooks).run(LevelState::default())
    }
}

fn write_file(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

/// Minimal kernel tree: each arch has the implicit `none` featureset and the
/// given flavours; every flavour gets a `plain` image and a headers package.
pub fn kernel_fixture(arches: &[&str], flavours: &[&str]) -> Fixture {
    let fixture = Fixture::new();

    fixture.config(
        "defines",
        &format!(
            "\
[base]
arches: {}
compiler: gcc-14

[abi]
abiname: 1

[image]
type: plain
initramfs-generators: initramfs-tools

[relations]
gcc-14: gcc-14
initramfs-tools: initramfs-tools (>= 0.120)

[commands-image-initramfs-generators]
initramfs-tools: mkinitramfs
",
            arches.join(" ")
        ),
    );
    fixture.config("config", "CONFIG_MODULES=y\n");

    for arch in arches {
        let mut text = format!("[base]\nkernel-arch: {arch}\nflavours: {}\n", flavours.join(" "));
        for flavour in flavours {
            text.push_str(&format!(
                "\n[{flavour}_description]\nhardware: {flavour} {arch} machines\n"
            ));
        }
        fixture.config(&format!("{arch}/defines"), &text);
        fixture.config(&format!("{arch}/config"), "CONFIG_SMP=y\n");
    }

    fixture
        .template(
            "control.source",
            "\
Source: linux
Section: kernel
Priority: optional
Maintainer: Debian Kernel Team <debian-kernel@lists.debian.org>
Build-Depends: debhelper-compat (= 13)
",
        )
        .template(
            "control.main",
            "\
Package: linux-doc-@version@
Architecture: all
Section: doc
Description: Linux kernel specific documentation for version @version@
 This package provides the various README files.
",
        )
        .template(
            "control.headers.arch",
            "\
Package: linux-headers-all-@arch@
Architecture: @arch@
Description: All header files for Linux @version@ (meta-package)
",
        )
        .template(
            "control.headers.featureset",
            "\
Package: linux-headers-common@localversion_headers@
Architecture: all
Description: Common header files for Linux @version@@abiname@
",
        )
        .template(
            "control.headers",
            "\
Package: linux-headers@localversion@
Depends: linux-headers-common@localversion_headers@ (= ${binary:Version})
Description: Header files for Linux @version@@abiname@@localversion@
",
        )
        .template(
            "control.image.type-plain",
            "\
Package: linux-image@localversion@
Depends: kmod
X-Template-Note: dropped on output
Description: Linux @upstreamversion@ for @class@
 The Linux kernel @upstreamversion@ and modules for use on @longclass@.
",
        );

    fixture
}
