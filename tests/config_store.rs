// tests/config_store.rs

//! Integration tests for loading the fragment tree into the config store.

mod common;

use common::Fixture;
use gencontrol::config::{AxisPath, ConfigStore, ConfigValue, Entry, BASE};
use gencontrol::Error;
use proptest::prelude::*;

fn list(items: &[&str]) -> ConfigValue {
    ConfigValue::List(items.iter().map(|s| s.to_string()).collect())
}

fn tree() -> Fixture {
    let fixture = Fixture::new();
    fixture
        .config(
            "defines",
            "\
# global defaults
[base]
arches: amd64, arm64
compiler: gcc-14

[image]
type: plain
initramfs: true

[amd64_image]
type: amd64-default
",
        )
        .config(
            "amd64/defines",
            "\
[base]
kernel-arch: x86
featuresets: rt
flavours: generic
  cloud

[rt_image]
type: rt-default

[cloud_image]
initramfs: 0

[rt_cloud_description]
hardware: realtime cloud
",
        )
        .config(
            "amd64/rt/defines",
            "\
[base]
flavours: generic

[generic_description]
hardware = realtime PCs
",
        )
        .config("arm64/defines", "[base]\nkernel-arch: arm64\nflavours: generic\n");
    fixture
}

#[test]
fn test_load_axis_tree() {
    let config = tree().load();

    assert_eq!(config.arches().unwrap(), vec!["amd64", "arm64"]);
    assert_eq!(config.featuresets("amd64"), vec!["none", "rt"]);
    assert_eq!(config.flavours("amd64", "none"), vec!["generic", "cloud"]);
    assert_eq!(config.flavours("amd64", "rt"), vec!["generic"]);
    assert_eq!(config.featuresets("arm64"), vec!["none"]);
    assert!(config.get(BASE, &AxisPath::flavour("arm64", "none", "generic")).is_some());
}

#[test]
fn test_qualifier_mapping() {
    let config = tree().load();

    assert_eq!(
        config.get("image", &AxisPath::arch("amd64")).unwrap().get_str("type"),
        Some("amd64-default")
    );
    assert_eq!(
        config
            .get("image", &AxisPath::featureset("amd64", "rt"))
            .unwrap()
            .get_str("type"),
        Some("rt-default")
    );
    assert_eq!(
        config
            .get("image", &AxisPath::from_parts(Some("amd64"), None, Some("cloud")))
            .unwrap()
            .get_bool("initramfs"),
        Some(false)
    );
    assert_eq!(
        config
            .get("description", &AxisPath::flavour("amd64", "rt", "cloud"))
            .unwrap()
            .get_str("hardware"),
        Some("realtime cloud")
    );
    assert_eq!(
        config
            .get("description", &AxisPath::flavour("amd64", "rt", "generic"))
            .unwrap()
            .get_str("hardware"),
        Some("realtime PCs")
    );
}

#[test]
fn test_resolved_view_overlays_levels() {
    let config = tree().load();

    let view = config.merge("image", &AxisPath::flavour("amd64", "none", "cloud"));
    assert_eq!(view.get_str("type"), Some("amd64-default"));
    assert_eq!(view.get_bool("initramfs"), Some(false));

    let view = config.merge("image", &AxisPath::flavour("amd64", "rt", "generic"));
    assert_eq!(view.get_str("type"), Some("rt-default"));
    assert_eq!(view.get_bool("initramfs"), Some(true));

    let base = config.merge(BASE, &AxisPath::flavour("arm64", "none", "generic"));
    assert_eq!(base.get_str("compiler"), Some("gcc-14"));
    assert_eq!(base.get_str("kernel-arch"), Some("arm64"));
}

#[test]
fn test_first_config_dir_wins() {
    let fixture = tree();
    fixture.write(
        "overlay/defines",
        "[base]\narches: arm64\n\n[image]\ntype: overlay\n",
    );
    fixture.write("overlay/config", "CONFIG_OVERLAY=y\n");
    fixture.config("config", "CONFIG_BASE=y\n");

    let config = ConfigStore::load(&[fixture.path("overlay"), fixture.config_dir()]).unwrap();
    assert_eq!(config.arches().unwrap(), vec!["arm64"]);
    let image = config.merge("image", &AxisPath::root());
    assert_eq!(image.get_str("type"), Some("overlay"));
    assert_eq!(image.get_bool("initramfs"), None);

    // arm64/defines only exists in the second dir
    assert_eq!(config.flavours("arm64", "none"), vec!["generic"]);
    assert_eq!(config.find_file("config"), Some(fixture.path("overlay/config")));
}

#[test]
fn test_disabled_arch_fragment_is_not_read() {
    let fixture = tree();
    fixture.config(
        "defines",
        "[base]\narches: amd64 arm64\n\n[arm64_base]\nenabled: false\n",
    );
    fixture.config("arm64/defines", "this is not a fragment\n");

    let config = fixture.load();
    assert!(!config.is_enabled(&AxisPath::arch("arm64")));
    assert!(!config.is_enabled(&AxisPath::flavour("arm64", "none", "generic")));
    assert!(config.is_enabled(&AxisPath::arch("amd64")));
    assert!(config.featuresets("arm64").is_empty());
}

#[test]
fn test_disabled_featureset_fragment_is_not_read() {
    let fixture = tree();
    fixture.config(
        "amd64/defines",
        "[base]\nfeaturesets: rt\n\n[rt_base]\navailable: false\n",
    );
    fixture.config("amd64/rt/defines", "[broken\n");

    let config = fixture.load();
    assert!(!config.is_enabled(&AxisPath::featureset("amd64", "rt")));
    assert!(config.flavours("amd64", "rt").is_empty());
}

#[test]
fn test_flavour_disabled_across_featuresets() {
    let fixture = tree();
    fixture.config(
        "amd64/defines",
        "\
[base]
kernel-arch: x86
featuresets: rt
flavours: generic cloud

[cloud_base]
enabled: false
",
    );
    fixture.config("amd64/rt/defines", "[base]\nflavours: generic cloud\n");

    let config = fixture.load();
    assert!(!config.is_enabled(&AxisPath::flavour("amd64", "none", "cloud")));
    assert!(!config.is_enabled(&AxisPath::flavour("amd64", "rt", "cloud")));
    assert!(config.is_enabled(&AxisPath::flavour("amd64", "rt", "generic")));
}

#[test]
fn test_top_level_featuresets_are_kept() {
    let fixture = tree();
    fixture.config(
        "defines",
        "[base]\narches: amd64 arm64\n\n[amd64_base]\nfeaturesets: cloud-rt\n",
    );

    let config = fixture.load();
    assert_eq!(config.featuresets("amd64"), vec!["none", "cloud-rt", "rt"]);
}

#[test]
fn test_missing_arches_is_fatal() {
    let fixture = Fixture::new();
    fixture.config("defines", "[image]\ntype: plain\n");
    assert!(matches!(
        ConfigStore::load(&[fixture.config_dir()]),
        Err(Error::MissingAxis(_))
    ));
}

#[test]
fn test_fragment_errors_carry_location() {
    let fixture = tree();
    fixture.config("amd64/rt/defines", "[base]\nflavours: generic\n\n[a_b_image]\ntype: x\n");
    match ConfigStore::load(&[fixture.config_dir()]) {
        Err(Error::FragmentParse { path, line, .. }) => {
            assert_eq!(path, std::path::Path::new("amd64/rt/defines"));
            assert_eq!(line, 4);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    fixture.config("amd64/rt/defines", "[base]\nenabled: maybe\n");
    assert!(matches!(
        ConfigStore::load(&[fixture.config_dir()]),
        Err(Error::Schema { .. })
    ));
}

#[test]
fn test_dump_round_trips_through_json() {
    let config = tree().load();
    let records = config.dump();
    let json = serde_json::to_string(&records).unwrap();
    let back: Vec<gencontrol::config::StoreRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, records);
}

/// Overlay levels of a flavour path, least specific first
fn levels() -> Vec<AxisPath> {
    ConfigStore::overlay_paths(&AxisPath::flavour("amd64", "rt", "generic"))
}

proptest! {
    #[test]
    fn test_merge_takes_most_specific_value(
        present in proptest::collection::vec(proptest::option::of("[a-z]{1,6}"), 5)
    ) {
        let mut config = ConfigStore::new();
        config.insert(BASE, AxisPath::root(), [("arches", list(&["amd64"]))].into_iter().collect());
        for (path, value) in levels().into_iter().zip(&present) {
            if let Some(value) = value {
                let entry: Entry = [("key", value.as_str())].into_iter().collect();
                config.insert("image", path, entry);
            }
        }

        let expected = present.iter().rev().flatten().next().cloned();
        let view = config.merge("image", &AxisPath::flavour("amd64", "rt", "generic"));
        prop_assert_eq!(view.get_str("key").map(str::to_string), expected);
    }
}
