mod common;

use common::{console, lab_plane, Attach, Call};
use pvlan_migrate::core::port_group::{
    create_or_reuse_dummy, destroy_port_group, DestroyOutcome, DummySelection,
};
use pvlan_migrate::core::pvlan::{
    parse_vlan_input, provision_pvlan, vlan_or_default, PvlanPlan, VlanDefaults,
};
use pvlan_migrate::domain::model::{PortGroupSpec, PvlanMapEntry, VlanSpec};

#[tokio::test]
async fn test_pvlan_provisioning_from_vlan_100_with_blank_prompts() {
    let plane = lab_plane();
    let mut console = console(&[]);

    let defaults = VlanDefaults::from_original(Some(100));
    let promiscuous = vlan_or_default(&parse_vlan_input(""), defaults.promiscuous).unwrap();
    let isolated = vlan_or_default(&parse_vlan_input(""), defaults.isolated).unwrap();
    let plan = PvlanPlan::new("web", promiscuous, isolated).unwrap();

    let provisioned = provision_pvlan(&plane, &mut console, "dvs01", &plan)
        .await
        .unwrap();
    assert!(provisioned);

    assert_eq!(
        plane.mutations(),
        vec![
            Call::AddPvlanEntry {
                switch: "dvs01".into(),
                config_version: "1".into(),
                entry: PvlanMapEntry::promiscuous(100),
            },
            // 第二筆使用重新讀取後的 config version
            Call::AddPvlanEntry {
                switch: "dvs01".into(),
                config_version: "2".into(),
                entry: PvlanMapEntry::isolated(100, 101),
            },
            Call::AddPortGroups {
                switch: "dvs01".into(),
                specs: vec![
                    PortGroupSpec::with_pvlan("web_promiscuous", 100),
                    PortGroupSpec::with_pvlan("web_isolated", 101),
                ],
            },
        ]
    );
    assert_eq!(plane.port_group_vlan("web_isolated"), Some(VlanSpec::Pvlan(101)));

    let transcript = console.terminal().transcript();
    assert!(transcript.contains("Created web_promiscuous"));
    assert!(transcript.contains("Created web_isolated"));
}

#[tokio::test]
async fn test_pvlan_provisioning_on_unknown_switch_changes_nothing() {
    let plane = lab_plane();
    let mut console = console(&[]);
    let plan = PvlanPlan::new("web", 100, 101).unwrap();

    let provisioned = provision_pvlan(&plane, &mut console, "dvs99", &plan)
        .await
        .unwrap();

    assert!(!provisioned);
    assert!(plane.mutations().is_empty());
}

#[tokio::test]
async fn test_destroying_missing_port_group_counts_as_success() {
    let plane = lab_plane();
    let mut console = console(&[]);

    let outcome = destroy_port_group(&plane, &mut console, "dvs01", "gone")
        .await
        .unwrap();

    assert_eq!(outcome, DestroyOutcome::AlreadyAbsent);
    assert!(outcome.is_success());
    assert!(plane.mutations().is_empty());
    assert!(console
        .terminal()
        .transcript()
        .contains("Port group gone successfully removed from VDS dvs01"));
}

#[tokio::test]
async fn test_destroy_removes_existing_port_group() {
    let plane = lab_plane();
    let mut console = console(&[]);

    let outcome = destroy_port_group(&plane, &mut console, "dvs01", "web")
        .await
        .unwrap();

    assert_eq!(outcome, DestroyOutcome::Destroyed);
    assert_eq!(
        plane.mutations(),
        vec![Call::Destroy {
            port_group: "web".into()
        }]
    );
    assert_eq!(plane.port_group_names(), vec!["parking".to_string()]);
}

#[tokio::test]
async fn test_destroy_on_unknown_switch_is_not_a_success() {
    let plane = lab_plane();
    let mut console = console(&[]);

    let outcome = destroy_port_group(&plane, &mut console, "dvs99", "web")
        .await
        .unwrap();

    assert_eq!(outcome, DestroyOutcome::SwitchNotFound);
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_dummy_reuses_listed_port_group() {
    let plane = lab_plane();
    let switch = plane.switch("dvs01");
    let mut console = console(&["2"]);

    let dummy = create_or_reuse_dummy(&plane, &mut console, &switch)
        .await
        .unwrap();

    assert_eq!(dummy, Some(DummySelection::Existing("parking".into())));
    assert!(plane.mutations().is_empty());
}

#[tokio::test]
async fn test_dummy_created_with_early_binding_vlan() {
    let plane = lab_plane().with_vm("app01", &[Attach::PortGroup("web")]);
    let switch = plane.switch("dvs01");
    let mut console = console(&["new", "quarantine", "998"]);

    let dummy = create_or_reuse_dummy(&plane, &mut console, &switch)
        .await
        .unwrap();

    assert_eq!(
        dummy,
        Some(DummySelection::Created {
            name: "quarantine".into(),
            vlan_id: 998
        })
    );
    assert_eq!(
        plane.mutations(),
        vec![Call::AddPortGroups {
            switch: "dvs01".into(),
            specs: vec![PortGroupSpec::with_vlan("quarantine", 998)],
        }]
    );
    assert!(console
        .terminal()
        .transcript()
        .contains("Port group quarantine with VLAN ID 998 created."));
}

#[tokio::test]
async fn test_dummy_with_invalid_vlan_is_rejected() {
    let plane = lab_plane();
    let switch = plane.switch("dvs01");
    let mut console = console(&["new", "quarantine", "vlan-ten"]);

    let dummy = create_or_reuse_dummy(&plane, &mut console, &switch)
        .await
        .unwrap();

    assert!(dummy.is_none());
    assert!(plane.mutations().is_empty());
}

#[tokio::test]
async fn test_dummy_out_of_range_selection_is_rejected() {
    let plane = lab_plane();
    let switch = plane.switch("dvs01");
    let mut console = console(&["7"]);

    let dummy = create_or_reuse_dummy(&plane, &mut console, &switch)
        .await
        .unwrap();

    assert!(dummy.is_none());
}

#[tokio::test]
async fn test_dry_run_journals_provisioning_instead_of_applying_it() {
    let plane = lab_plane();
    let dry_run = pvlan_migrate::DryRun::new(plane.clone());
    let mut console = console(&[]);
    let plan = PvlanPlan::new("web", 100, 101).unwrap();

    let provisioned = provision_pvlan(&dry_run, &mut console, "dvs01", &plan)
        .await
        .unwrap();

    assert!(provisioned);
    assert!(plane.mutations().is_empty());
    assert_eq!(
        dry_run.planned(),
        vec![
            "add promiscuous PVLAN entry 100/100 to dvs01".to_string(),
            "add isolated PVLAN entry 100/101 to dvs01".to_string(),
            "create port group web_promiscuous (PVLAN 100) on dvs01".to_string(),
            "create port group web_isolated (PVLAN 101) on dvs01".to_string(),
        ]
    );
}
