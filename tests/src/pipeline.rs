//! End-to-end pipeline: canned HMC documents through extraction into the
//! diff, the way a real run flows once the HTTP layer has done its job.

use lpardiff_common::config::Config;
use lpardiff_core::diff::{self, MISSING};
use lpardiff_core::fetch::{GroupToggles, ProfileFetcher};
use lpardiff_core::record::{AttributeGroup, ProfileRecord};

const UOM_NS: &str = "http://www.ibm.com/xmlns/systems/power/firmware/uom/mc/2012_10/";

fn search_doc(partition: &str, compat_mode: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <content>
      <LogicalPartition xmlns="{UOM_NS}" schemaVersion="V1_0">
        <PartitionName>{partition}</PartitionName>
        <PartitionType>AIX/Linux</PartitionType>
        <CurrentProcessorCompatibilityMode>{compat_mode}</CurrentProcessorCompatibilityMode>
        <AssociatedPartitionProfile href="https://hmc01:12443/rest/api/uom/LogicalPartition/{partition}/LogicalPartitionProfile/1" rel="related"/>
      </LogicalPartition>
    </content>
  </entry>
</feed>"#
    )
}

fn profile_doc(desired_memory: &str, network_adapters: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <content>
    <LogicalPartitionProfile xmlns="{UOM_NS}" schemaVersion="V1_0">
      <ProfileName>default_profile</ProfileName>
      <SharingMode>uncapped</SharingMode>
      <DesiredProcessingUnits>0.5</DesiredProcessingUnits>
      <DesiredMemory>{desired_memory}</DesiredMemory>
      <MinimumMemory>4096</MinimumMemory>
      {network_adapters}
    </LogicalPartitionProfile>
  </content>
</entry>"#
    )
}

fn adapter(slot: &str, vlan: &str) -> String {
    format!(
        "<ProfileClientNetworkAdapter>\
           <VirtualSlotNumber>{slot}</VirtualSlotNumber>\
           <PortVLANID>{vlan}</PortVLANID>\
           <VirtualSwitchName>ETHERNET0</VirtualSwitchName>\
         </ProfileClientNetworkAdapter>"
    )
}

fn record_for(
    fetcher: &ProfileFetcher,
    search_xml: &str,
    profile_xml: &str,
) -> ProfileRecord {
    let mut record = ProfileRecord::new();
    let href = fetcher
        .apply_search_document(search_xml, &mut record)
        .expect("search document parses");
    assert!(href.is_some(), "canned search document carries a profile link");
    fetcher
        .apply_profile_document(profile_xml, &mut record)
        .expect("profile document parses");
    record
}

#[test]
fn two_partitions_flow_into_an_ordered_diff() {
    let fetcher = ProfileFetcher::new(GroupToggles::default());

    let prod = record_for(
        &fetcher,
        &search_doc("prod01", "POWER9"),
        &profile_doc("8192", &[adapter("2", "100"), adapter("3", "200")].concat()),
    );
    let dr = record_for(
        &fetcher,
        &search_doc("dr01", "POWER9"),
        &profile_doc("16384", &adapter("2", "100")),
    );

    let result = diff::compare(&prod, &dr, false);

    // Groups arrive in fixed display order.
    let groups: Vec<AttributeGroup> = result.rows.iter().map(|row| row.group).collect();
    let mut sorted = groups.clone();
    sorted.sort();
    assert_eq!(groups, sorted);

    // Identical values match.
    let compat = result
        .rows
        .iter()
        .find(|row| row.field == "CurrentProcessorCompatibilityMode")
        .unwrap();
    assert!(compat.matched);

    // The memory drift is flagged.
    let memory = result
        .rows
        .iter()
        .find(|row| row.field == "DesiredMemory")
        .unwrap();
    assert!(!memory.matched);
    assert_eq!(memory.left, "8192");
    assert_eq!(memory.right, "16384");

    // The adapter present only on prod renders the missing sentinel.
    let second_vlan = result
        .rows
        .iter()
        .filter(|row| row.group == AttributeGroup::Network && row.field == "PortVLANID")
        .nth(1)
        .unwrap();
    assert!(!second_vlan.matched);
    assert_eq!(second_vlan.index, Some(1));
    assert_eq!(second_vlan.left, "200");
    assert_eq!(second_vlan.right, MISSING);
}

#[test]
fn diffonly_run_is_the_mismatched_subset() {
    let fetcher = ProfileFetcher::new(GroupToggles::default());
    let prod = record_for(
        &fetcher,
        &search_doc("prod01", "POWER9"),
        &profile_doc("8192", &adapter("2", "100")),
    );
    let dr = record_for(
        &fetcher,
        &search_doc("dr01", "POWER8"),
        &profile_doc("8192", &adapter("2", "100")),
    );

    let full = diff::compare(&prod, &dr, false);
    let diff_only = diff::compare(&prod, &dr, true);

    assert!(diff_only.rows.len() < full.rows.len());
    assert!(diff_only.rows.iter().all(|row| !row.matched));
    for row in &diff_only.rows {
        assert!(full.rows.contains(row));
    }
    // Only the compatibility mode differs between the two.
    assert_eq!(diff_only.rows.len(), 1);
    assert_eq!(diff_only.rows[0].field, "CurrentProcessorCompatibilityMode");
}

#[test]
fn disabled_groups_stay_out_of_the_comparison_entirely() {
    let toggles = GroupToggles {
        networking: false,
        ..GroupToggles::default()
    };
    let fetcher = ProfileFetcher::new(toggles);

    let prod = record_for(
        &fetcher,
        &search_doc("prod01", "POWER9"),
        &profile_doc("8192", &adapter("2", "100")),
    );
    let dr = record_for(
        &fetcher,
        &search_doc("dr01", "POWER9"),
        &profile_doc("8192", &adapter("9", "999")),
    );

    let result = diff::compare(&prod, &dr, false);
    assert!(result
        .rows
        .iter()
        .all(|row| row.group != AttributeGroup::Network));
    assert!(result.is_clean());
}

#[test]
fn configuration_toggles_reach_the_fetcher_shape() {
    // A config that switches networking off must never produce Network
    // keys, mirroring how the CLI maps the file onto GroupToggles.
    let dir = std::env::temp_dir().join("lpardiff-config-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.yaml");
    std::fs::write(
        &path,
        "hmcs: [hmc01]\nssl_verify: false\ncompare_networking: false\n",
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert!(!config.compare_networking);
    assert!(!config.ssl_verify);

    let toggles = GroupToggles {
        general: config.compare_general,
        processors: config.compare_processors,
        memory: config.compare_memory,
        networking: config.compare_networking,
        virtual_fc: config.compare_virtual_fc,
        virtual_scsi: config.compare_virtual_scsi,
    };
    let fetcher = ProfileFetcher::new(toggles);
    let record = record_for(
        &fetcher,
        &search_doc("prod01", "POWER9"),
        &profile_doc("8192", &adapter("2", "100")),
    );
    assert!(!record.contains_group(AttributeGroup::Network));
}
