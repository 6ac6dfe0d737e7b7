//! # Profile Fetch Protocol
//!
//! Two-call protocol that turns a partition name into a
//! [`ProfileRecord`]: a search on the partition-search endpoint, then a
//! fetch of the associated default-profile document the search points at.
//!
//! Expected, data-dependent conditions (partition unknown, no default
//! profile, bad or absent response) are not errors — they come back as
//! [`LookupOutcome`] variants so the failover layer can try the next
//! management host.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::record::{
    AttributeGroup, AttributeKey, FieldValue, ProfileRecord, FIBRE_CHANNEL_ADAPTER_FIELDS,
    MEMORY_FIELDS, NETWORK_ADAPTER_FIELDS, PROCESSOR_FIELDS, PROFILE_GENERAL_FIELDS,
    SCSI_ADAPTER_FIELDS, SEARCH_GENERAL_FIELDS,
};
use crate::session::{api_base, Session, SessionError};

const UOM_NS: &str = "http://www.ibm.com/xmlns/systems/power/firmware/uom/mc/2012_10/";

const NETWORK_ADAPTER_ELEMENT: &str = "ProfileClientNetworkAdapter";
const FIBRE_CHANNEL_ADAPTER_ELEMENT: &str = "ProfileVirtualFibreChannelClientAdapter";
const SCSI_ADAPTER_ELEMENT: &str = "ProfileVirtualSCSIClientAdapter";
const PROFILE_LINK_ELEMENT: &str = "AssociatedPartitionProfile";

/// Why a query produced no usable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFailure {
    /// The appliance answered with an unexpected HTTP status.
    Status(u16),
    /// No response at all (connection refused, TLS failure, timeout).
    Transport(String),
    /// A 200 response whose body could not be parsed as XML.
    Malformed(String),
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::Status(status) => write!(f, "unexpected status {status}"),
            QueryFailure::Transport(message) => write!(f, "no response: {message}"),
            QueryFailure::Malformed(message) => write!(f, "unparseable response: {message}"),
        }
    }
}

/// Result of trying to locate one partition's profile on one host.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ProfileRecord),
    /// Search answered 204: the partition is unknown to this host.
    NotFound,
    /// The partition exists but carries no associated default profile.
    ProfileMissing,
    /// The query itself went wrong; another host may still succeed.
    QueryError(QueryFailure),
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }
}

/// Which attribute groups are extracted into the record.
///
/// Disabled groups are omitted entirely (not defaulted to absent), so
/// they can never surface in a diff. Passed in explicitly so the fetcher
/// is testable with varying flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupToggles {
    pub general: bool,
    pub processors: bool,
    pub memory: bool,
    pub networking: bool,
    pub virtual_fc: bool,
    pub virtual_scsi: bool,
}

impl Default for GroupToggles {
    fn default() -> Self {
        Self {
            general: true,
            processors: true,
            memory: true,
            networking: true,
            virtual_fc: true,
            virtual_scsi: true,
        }
    }
}

/// Optional persistence of raw response bodies for diagnostics.
///
/// Files are keyed by partition name and document kind
/// (`{lpar}_general.xml`, `{lpar}_default_profile.xml`). Failures are
/// logged, never propagated.
#[derive(Debug, Clone)]
pub struct DebugCapture {
    dir: PathBuf,
}

impl DebugCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn save(&self, partition: &str, kind: &str, body: &str) {
        if let Err(error) = self.write(partition, kind, body) {
            warn!(partition, kind, %error, "failed to write debug capture");
        }
    }

    fn write(&self, partition: &str, kind: &str, body: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{partition}_{kind}.xml"));
        debug!(path = %path.display(), "writing response capture");
        fs::write(path, body)
    }
}

/// Executes the two-call fetch protocol against an open [`Session`].
#[derive(Debug, Clone)]
pub struct ProfileFetcher {
    toggles: GroupToggles,
    capture: Option<DebugCapture>,
}

impl ProfileFetcher {
    pub fn new(toggles: GroupToggles) -> Self {
        Self {
            toggles,
            capture: None,
        }
    }

    pub fn with_capture(mut self, capture: DebugCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Looks up `partition` (case sensitive, exact match) on the
    /// session's host and flattens its configuration into a record.
    ///
    /// Expected conditions come back as [`LookupOutcome`]; the only `Err`
    /// is [`SessionError::Protocol`] misuse of a closed session.
    pub fn fetch(
        &self,
        session: &Session,
        partition: &str,
    ) -> Result<LookupOutcome, SessionError> {
        let host = session.host();

        let response = match session.get_uom(&search_url(host, partition)) {
            Ok(response) => response,
            Err(SessionError::Transport { source, .. }) => {
                return Ok(transport_outcome(host, partition, source));
            }
            Err(error) => return Err(error),
        };

        match response.status().as_u16() {
            200 => {}
            204 => {
                debug!(host, partition, "partition not found");
                return Ok(LookupOutcome::NotFound);
            }
            status => {
                debug!(host, partition, status, "partition search failed");
                return Ok(LookupOutcome::QueryError(QueryFailure::Status(status)));
            }
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(source) => return Ok(transport_outcome(host, partition, source)),
        };
        if let Some(capture) = &self.capture {
            capture.save(partition, "general", &body);
        }

        let mut record = ProfileRecord::new();
        let href = match self.apply_search_document(&body, &mut record) {
            Ok(Some(href)) => href,
            Ok(None) => {
                debug!(host, partition, "no associated default profile");
                return Ok(LookupOutcome::ProfileMissing);
            }
            Err(failure) => return Ok(LookupOutcome::QueryError(failure)),
        };

        let response = match session.get_uom(&href) {
            Ok(response) => response,
            Err(SessionError::Transport { source, .. }) => {
                return Ok(transport_outcome(host, partition, source));
            }
            Err(error) => return Err(error),
        };

        let status = response.status().as_u16();
        if status != 200 {
            debug!(host, partition, status, "default profile fetch failed");
            return Ok(LookupOutcome::QueryError(QueryFailure::Status(status)));
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(source) => return Ok(transport_outcome(host, partition, source)),
        };
        if let Some(capture) = &self.capture {
            capture.save(partition, "default_profile", &body);
        }

        if let Err(failure) = self.apply_profile_document(&body, &mut record) {
            return Ok(LookupOutcome::QueryError(failure));
        }

        debug!(host, partition, attributes = record.len(), "profile fetched");
        Ok(LookupOutcome::Found(record))
    }

    /// Folds the partition-search document into `record` and returns the
    /// href of the associated default profile, if any.
    ///
    /// General fields default to absent individually; partial metadata is
    /// expected and diffable, not a failure.
    pub fn apply_search_document(
        &self,
        xml: &str,
        record: &mut ProfileRecord,
    ) -> Result<Option<String>, QueryFailure> {
        let document =
            Document::parse(xml).map_err(|error| QueryFailure::Malformed(error.to_string()))?;

        if self.toggles.general {
            for &field in SEARCH_GENERAL_FIELDS {
                record.insert(
                    AttributeKey::plain(AttributeGroup::General, field),
                    FieldValue::from(uom_text(&document, field)),
                );
            }
        }

        Ok(document
            .descendants()
            .find(|node| node.has_tag_name((UOM_NS, PROFILE_LINK_ELEMENT)))
            .and_then(|node| node.attribute("href"))
            .map(str::to_owned))
    }

    /// Folds the default-profile document into `record`.
    ///
    /// General fields merge without overwriting search-derived keys.
    /// Adapter groups contribute one indexed sub-record per matching
    /// element in document order; a field missing inside a present
    /// adapter element becomes [`FieldValue::Absent`].
    pub fn apply_profile_document(
        &self,
        xml: &str,
        record: &mut ProfileRecord,
    ) -> Result<(), QueryFailure> {
        let document =
            Document::parse(xml).map_err(|error| QueryFailure::Malformed(error.to_string()))?;

        if self.toggles.general {
            for &field in PROFILE_GENERAL_FIELDS {
                record.merge(
                    AttributeKey::plain(AttributeGroup::General, field),
                    FieldValue::from(uom_text(&document, field)),
                );
            }
        }
        if self.toggles.processors {
            named_fields(&document, AttributeGroup::Processor, PROCESSOR_FIELDS, record);
        }
        if self.toggles.memory {
            named_fields(&document, AttributeGroup::Memory, MEMORY_FIELDS, record);
        }
        if self.toggles.networking {
            adapter_fields(
                &document,
                AttributeGroup::Network,
                NETWORK_ADAPTER_ELEMENT,
                NETWORK_ADAPTER_FIELDS,
                record,
            );
        }
        if self.toggles.virtual_fc {
            adapter_fields(
                &document,
                AttributeGroup::FibreChannel,
                FIBRE_CHANNEL_ADAPTER_ELEMENT,
                FIBRE_CHANNEL_ADAPTER_FIELDS,
                record,
            );
        }
        if self.toggles.virtual_scsi {
            adapter_fields(
                &document,
                AttributeGroup::Scsi,
                SCSI_ADAPTER_ELEMENT,
                SCSI_ADAPTER_FIELDS,
                record,
            );
        }
        Ok(())
    }
}

fn transport_outcome(host: &str, partition: &str, source: reqwest::Error) -> LookupOutcome {
    debug!(host, partition, error = %source, "no response from host");
    LookupOutcome::QueryError(QueryFailure::Transport(source.to_string()))
}

fn search_url(host: &str, partition: &str) -> String {
    format!(
        "{}/rest/api/uom/LogicalPartition/search/(PartitionName=={partition})",
        api_base(host)
    )
}

/// First text value of the named uom element anywhere in the document.
fn uom_text<'doc>(document: &'doc Document<'_>, tag: &str) -> Option<&'doc str> {
    document
        .descendants()
        .find(|node| node.has_tag_name((UOM_NS, tag)))
        .and_then(|node| node.text())
}

fn named_fields(
    document: &Document<'_>,
    group: AttributeGroup,
    fields: &[&'static str],
    record: &mut ProfileRecord,
) {
    for &field in fields {
        record.insert(
            AttributeKey::plain(group, field),
            FieldValue::from(uom_text(document, field)),
        );
    }
}

fn adapter_fields(
    document: &Document<'_>,
    group: AttributeGroup,
    element: &str,
    fields: &[&'static str],
    record: &mut ProfileRecord,
) {
    let adapters = document
        .descendants()
        .filter(|node| node.has_tag_name((UOM_NS, element)));
    for (index, adapter) in adapters.enumerate() {
        for &field in fields {
            record.insert(
                AttributeKey::indexed(group, index as u32, field),
                FieldValue::from(child_text(&adapter, field)),
            );
        }
    }
}

/// Direct-child lookup; adapter fields are immediate children of the
/// adapter element, and sibling adapters must not bleed into each other.
fn child_text<'doc>(parent: &Node<'doc, '_>, tag: &str) -> Option<&'doc str> {
    parent
        .children()
        .find(|node| node.has_tag_name((UOM_NS, tag)))
        .and_then(|node| node.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <content type="application/vnd.ibm.powervm.uom+xml; type=LogicalPartition">
      <LogicalPartition xmlns="http://www.ibm.com/xmlns/systems/power/firmware/uom/mc/2012_10/" schemaVersion="V1_0">
        <PartitionName>prod01</PartitionName>
        <PartitionType>AIX/Linux</PartitionType>
        <CurrentProcessorCompatibilityMode>POWER9</CurrentProcessorCompatibilityMode>
        <AssociatedPartitionProfile href="https://hmc01:12443/rest/api/uom/LogicalPartition/1234/LogicalPartitionProfile/5678" rel="related"/>
      </LogicalPartition>
    </content>
  </entry>
</feed>"#;

    const SEARCH_DOC_NO_PROFILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <content>
      <LogicalPartition xmlns="http://www.ibm.com/xmlns/systems/power/firmware/uom/mc/2012_10/">
        <PartitionName>prod01</PartitionName>
        <PartitionType>AIX/Linux</PartitionType>
      </LogicalPartition>
    </content>
  </entry>
</feed>"#;

    const PROFILE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <content>
    <LogicalPartitionProfile xmlns="http://www.ibm.com/xmlns/systems/power/firmware/uom/mc/2012_10/" schemaVersion="V1_0">
      <ProfileName>default_profile</ProfileName>
      <SharingMode>uncapped</SharingMode>
      <UncappedWeight>128</UncappedWeight>
      <MinimumProcessingUnits>0.1</MinimumProcessingUnits>
      <DesiredProcessingUnits>0.5</DesiredProcessingUnits>
      <MaximumProcessingUnits>2.0</MaximumProcessingUnits>
      <MinimumVirtualProcessors>1</MinimumVirtualProcessors>
      <DesiredVirtualProcessors>2</DesiredVirtualProcessors>
      <MaximumVirtualProcessors>4</MaximumVirtualProcessors>
      <ActiveMemoryExpansionEnabled>false</ActiveMemoryExpansionEnabled>
      <DesiredMemory>8192</DesiredMemory>
      <MaximumMemory>16384</MaximumMemory>
      <MinimumMemory>4096</MinimumMemory>
      <ProfileClientNetworkAdapter>
        <VirtualSlotNumber>2</VirtualSlotNumber>
        <PortVLANID>100</PortVLANID>
        <VirtualSwitchName>ETHERNET0</VirtualSwitchName>
      </ProfileClientNetworkAdapter>
      <ProfileClientNetworkAdapter>
        <VirtualSlotNumber>3</VirtualSlotNumber>
        <PortVLANID>200</PortVLANID>
      </ProfileClientNetworkAdapter>
      <ProfileVirtualFibreChannelClientAdapter>
        <VirtualSlotNumber>10</VirtualSlotNumber>
        <AdapterType>Client</AdapterType>
      </ProfileVirtualFibreChannelClientAdapter>
      <ProfileVirtualSCSIClientAdapter>
        <VirtualSlotNumber>20</VirtualSlotNumber>
        <AdapterType>Client</AdapterType>
      </ProfileVirtualSCSIClientAdapter>
    </LogicalPartitionProfile>
  </content>
</entry>"#;

    fn fetcher() -> ProfileFetcher {
        ProfileFetcher::new(GroupToggles::default())
    }

    #[test]
    fn search_document_yields_general_fields_and_href() {
        let mut record = ProfileRecord::new();
        let href = fetcher()
            .apply_search_document(SEARCH_DOC, &mut record)
            .unwrap();

        assert_eq!(
            href.as_deref(),
            Some("https://hmc01:12443/rest/api/uom/LogicalPartition/1234/LogicalPartitionProfile/5678")
        );
        assert_eq!(
            record.get(&AttributeKey::plain(AttributeGroup::General, "PartitionType")),
            Some(&FieldValue::Present("AIX/Linux".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::plain(
                AttributeGroup::General,
                "CurrentProcessorCompatibilityMode"
            )),
            Some(&FieldValue::Present("POWER9".into()))
        );
    }

    #[test]
    fn search_document_defaults_missing_general_fields_to_absent() {
        let mut record = ProfileRecord::new();
        fetcher()
            .apply_search_document(SEARCH_DOC_NO_PROFILE, &mut record)
            .unwrap();

        assert_eq!(
            record.get(&AttributeKey::plain(
                AttributeGroup::General,
                "CurrentProcessorCompatibilityMode"
            )),
            Some(&FieldValue::Absent)
        );
    }

    #[test]
    fn search_document_without_profile_link_yields_no_href() {
        let mut record = ProfileRecord::new();
        let href = fetcher()
            .apply_search_document(SEARCH_DOC_NO_PROFILE, &mut record)
            .unwrap();
        assert_eq!(href, None);
    }

    #[test]
    fn profile_document_extracts_every_enabled_group() {
        let mut record = ProfileRecord::new();
        fetcher()
            .apply_profile_document(PROFILE_DOC, &mut record)
            .unwrap();

        assert_eq!(
            record.get(&AttributeKey::plain(AttributeGroup::General, "ProfileName")),
            Some(&FieldValue::Present("default_profile".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::plain(AttributeGroup::Processor, "SharingMode")),
            Some(&FieldValue::Present("uncapped".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::plain(AttributeGroup::Memory, "DesiredMemory")),
            Some(&FieldValue::Present("8192".into()))
        );
        // ExpansionFactor is not in the document and defaults to absent.
        assert_eq!(
            record.get(&AttributeKey::plain(AttributeGroup::Memory, "ExpansionFactor")),
            Some(&FieldValue::Absent)
        );
    }

    #[test]
    fn adapters_are_indexed_in_document_order() {
        let mut record = ProfileRecord::new();
        fetcher()
            .apply_profile_document(PROFILE_DOC, &mut record)
            .unwrap();

        assert_eq!(
            record.get(&AttributeKey::indexed(AttributeGroup::Network, 0, "PortVLANID")),
            Some(&FieldValue::Present("100".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::indexed(AttributeGroup::Network, 1, "PortVLANID")),
            Some(&FieldValue::Present("200".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::indexed(
                AttributeGroup::FibreChannel,
                0,
                "VirtualSlotNumber"
            )),
            Some(&FieldValue::Present("10".into()))
        );
        assert_eq!(
            record.get(&AttributeKey::indexed(AttributeGroup::Scsi, 0, "AdapterType")),
            Some(&FieldValue::Present("Client".into()))
        );
    }

    #[test]
    fn field_missing_inside_present_adapter_is_absent() {
        // The second network adapter has no VirtualSwitchName.
        let mut record = ProfileRecord::new();
        fetcher()
            .apply_profile_document(PROFILE_DOC, &mut record)
            .unwrap();

        assert_eq!(
            record.get(&AttributeKey::indexed(
                AttributeGroup::Network,
                1,
                "VirtualSwitchName"
            )),
            Some(&FieldValue::Absent)
        );
        // But the first adapter's value must not bleed over.
        assert_eq!(
            record.get(&AttributeKey::indexed(
                AttributeGroup::Network,
                0,
                "VirtualSwitchName"
            )),
            Some(&FieldValue::Present("ETHERNET0".into()))
        );
    }

    #[test]
    fn disabled_groups_never_appear_in_the_record() {
        let toggles = GroupToggles {
            processors: false,
            networking: false,
            ..GroupToggles::default()
        };
        let mut record = ProfileRecord::new();
        let fetcher = ProfileFetcher::new(toggles);
        fetcher
            .apply_search_document(SEARCH_DOC, &mut record)
            .unwrap();
        fetcher
            .apply_profile_document(PROFILE_DOC, &mut record)
            .unwrap();

        assert!(!record.contains_group(AttributeGroup::Processor));
        assert!(!record.contains_group(AttributeGroup::Network));
        assert!(record.contains_group(AttributeGroup::General));
        assert!(record.contains_group(AttributeGroup::Memory));
        assert!(record.contains_group(AttributeGroup::FibreChannel));
    }

    #[test]
    fn disabled_general_still_reports_the_profile_href() {
        let toggles = GroupToggles {
            general: false,
            ..GroupToggles::default()
        };
        let mut record = ProfileRecord::new();
        let href = ProfileFetcher::new(toggles)
            .apply_search_document(SEARCH_DOC, &mut record)
            .unwrap();
        assert!(href.is_some());
        assert!(record.is_empty());
    }

    #[test]
    fn unparseable_documents_are_classified_as_malformed() {
        let mut record = ProfileRecord::new();
        let failure = fetcher()
            .apply_search_document("<feed><unclosed>", &mut record)
            .unwrap_err();
        assert!(matches!(failure, QueryFailure::Malformed(_)));
    }

    #[test]
    fn search_url_filters_by_exact_partition_name() {
        assert_eq!(
            search_url("hmc01", "prod01"),
            "https://hmc01:12443/rest/api/uom/LogicalPartition/search/(PartitionName==prod01)"
        );
    }
}
