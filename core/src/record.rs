//! # Profile Attribute Model
//!
//! Typed vocabulary for a partition's flattened configuration profile.
//!
//! The HMC hands back deeply nested XML; what the comparison actually
//! works on is a flat map of attribute keys to string values. Keys are
//! structured rather than stringly typed: a group tag, an optional
//! adapter index, and a field name. `Display` on [`AttributeKey`] still
//! renders the flat legacy form (e.g. `General_PartitionType`,
//! `Network_VirtualEthAdapter_0_PortVLANID`) for logs and debugging.

use std::collections::BTreeMap;
use std::fmt;

/// The attribute categories a profile comparison covers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeGroup {
    General,
    Processor,
    Memory,
    Network,
    FibreChannel,
    Scsi,
}

impl AttributeGroup {
    /// Short label used in group headings.
    pub fn label(&self) -> &'static str {
        match self {
            AttributeGroup::General => "General",
            AttributeGroup::Processor => "Processor",
            AttributeGroup::Memory => "Memory",
            AttributeGroup::Network => "Network",
            AttributeGroup::FibreChannel => "vFC",
            AttributeGroup::Scsi => "vSCSI",
        }
    }

    /// Prefix of the flat legacy key form.
    fn key_prefix(&self) -> &'static str {
        match self {
            AttributeGroup::General => "General",
            AttributeGroup::Processor => "Processor",
            AttributeGroup::Memory => "Memory",
            AttributeGroup::Network => "Network_VirtualEthAdapter",
            AttributeGroup::FibreChannel => "vFC_VirtualFcAdapter",
            AttributeGroup::Scsi => "vSCSI_VirtualScsiAdapter",
        }
    }
}

/// General fields available from the partition-search document.
pub const SEARCH_GENERAL_FIELDS: &[&str] =
    &["PartitionType", "CurrentProcessorCompatibilityMode"];

/// General fields only present in the default-profile document.
pub const PROFILE_GENERAL_FIELDS: &[&str] = &["ProfileName"];

pub const PROCESSOR_FIELDS: &[&str] = &[
    "SharingMode",
    "UncappedWeight",
    "MinimumProcessingUnits",
    "DesiredProcessingUnits",
    "MaximumProcessingUnits",
    "MinimumVirtualProcessors",
    "DesiredVirtualProcessors",
    "MaximumVirtualProcessors",
];

pub const MEMORY_FIELDS: &[&str] = &[
    "ActiveMemoryExpansionEnabled",
    "DesiredMemory",
    "ExpansionFactor",
    "MaximumMemory",
    "MinimumMemory",
];

pub const NETWORK_ADAPTER_FIELDS: &[&str] =
    &["VirtualSlotNumber", "PortVLANID", "VirtualSwitchName"];

pub const FIBRE_CHANNEL_ADAPTER_FIELDS: &[&str] = &["VirtualSlotNumber", "AdapterType"];

pub const SCSI_ADAPTER_FIELDS: &[&str] = &["VirtualSlotNumber", "AdapterType"];

/// Composite key for one profile attribute.
///
/// Ordering is (group, adapter index, field name), which is exactly the
/// fixed group order plus full-key sort the comparison output requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeKey {
    pub group: AttributeGroup,
    pub index: Option<u32>,
    pub field: &'static str,
}

impl AttributeKey {
    /// Key for a non-adapter field.
    pub fn plain(group: AttributeGroup, field: &'static str) -> Self {
        Self {
            group,
            index: None,
            field,
        }
    }

    /// Key for a field of the `index`-th adapter of an adapter group.
    pub fn indexed(group: AttributeGroup, index: u32, field: &'static str) -> Self {
        Self {
            group,
            index: Some(index),
            field,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}_{}_{}", self.group.key_prefix(), index, self.field),
            None => write!(f, "{}_{}", self.group.key_prefix(), self.field),
        }
    }
}

/// Value of one extracted field.
///
/// `Absent` means the enabled field's element was not present in the
/// source document. It is a real value: two `Absent` sides compare equal,
/// and it is distinct from a key missing from a record entirely (which
/// the diff renders with the `missing` sentinel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Present(String),
    Absent,
}

impl FieldValue {
    pub fn render(&self) -> &str {
        match self {
            FieldValue::Present(text) => text,
            FieldValue::Absent => "absent",
        }
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(text: Option<&str>) -> Self {
        match text {
            Some(text) => FieldValue::Present(text.to_string()),
            None => FieldValue::Absent,
        }
    }
}

/// One partition's flattened configuration profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord {
    entries: BTreeMap<AttributeKey, FieldValue>,
}

impl ProfileRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: AttributeKey, value: FieldValue) {
        self.entries.insert(key, value);
    }

    /// Inserts only when the key is not already present. Used when the
    /// default-profile document is merged on top of search-derived keys,
    /// which must never be overwritten.
    pub fn merge(&mut self, key: AttributeKey, value: FieldValue) {
        self.entries.entry(key).or_insert(value);
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AttributeKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_group(&self, group: AttributeGroup) -> bool {
        self.entries.keys().any(|key| key.group == group)
    }
}

impl FromIterator<(AttributeKey, FieldValue)> for ProfileRecord {
    fn from_iter<I: IntoIterator<Item = (AttributeKey, FieldValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
