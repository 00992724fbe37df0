//! Tool catalog: raw tool records compacted into `{name, description}` pairs.

use subserver_core::tool::{ToolRecord, ToolSource};
use tracing::{debug, warn};

/// Cap on the argument keys listed in a tool description.
pub const MAX_ARG_KEYS: usize = 30;

/// A tool as presented to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub arg_keys: Vec<String>,
}

impl ToolDescriptor {
    fn from_record(record: &ToolRecord) -> Option<Self> {
        let name = record.name.as_deref().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        let mut arg_keys = record.argument_keys();
        arg_keys.truncate(MAX_ARG_KEYS);
        Some(Self {
            name: name.to_string(),
            description: record.description.clone().unwrap_or_default(),
            arg_keys,
        })
    }

    /// Description with the argument keys appended: `"desc (args: k1, k2)"`.
    pub fn rendered_description(&self) -> String {
        if self.arg_keys.is_empty() {
            self.description.clone()
        } else {
            format!("{} (args: {})", self.description, self.arg_keys.join(", "))
        }
    }
}

/// The ordered, de-duplicated set of tools a run may call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compact raw records, in order.
    ///
    /// Nameless records and repeated names are dropped; a positive
    /// `max_tools` keeps only that many entries.
    pub fn from_records(records: &[ToolRecord], max_tools: usize) -> Self {
        let mut tools: Vec<ToolDescriptor> = Vec::new();
        for descriptor in records.iter().filter_map(ToolDescriptor::from_record) {
            if max_tools > 0 && tools.len() >= max_tools {
                break;
            }
            if tools.iter().any(|t| t.name == descriptor.name) {
                continue;
            }
            tools.push(descriptor);
        }
        Self { tools }
    }

    /// Fetch from a tool source. Listing failure yields an empty catalog.
    pub async fn fetch(source: &dyn ToolSource, max_tools: usize) -> Self {
        match source.list_tools().await {
            Ok(records) => {
                let catalog = Self::from_records(&records, max_tools);
                debug!(fetched = records.len(), surfaced = catalog.len(), "Tool catalog ready");
                catalog
            }
            Err(e) => {
                warn!(error = %e, "Failed to list tools, continuing without tools");
                Self::empty()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
