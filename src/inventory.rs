//! Flattening search results into the CSV inventory report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::compartments::{CompartmentIndex, UNKNOWN_COMPARTMENT};
use crate::config::InventoryConfig;
use crate::model::RemoteRecord;

/// One row of the inventory report. Field order is the report's column
/// order; tag maps are serialized as JSON strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub resource_type: String,
    pub display_name: String,
    pub identifier: String,
    pub compartment_name: String,
    pub compartment_id: String,
    pub region: String,
    pub time_created: String,
    pub lifecycle_state: String,
    pub defined_tags: String,
    pub freeform_tags: String,
}

/// Build the structured search query for the configured scope.
pub fn build_query(config: &InventoryConfig) -> String {
    let mut query = match &config.compartment_id {
        Some(compartment) => {
            format!("query all resources where compartmentId = '{compartment}'")
        }
        None => "query all resources".to_string(),
    };
    if let Some(state) = &config.lifecycle_state {
        query.push_str(&format!(" && lifecycleState = '{state}'"));
    }
    query
}

/// Default report path: timestamped file in the working directory.
pub fn default_report_path(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "tenancy_resources_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Flatten a record against the compartment index.
pub fn flatten(record: &RemoteRecord, compartments: &CompartmentIndex) -> InventoryRow {
    let compartment_name = compartments
        .get(&record.compartment_id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_COMPARTMENT.to_string());

    InventoryRow {
        resource_type: record.resource_type.clone(),
        display_name: record.display_name.clone(),
        identifier: record.identifier.clone(),
        compartment_name,
        compartment_id: record.compartment_id.clone(),
        region: record.region.clone(),
        time_created: record
            .time_created
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        lifecycle_state: record.lifecycle_state.to_string(),
        defined_tags: serde_json::to_string(&record.defined_tags).unwrap_or_default(),
        freeform_tags: serde_json::to_string(&record.freeform_tags).unwrap_or_default(),
    }
}

/// Write the report. Headers come from the row struct's field names.
pub fn write_report(
    path: &Path,
    records: &[RemoteRecord],
    compartments: &CompartmentIndex,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(flatten(record, compartments))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "inventory report written");
    Ok(())
}
