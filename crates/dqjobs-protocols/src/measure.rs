//! Measure definitions referenced by jobs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A connector reading one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConnector {
    pub name: String,
    #[serde(default, rename = "type")]
    pub connector_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl DataConnector {
    pub fn new(name: impl Into<String>, connector_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connector_type: connector_type.into(),
            version: String::new(),
            config: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub name: String,
    #[serde(default)]
    pub connectors: Vec<DataConnector>,
}

/// A data-quality measurement definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deleted: bool,
    pub data_sources: Vec<DataSource>,
}

impl Measure {
    /// Names of every connector across all data sources, in declaration order.
    pub fn connector_names(&self) -> Vec<&str> {
        self.data_sources
            .iter()
            .flat_map(|source| source.connectors.iter().map(|c| c.name.as_str()))
            .collect()
    }
}

/// Measure registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasure {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

impl NewMeasure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, name: impl Into<String>, connectors: Vec<DataConnector>) -> Self {
        self.data_sources.push(DataSource {
            name: name.into(),
            connectors,
        });
        self
    }
}
