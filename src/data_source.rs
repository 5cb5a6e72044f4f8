use serde::{Deserialize, Serialize};

use crate::error::AssistantError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Database,
    Api,
    Cloud,
    File,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DataSource {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
}

pub const CATALOG: &[DataSource] = &[
    DataSource {
        id: "ds1",
        name: "CRM Database",
        category: Category::Database,
    },
    DataSource {
        id: "ds2",
        name: "Sales API",
        category: Category::Api,
    },
    DataSource {
        id: "ds3",
        name: "Marketing Cloud",
        category: Category::Cloud,
    },
    DataSource {
        id: "ds4",
        name: "Customer Files",
        category: Category::File,
    },
    DataSource {
        id: "ds5",
        name: "Financial Database",
        category: Category::Database,
    },
];

pub fn find(id: &str) -> Option<&'static DataSource> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Which catalog entry the assistant claims to be consulting.
#[derive(Debug, Clone)]
pub struct DataSourceSelector {
    current: &'static DataSource,
}

impl Default for DataSourceSelector {
    fn default() -> Self {
        Self {
            current: &CATALOG[0],
        }
    }
}

impl DataSourceSelector {
    pub fn current(&self) -> &'static DataSource {
        self.current
    }

    pub fn catalog(&self) -> &'static [DataSource] {
        CATALOG
    }

    pub fn set_current(&mut self, id: &str) -> Result<&'static DataSource, AssistantError> {
        let source = find(id).ok_or_else(|| AssistantError::InvalidDataSource(id.to_string()))?;
        self.current = source;
        Ok(source)
    }
}
