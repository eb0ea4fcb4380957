use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ContextRecord, DataSourceRecord};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDataSourceRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
    pub enabled: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDataSourceRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
    pub enabled: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
}

impl UpdateDataSourceRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.source_type.is_none()
            && self.enabled.is_none()
            && self.config.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateContextRequest {
    pub content: Option<String>,
    pub summary: Option<String>,
    /// RFC 3339.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataSourceResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub enabled: bool,
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContextResponse {
    pub id: i64,
    pub data_source_id: i64,
    pub content: String,
    pub summary: Option<String>,
    pub created_at: String,
    pub expires_at: Option<String>,
}

impl DataSourceRecord {
    pub fn to_response(&self) -> DataSourceResponse {
        DataSourceResponse {
            id: self.id,
            name: self.name.clone(),
            source_type: self.source_type.clone(),
            enabled: self.enabled,
            config: self.config.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl ContextRecord {
    pub fn to_response(&self) -> ContextResponse {
        ContextResponse {
            id: self.id,
            data_source_id: self.data_source_id,
            content: self.content.clone(),
            summary: self.summary.clone(),
            created_at: self.created_at.to_rfc3339(),
            expires_at: self.expires_at.map(|t| t.to_rfc3339()),
        }
    }
}
