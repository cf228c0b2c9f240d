//! Provider record payload
//!
//! A record is what the provider returns for one identifier. Every nested
//! grouping is optional: `None` means the provider did not report it, while
//! `Some(vec![])` means it reported an empty list. String attributes are
//! `Option<String>` as well; nothing here is ever defaulted to a placeholder
//! that could later reach a sort or comparison.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Complete record for one identifier
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderRecord {
    /// General registration attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralInfo>,

    /// Partners / shareholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partners: Option<Vec<Partner>>,

    /// Authorized legal representatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representatives: Option<Vec<Representative>>,

    /// Members of administrative bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_roles: Option<Vec<AdminRole>>,
}

impl ProviderRecord {
    /// Legal name, if the general section reported one
    pub fn legal_name(&self) -> Option<&str> {
        self.general.as_ref().and_then(|g| g.legal_name.as_deref())
    }

    /// Taxpayer status (e.g. ACTIVE), used by the summary breakdown
    pub fn taxpayer_status(&self) -> Option<&str> {
        self.general
            .as_ref()
            .and_then(|g| g.taxpayer_status.as_deref())
    }

    /// Taxpayer type, used by the top-N summary breakdown
    pub fn taxpayer_type(&self) -> Option<&str> {
        self.general.as_ref().and_then(|g| g.taxpayer_type.as_deref())
    }
}

/// General provider attributes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneralInfo {
    /// Registered legal name
    #[serde(default)]
    pub legal_name: Option<String>,
    /// Taxpayer status (ACTIVE, SUSPENDED, ...)
    #[serde(default)]
    pub taxpayer_status: Option<String>,
    /// Domicile condition (HABIDO, NO HABIDO, ...)
    #[serde(default)]
    pub condition: Option<String>,
    /// Taxpayer type (company, sole proprietor, ...)
    #[serde(default)]
    pub taxpayer_type: Option<String>,
    /// Full address line
    #[serde(default)]
    pub address: Option<String>,
    /// Department
    #[serde(default)]
    pub department: Option<String>,
    /// Province
    #[serde(default)]
    pub province: Option<String>,
    /// District
    #[serde(default)]
    pub district: Option<String>,
    /// Phone numbers (None = not reported)
    #[serde(default)]
    pub phones: Option<Vec<String>>,
    /// Email addresses (None = not reported)
    #[serde(default)]
    pub emails: Option<Vec<String>>,
    /// Registration date as reported
    #[serde(default)]
    pub registered_on: Option<String>,
    /// Main economic activity
    #[serde(default)]
    pub economic_activity: Option<String>,
}

/// Partner or shareholder
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Partner {
    /// Full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Document type code
    #[serde(default)]
    pub document_type: Option<String>,
    /// Document type description
    #[serde(default)]
    pub document_description: Option<String>,
    /// Document number
    #[serde(default)]
    pub document_number: Option<String>,
    /// Ownership percentage as reported
    #[serde(default)]
    pub ownership_percentage: Option<String>,
    /// Number of shares
    #[serde(default)]
    pub share_count: Option<f64>,
    /// Date the partner joined
    #[serde(default)]
    pub joined_on: Option<String>,
}

/// Authorized legal representative
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Representative {
    /// Full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Document type code
    #[serde(default)]
    pub document_type: Option<String>,
    /// Document type description
    #[serde(default)]
    pub document_description: Option<String>,
    /// Document number
    #[serde(default)]
    pub document_number: Option<String>,
    /// Position held
    #[serde(default)]
    pub position: Option<String>,
    /// Date the position started
    #[serde(default)]
    pub since: Option<String>,
}

/// Member of an administrative body
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminRole {
    /// Full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Document type code
    #[serde(default)]
    pub document_type: Option<String>,
    /// Document type description
    #[serde(default)]
    pub document_description: Option<String>,
    /// Document number
    #[serde(default)]
    pub document_number: Option<String>,
    /// Administrative body (management, board, ...)
    #[serde(default)]
    pub body_type: Option<String>,
    /// Position held
    #[serde(default)]
    pub position: Option<String>,
    /// Date the position started
    #[serde(default)]
    pub since: Option<String>,
}
