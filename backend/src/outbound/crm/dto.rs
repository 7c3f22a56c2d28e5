//! Wire shapes for the external customer API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ports::{CrmCustomer, CrmCustomerDraft, CrmCustomerUpdate};

/// Customer record as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDto {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<CustomerDto> for CrmCustomer {
    fn from(dto: CustomerDto) -> Self {
        Self {
            id: dto.id,
            email: dto.email,
            tags: dto.tags,
            note: dto.note,
        }
    }
}

/// Envelope returned by the email search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponseDto {
    #[serde(default)]
    pub customers: Vec<CustomerDto>,
}

/// Creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCustomerDto {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub tags: Vec<String>,
    pub note: String,
    pub fields: BTreeMap<String, String>,
}

impl From<&CrmCustomerDraft> for CreateCustomerDto {
    fn from(draft: &CrmCustomerDraft) -> Self {
        Self {
            email: draft.email.clone(),
            first_name: draft.first_name.clone(),
            tags: draft.tags.clone(),
            note: draft.note.clone(),
            fields: draft.fields.iter().cloned().collect(),
        }
    }
}

/// Partial-update payload; absent members are left untouched server side.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCustomerDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl From<&CrmCustomerUpdate> for UpdateCustomerDto {
    fn from(update: &CrmCustomerUpdate) -> Self {
        Self {
            tags: update.tags.clone(),
            note: update.note.clone(),
            fields: update.fields.iter().cloned().collect(),
        }
    }
}

/// One structured field value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValueDto {
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_omits_absent_members() {
        let update = CrmCustomerUpdate {
            tags: None,
            note: Some("hello".to_owned()),
            fields: Vec::new(),
        };
        let value = serde_json::to_value(UpdateCustomerDto::from(&update)).expect("serialises");
        assert!(value.get("tags").is_none());
        assert!(value.get("fields").is_none());
        assert_eq!(value["note"], "hello");
    }

    #[test]
    fn customer_decodes_with_missing_optional_members() {
        let dto: CustomerDto =
            serde_json::from_str(r#"{"id":"cust-1","email":"a@b.example"}"#).expect("decodes");
        let customer = CrmCustomer::from(dto);
        assert!(customer.tags.is_empty());
        assert!(customer.note.is_none());
    }
}
