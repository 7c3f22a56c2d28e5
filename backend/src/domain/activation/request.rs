//! Activation request payload and field validation.
//!
//! Validation runs before any mutation and reports every offending field at
//! once, so a client can correct its payload in a single round trip.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::error::Error;
use crate::domain::ids::{DisplayId, Sku, StoreId};
use crate::domain::store::{FollowupDays, PromoConfig, StoreContact, StorePatch};

/// Requested quantity for one SKU in the initial-inventory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryTarget {
    pub quantity: i64,
    pub is_presale: bool,
}

/// One activation request as the orchestrator consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRequest {
    pub display_id: DisplayId,
    /// Required in create mode; optional when linking an existing store.
    pub store_name: Option<String>,
    pub email: String,
    pub phone: String,
    pub pin: String,
    pub zip: String,
    pub state_code: String,
    pub promo: Option<PromoConfig>,
    pub followup_days: Vec<u8>,
    pub sample_skus: Vec<Sku>,
    pub product_skus: Vec<Sku>,
    /// Selects link mode when present.
    pub existing_store_id: Option<StoreId>,
    pub crm_customer_id: Option<String>,
    pub setup_photo_url: Option<String>,
    pub initial_inventory: BTreeMap<Sku, InventoryTarget>,
}

impl ActivationRequest {
    /// Validate every field, returning the parsed follow-up selection.
    ///
    /// Failures collect into one `invalid_request` error whose details carry
    /// the offending field list; nothing has been mutated at that point.
    pub fn validate(&self) -> Result<FollowupDays, Error> {
        let mut faults: Vec<(&'static str, String)> = Vec::new();

        if !is_valid_email(&self.email) {
            faults.push(("email", "email must be a valid address".to_owned()));
        }
        if !is_valid_phone(&self.phone) {
            faults.push((
                "phone",
                "phone must be 10 to 15 characters of digits, +, spaces, parentheses, or hyphens"
                    .to_owned(),
            ));
        }
        if !is_valid_pin(&self.pin) {
            faults.push(("pin", "pin must be exactly 4 digits".to_owned()));
        }
        if !is_valid_zip(&self.zip) {
            faults.push(("zip", "zip must be exactly 5 digits".to_owned()));
        }
        if !is_valid_state(&self.state_code) {
            faults.push((
                "stateCode",
                "stateCode must be a 2-letter uppercase code".to_owned(),
            ));
        }
        if self.sample_skus.is_empty() {
            faults.push(("sampleSkus", "at least one sample SKU is required".to_owned()));
        }
        if self.existing_store_id.is_none()
            && !self
                .store_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
        {
            faults.push(("storeName", "storeName is required when creating a store".to_owned()));
        }
        if self
            .initial_inventory
            .values()
            .any(|target| target.quantity < 0)
        {
            faults.push((
                "initialInventory",
                "inventory quantities must not be negative".to_owned(),
            ));
        }

        let followup = match FollowupDays::new(&self.followup_days) {
            Ok(days) => Some(days),
            Err(err) => {
                faults.push(("followupDays", err.to_string()));
                None
            }
        };

        if faults.is_empty() {
            // Arity was checked above, so this cannot still be None.
            followup.ok_or_else(|| Error::internal("followup day validation desynchronised"))
        } else {
            let fields: Vec<&str> = faults.iter().map(|(field, _)| *field).collect();
            let detail: Vec<_> = faults
                .iter()
                .map(|(field, message)| json!({ "field": field, "message": message }))
                .collect();
            Err(
                Error::invalid_request("activation request failed validation").with_details(
                    json!({
                        "missingFields": fields,
                        "faults": detail,
                    }),
                ),
            )
        }
    }

    /// Partial update applied to a pre-existing store in link mode.
    ///
    /// Only fields the caller supplied make it into the patch; absent promo
    /// and product-list values leave the dashboard-managed state untouched.
    pub fn store_patch(&self, followup: FollowupDays) -> StorePatch {
        StorePatch {
            name: self
                .store_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            contact: Some(StoreContact {
                email: self.email.clone(),
                phone: self.phone.clone(),
            }),
            pin: Some(self.pin.clone()),
            promo: self.promo.clone(),
            followup_days: Some(followup),
            sample_skus: Some(self.sample_skus.clone()),
            product_skus: if self.product_skus.is_empty() {
                None
            } else {
                Some(self.product_skus.clone())
            },
        }
    }

    /// Build the full store record for create mode.
    pub fn build_store(
        &self,
        id: StoreId,
        followup: FollowupDays,
        now: chrono::DateTime<chrono::Utc>,
    ) -> crate::domain::store::Store {
        crate::domain::store::Store {
            name: self
                .store_name
                .clone()
                .unwrap_or_else(|| format!("Store {id}")),
            id,
            contact: StoreContact {
                email: self.email.clone(),
                phone: self.phone.clone(),
            },
            pin: self.pin.clone(),
            zip: self.zip.clone(),
            state_code: self.state_code.clone(),
            promo: self.promo.clone().unwrap_or_default(),
            followup_days: followup,
            sample_skus: self.sample_skus.clone(),
            product_skus: self.product_skus.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_valid_phone(value: &str) -> bool {
    let len = value.chars().count();
    (10..=15).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '(' | ')' | '-'))
}

fn is_valid_pin(value: &str) -> bool {
    value.len() == 4 && value.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_zip(value: &str) -> bool {
    value.len() == 5 && value.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_state(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base_request() -> ActivationRequest {
        ActivationRequest {
            display_id: DisplayId::new("D-1").expect("valid id"),
            store_name: Some("Corner Market".to_owned()),
            email: "owner@corner.example".to_owned(),
            phone: "(415) 555-0100".to_owned(),
            pin: "1234".to_owned(),
            zip: "94107".to_owned(),
            state_code: "CA".to_owned(),
            promo: None,
            followup_days: vec![4, 12],
            sample_skus: vec![Sku::new("SKU-1").expect("valid sku")],
            product_skus: vec![],
            existing_store_id: None,
            crm_customer_id: None,
            setup_photo_url: None,
            initial_inventory: BTreeMap::new(),
        }
    }

    fn offending_fields(err: &crate::domain::Error) -> Vec<String> {
        err.details()
            .and_then(|details| details.get("missingFields"))
            .and_then(|fields| fields.as_array())
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn accepts_a_complete_request() {
        let followup = base_request().validate().expect("valid request");
        assert_eq!(followup.as_pair(), (4, 12));
    }

    #[rstest]
    #[case(vec![4])]
    #[case(vec![4, 12, 20])]
    fn rejects_wrong_followup_arity(#[case] days: Vec<u8>) {
        let mut request = base_request();
        request.followup_days = days;
        let err = request.validate().expect_err("arity rejected");
        assert!(offending_fields(&err).contains(&"followupDays".to_owned()));
    }

    #[rstest]
    #[case("no-at-sign.example")]
    #[case("two@@signs.example")]
    #[case("spaces in@local.example")]
    #[case("trailing@dot.")]
    fn rejects_bad_emails(#[case] email: &str) {
        let mut request = base_request();
        request.email = email.to_owned();
        let err = request.validate().expect_err("email rejected");
        assert!(offending_fields(&err).contains(&"email".to_owned()));
    }

    #[rstest]
    #[case("555-0100")] // too short
    #[case("0123456789012345")] // too long
    #[case("415555010a")] // letters
    fn rejects_bad_phones(#[case] phone: &str) {
        let mut request = base_request();
        request.phone = phone.to_owned();
        let err = request.validate().expect_err("phone rejected");
        assert!(offending_fields(&err).contains(&"phone".to_owned()));
    }

    #[rstest]
    #[case("pin", "123")]
    #[case("pin", "12a4")]
    #[case("zip", "9410")]
    #[case("stateCode", "Ca")]
    #[case("stateCode", "CAL")]
    fn rejects_bad_formats(#[case] field: &str, #[case] value: &str) {
        let mut request = base_request();
        match field {
            "pin" => request.pin = value.to_owned(),
            "zip" => request.zip = value.to_owned(),
            "stateCode" => request.state_code = value.to_owned(),
            other => panic!("unsupported field: {other}"),
        }
        let err = request.validate().expect_err("format rejected");
        assert!(offending_fields(&err).contains(&field.to_owned()));
    }

    #[test]
    fn rejects_empty_sample_skus() {
        let mut request = base_request();
        request.sample_skus.clear();
        let err = request.validate().expect_err("samples required");
        assert!(offending_fields(&err).contains(&"sampleSkus".to_owned()));
    }

    #[test]
    fn requires_store_name_only_in_create_mode() {
        let mut request = base_request();
        request.store_name = None;
        let err = request.validate().expect_err("name required");
        assert!(offending_fields(&err).contains(&"storeName".to_owned()));

        request.existing_store_id = Some(StoreId::new("S-9").expect("valid id"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn collects_every_fault_at_once() {
        let mut request = base_request();
        request.pin = "1".to_owned();
        request.zip = "x".to_owned();
        request.followup_days = vec![1];
        let err = request.validate().expect_err("faults rejected");
        let fields = offending_fields(&err);
        assert!(fields.contains(&"pin".to_owned()));
        assert!(fields.contains(&"zip".to_owned()));
        assert!(fields.contains(&"followupDays".to_owned()));
    }

    #[test]
    fn link_mode_patch_omits_unsupplied_fields() {
        let mut request = base_request();
        request.store_name = None;
        request.promo = None;
        request.product_skus.clear();
        let followup = FollowupDays::new(&[4, 12]).expect("two values");
        let patch = request.store_patch(followup);
        assert!(patch.name.is_none());
        assert!(patch.promo.is_none());
        assert!(patch.product_skus.is_none());
        assert!(patch.contact.is_some());
    }
}
