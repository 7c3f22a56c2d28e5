//! Tag-merge helpers for the external customer record.
//!
//! Repeated syncs must not grow the tag set without bound: every managed
//! namespace prefix is stripped before the current values are re-added, and
//! funnel stage tags are mutually exclusive.

use serde::{Deserialize, Serialize};

/// Namespace prefixes owned by this subsystem on the external record.
pub const MANAGED_PREFIXES: &[&str] = &["tier:", "state:", "store:"];

/// Mutually exclusive conversion-funnel stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunnelStage {
    Requested,
    Redeemed,
    PurchaseIntent,
    ConvertedInStore,
    ConvertedOnline,
}

impl FunnelStage {
    /// Every known stage, used to strip competitors before tagging.
    pub const ALL: [FunnelStage; 5] = [
        FunnelStage::Requested,
        FunnelStage::Redeemed,
        FunnelStage::PurchaseIntent,
        FunnelStage::ConvertedInStore,
        FunnelStage::ConvertedOnline,
    ];

    /// The tag literal written to the external record.
    pub fn as_tag(&self) -> &'static str {
        match self {
            FunnelStage::Requested => "requested",
            FunnelStage::Redeemed => "redeemed",
            FunnelStage::PurchaseIntent => "purchase-intent",
            FunnelStage::ConvertedInStore => "converted-in-store",
            FunnelStage::ConvertedOnline => "converted-online",
        }
    }
}

fn is_managed(tag: &str) -> bool {
    MANAGED_PREFIXES
        .iter()
        .any(|prefix| tag.starts_with(prefix))
}

/// Merge the current managed values into an existing tag set.
///
/// Previously written managed-namespace tags are stripped and the fresh
/// values appended, so syncing twice with identical inputs yields an
/// identical, duplicate-free set.
///
/// # Examples
/// ```
/// use activation_backend::domain::crm::tags::merge_managed;
///
/// let existing = vec!["vip".to_owned(), "store:S-0".to_owned()];
/// let fresh = vec!["store:S-1".to_owned(), "state:CA".to_owned()];
/// let merged = merge_managed(&existing, &fresh);
/// assert_eq!(merged, vec!["vip", "store:S-1", "state:CA"]);
/// ```
pub fn merge_managed(existing: &[String], fresh: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + fresh.len());
    for tag in existing {
        if !is_managed(tag) && !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    for tag in fresh {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Replace any funnel stage tag with the given stage.
///
/// Every member of the known stage set is removed before the new stage tag
/// is appended, guaranteeing at most one active stage tag.
pub fn replace_stage(existing: &[String], stage: FunnelStage) -> Vec<String> {
    let mut merged: Vec<String> = existing
        .iter()
        .filter(|tag| !FunnelStage::ALL.iter().any(|s| s.as_tag() == tag.as_str()))
        .cloned()
        .collect();
    merged.push(stage.as_tag().to_owned());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn merge_is_idempotent() {
        let fresh = tags(&["store:S-1", "state:CA", "tier:gold"]);
        let once = merge_managed(&tags(&["vip"]), &fresh);
        let twice = merge_managed(&once, &fresh);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_caps_growth_across_repeated_syncs() {
        let mut current = tags(&["vip"]);
        for n in 0..10 {
            let fresh = tags(&[&format!("store:S-{n}"), "state:CA"]);
            current = merge_managed(&current, &fresh);
        }
        assert_eq!(current, tags(&["vip", "store:S-9", "state:CA"]));
    }

    #[test]
    fn merge_preserves_unmanaged_tags() {
        let merged = merge_managed(&tags(&["wholesale", "tier:silver"]), &tags(&["tier:gold"]));
        assert_eq!(merged, tags(&["wholesale", "tier:gold"]));
    }

    #[test]
    fn merge_drops_duplicates() {
        let merged = merge_managed(&tags(&["vip", "vip"]), &tags(&["store:S-1", "store:S-1"]));
        assert_eq!(merged, tags(&["vip", "store:S-1"]));
    }

    #[test]
    fn stage_tags_are_mutually_exclusive() {
        let existing = tags(&["requested", "vip", "purchase-intent"]);
        let replaced = replace_stage(&existing, FunnelStage::Redeemed);
        assert_eq!(replaced, tags(&["vip", "redeemed"]));
    }

    #[test]
    fn stage_replacement_is_idempotent() {
        let once = replace_stage(&tags(&["vip"]), FunnelStage::ConvertedInStore);
        let twice = replace_stage(&once, FunnelStage::ConvertedInStore);
        assert_eq!(once, twice);
    }
}
