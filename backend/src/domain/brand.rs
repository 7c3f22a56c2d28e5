//! Brand tenant account and its CRM credentials.

use url::Url;

use super::ids::{BrandId, Sku};
use super::vault::EncryptedCredential;

/// Brand-side contact notified when one of its displays is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContact {
    pub email: String,
    pub phone: Option<String>,
}

/// Brand-scoped catalogue entry. Read-only input to activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub sku: Sku,
    pub title: String,
}

/// Per-brand connection details for the external customer API.
///
/// The token is stored encrypted at rest and only decrypted by the vault at
/// the moment a sync runs.
#[derive(Debug, Clone)]
pub struct CrmCredentials {
    /// Base URL of the brand's customer API; must end with a trailing slash
    /// so relative endpoint paths join correctly.
    pub api_base: Url,
    pub encrypted_token: EncryptedCredential,
}

/// A tenant organisation with its own CRM credentials and catalogue.
#[derive(Debug, Clone)]
pub struct BrandAccount {
    pub id: BrandId,
    pub name: String,
    pub owner_contact: OwnerContact,
    pub catalogue: Vec<Product>,
    pub crm: Option<CrmCredentials>,
}

impl BrandAccount {
    /// Whether a SKU is part of this brand's catalogue.
    ///
    /// An empty catalogue means the catalogue has not been loaded, and SKU
    /// checks are skipped.
    pub fn carries_sku(&self, sku: &Sku) -> bool {
        self.catalogue.is_empty() || self.catalogue.iter().any(|product| &product.sku == sku)
    }
}
