//! Domain entities, services, and ports.
//!
//! Purpose: define the strongly typed model of displays, stores, brands, and
//! ledgers, the activation orchestration service, the CRM sync service, and
//! the credential vault. Types here are transport agnostic; inbound adapters
//! map them onto HTTP and outbound adapters implement the ports.

pub mod activation;
pub mod brand;
pub mod crm;
pub mod display;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod ports;
pub mod store;
pub mod vault;

pub use self::brand::{BrandAccount, CrmCredentials, OwnerContact, Product};
pub use self::display::{Display, DisplayStatus};
pub use self::error::{Error, ErrorCode};
pub use self::ids::{BrandId, DisplayId, IdValidationError, Sku, StoreId};
pub use self::ledger::{
    CreditTransactionKind, InventoryLevel, InventoryTransaction, InventoryTransactionKind,
    StoreCreditTransaction,
};
pub use self::store::{FollowupDays, PromoConfig, Store, StoreContact, StorePatch};
pub use self::vault::{CredentialVault, EncryptedCredential, MasterSecret};
