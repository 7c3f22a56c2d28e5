//! Process-local implementations of the persistence ports.
//!
//! Each adapter guards its state with a single mutex so multi-step updates
//! (claim checks, target application, the grant-once credit flag) are atomic
//! with respect to concurrent requests. A poisoned lock surfaces as the
//! port's connection error rather than a panic.

mod brands;
mod credits;
mod crm_links;
mod displays;
mod inventory;
mod stores;

pub use self::brands::InMemoryBrands;
pub use self::credits::InMemoryCredits;
pub use self::crm_links::InMemoryCrmLinks;
pub use self::displays::InMemoryDisplays;
pub use self::inventory::InMemoryInventory;
pub use self::stores::InMemoryStores;
