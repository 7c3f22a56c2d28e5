//! Outbound driven adapters.
//!
//! Purpose: implement the domain ports against concrete infrastructure. The
//! `memory` adapters back the repositories and ledgers with process-local
//! state; `crm` speaks HTTP to the external customer API; `notify` hands
//! notification sends to the channel provider.

pub mod crm;
pub mod memory;
pub mod notify;
