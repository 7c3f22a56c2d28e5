//! Display activation backend.
//!
//! This crate turns a physical display unit into a live store record while
//! keeping the local inventory/credit ledger and the external CRM consistent
//! under retries and partial failure. The code is organised as a hexagon:
//! `domain` holds entities, services, and ports; `inbound` adapts HTTP
//! requests onto driving ports; `outbound` implements driven ports against
//! in-process storage and the external customer API.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
