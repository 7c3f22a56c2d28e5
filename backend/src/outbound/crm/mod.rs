//! Reqwest-backed adapter for the external customer API.

mod dto;
mod http_api;

pub use self::http_api::CrmHttpApi;
