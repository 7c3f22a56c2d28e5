//! Reqwest-backed customer API adapter.
//!
//! This adapter owns transport details only: URL construction against the
//! per-brand base, bearer authentication, timeout and HTTP error mapping,
//! and JSON decoding into domain customer shapes. Sync semantics live in the
//! domain service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::dto::{
    CreateCustomerDto, CustomerDto, FieldValueDto, SearchResponseDto, UpdateCustomerDto,
};
use crate::domain::ports::{
    CrmApiError, CrmCustomer, CrmCustomerApi, CrmCustomerDraft, CrmCustomerUpdate, CrmEndpoint,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Customer API adapter performing authenticated HTTP calls against one
/// brand endpoint per call.
pub struct CrmHttpApi {
    client: Client,
}

impl CrmHttpApi {
    /// Build an adapter using a reqwest client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &CrmEndpoint,
        url: Url,
    ) -> Result<Option<T>, CrmApiError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&endpoint.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let decoded = serde_json::from_slice(body.as_ref())
            .map_err(|err| CrmApiError::decode(format!("invalid customer payload: {err}")))?;
        Ok(Some(decoded))
    }

    async fn send_json<B: serde::Serialize>(
        &self,
        endpoint: &CrmEndpoint,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> Result<Vec<u8>, CrmApiError> {
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&endpoint.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CrmCustomerApi for CrmHttpApi {
    async fn search_by_email(
        &self,
        endpoint: &CrmEndpoint,
        email: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError> {
        let mut url = join_path(&endpoint.api_base, "customers/search")?;
        url.query_pairs_mut().append_pair("email", email);
        let decoded: Option<SearchResponseDto> = self.get_json(endpoint, url).await?;
        Ok(decoded
            .and_then(|envelope| envelope.customers.into_iter().next())
            .map(CrmCustomer::from))
    }

    async fn fetch(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
    ) -> Result<Option<CrmCustomer>, CrmApiError> {
        let url = join_path(&endpoint.api_base, &format!("customers/{id}"))?;
        let decoded: Option<CustomerDto> = self.get_json(endpoint, url).await?;
        Ok(decoded.map(CrmCustomer::from))
    }

    async fn create(
        &self,
        endpoint: &CrmEndpoint,
        draft: &CrmCustomerDraft,
    ) -> Result<String, CrmApiError> {
        let url = join_path(&endpoint.api_base, "customers")?;
        let body = CreateCustomerDto::from(draft);
        let bytes = self
            .send_json(endpoint, reqwest::Method::POST, url, &body)
            .await?;
        let created: CustomerDto = serde_json::from_slice(bytes.as_ref())
            .map_err(|err| CrmApiError::decode(format!("invalid creation response: {err}")))?;
        Ok(created.id)
    }

    async fn update(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        update: &CrmCustomerUpdate,
    ) -> Result<(), CrmApiError> {
        let url = join_path(&endpoint.api_base, &format!("customers/{id}"))?;
        let body = UpdateCustomerDto::from(update);
        self.send_json(endpoint, reqwest::Method::PATCH, url, &body)
            .await?;
        Ok(())
    }

    async fn read_field(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        key: &str,
    ) -> Result<Option<String>, CrmApiError> {
        let url = join_path(&endpoint.api_base, &format!("customers/{id}/fields/{key}"))?;
        let decoded: Option<FieldValueDto> = self.get_json(endpoint, url).await?;
        Ok(decoded.and_then(|field| field.value))
    }

    async fn write_field(
        &self,
        endpoint: &CrmEndpoint,
        id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CrmApiError> {
        let url = join_path(&endpoint.api_base, &format!("customers/{id}/fields/{key}"))?;
        let body = FieldValueDto {
            value: Some(value.to_owned()),
        };
        self.send_json(endpoint, reqwest::Method::PUT, url, &body)
            .await?;
        Ok(())
    }
}

fn join_path(base: &Url, path: &str) -> Result<Url, CrmApiError> {
    base.join(path)
        .map_err(|err| CrmApiError::invalid_request(format!("malformed API path {path}: {err}")))
}

fn map_transport_error(error: reqwest::Error) -> CrmApiError {
    if error.is_timeout() {
        CrmApiError::timeout(error.to_string())
    } else {
        CrmApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CrmApiError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => CrmApiError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CrmApiError::timeout(message),
        _ if status.is_client_error() => CrmApiError::invalid_request(message),
        _ => CrmApiError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
