//! Destination address updates pushed by the dynamic DNS notifier

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay64_extract::extract_ipv6;
use relay64_store::{AddressStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Reasons an update is rejected
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: the body did not contain an IPv6 address.")]
    NoAddressFound,

    #[error("Failed to save IPv6 address")]
    Persistence(#[source] StoreError),
}

impl UpdateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpdateError::Unauthorized => StatusCode::UNAUTHORIZED,
            UpdateError::NoAddressFound => StatusCode::BAD_REQUEST,
            UpdateError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UpdateError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Validates the bearer token and swaps the destination address
pub struct UpdateHandler {
    /// Full expected `Authorization` header value
    expected_authorization: String,
    store: Arc<AddressStore>,
}

impl UpdateHandler {
    pub fn new(token: impl AsRef<str>, store: Arc<AddressStore>) -> Self {
        Self {
            expected_authorization: format!("Bearer {}", token.as_ref()),
            store,
        }
    }

    /// Exact match against `Bearer <token>`; no prefix or case folding
    pub fn is_authorized(&self, authorization: Option<&str>) -> bool {
        authorization == Some(self.expected_authorization.as_str())
    }

    /// Apply an update request
    ///
    /// Returns the accepted address. When persisting fails the in-memory
    /// address has already changed and stays changed.
    pub async fn handle(
        &self,
        authorization: Option<&str>,
        payload: &str,
    ) -> Result<String, UpdateError> {
        if !self.is_authorized(authorization) {
            debug!("Rejected update with invalid or missing bearer token");
            return Err(UpdateError::Unauthorized);
        }

        let Some(address) = extract_ipv6(payload) else {
            warn!(
                "Did not find a valid IPv6 address in the request body: '{}'",
                payload
            );
            return Err(UpdateError::NoAddressFound);
        };
        info!("Found an IP address in the request body: {}", address);

        if let Err(e) = self.store.write(address).await {
            error!("Failed to persist IPv6 address {}: {}", address, e);
            return Err(UpdateError::Persistence(e));
        }

        info!("IPv6 address updated to {}", address);
        Ok(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay64_store::{Mapping, MemoryAddressPersistence};

    fn handler() -> (UpdateHandler, Arc<AddressStore>) {
        let store = Arc::new(AddressStore::new(
            "2001:db8::1",
            vec![Mapping::new(8080, 80)],
            Arc::new(MemoryAddressPersistence::new()),
        ));
        (UpdateHandler::new("secret", store.clone()), store)
    }

    #[test]
    fn test_token_must_match_exactly() {
        let (handler, _) = handler();

        assert!(handler.is_authorized(Some("Bearer secret")));
        assert!(!handler.is_authorized(None));
        assert!(!handler.is_authorized(Some("Bearer wrong")));
        assert!(!handler.is_authorized(Some("Bearer secret2")));
        assert!(!handler.is_authorized(Some("Bearer secre")));
        assert!(!handler.is_authorized(Some("bearer secret")));
        assert!(!handler.is_authorized(Some("Bearer  secret")));
        assert!(!handler.is_authorized(Some("secret")));
    }

    #[tokio::test]
    async fn test_update_sets_extracted_address() {
        let (handler, store) = handler();

        let accepted = handler
            .handle(Some("Bearer secret"), "update: 2001:db8::42 done")
            .await
            .unwrap();

        assert_eq!(accepted, "2001:db8::42");
        assert_eq!(store.address().await, "2001:db8::42");
    }

    #[tokio::test]
    async fn test_wrong_token_never_changes_store() {
        let (handler, store) = handler();

        for body in ["2001:db8::42", "", "fe80::1%eth0 ::"] {
            let err = handler.handle(Some("Bearer wrong"), body).await.unwrap_err();
            assert!(matches!(err, UpdateError::Unauthorized));
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }

        assert_eq!(store.address().await, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_body_without_address_is_rejected() {
        let (handler, store) = handler();

        let err = handler
            .handle(Some("Bearer secret"), "no address in here")
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::NoAddressFound));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(store.address().await, "2001:db8::1");
    }
}
