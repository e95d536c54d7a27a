//! The authenticated request client: optimistic credential reuse with a
//! single forced re-proof on rejection.
//!
//! Every payment-gated call in the pipeline routes through
//! [`AuthClient::execute`] instead of re-implementing the retry dance at the
//! call site. The strategy avoids a wallet-signing prompt on every request
//! while still self-healing when a credential expires:
//!
//! 1. a cached credential is cheaply verified and attached;
//! 2. on rejection (or no cache), the identity is re-proved, the proof is
//!    exchanged for a fresh credential, and the request is sent exactly once
//!    more;
//! 3. a second rejection surfaces [`AuthError::Unauthenticated`], never a
//!    third attempt.

use std::sync::Arc;

use serde::Deserialize;

use jailpool_types::{PublicKey, SessionCredential, SignedAuthProof};

use crate::credential_store::CredentialStore;
use crate::error::AuthError;
use crate::prover::IdentityProver;
use crate::transport::{ApiRequest, ApiResponse, RequestAuth, Transport};

/// Proof-for-token exchange endpoint.
pub const AUTH_TOKEN_PATH: &str = "/auth/token";
/// Cheap credential validity check.
pub const AUTH_VERIFY_PATH: &str = "/auth/verify";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Executes requests on behalf of one active identity, managing the session
/// credential lifecycle transparently.
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    prover: IdentityProver,
    store: CredentialStore,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        prover: IdentityProver,
        store: CredentialStore,
    ) -> Self {
        Self {
            transport,
            prover,
            store,
        }
    }

    /// The shared credential store (cleared on disconnect by the session).
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Execute `request` as `identity`, attaching and renewing the session
    /// credential as needed.
    pub async fn execute(
        &self,
        request: ApiRequest,
        identity: &PublicKey,
    ) -> Result<ApiResponse, AuthError> {
        if let Some(cached) = self.store.get(identity) {
            if self.verify(&cached).await? {
                let response = self
                    .transport
                    .execute(request.clone(), RequestAuth::Token(cached))
                    .await?;
                if !response.is_unauthorized() {
                    return Ok(response);
                }
                tracing::debug!(path = %request.path, "credential rejected, re-proving identity");
            } else {
                tracing::debug!("cached credential failed verification");
            }
            self.store.clear();
        }

        let credential = self.refresh_credential(identity).await?;
        let response = self
            .transport
            .execute(request, RequestAuth::Token(credential))
            .await?;
        if response.is_unauthorized() {
            return Err(AuthError::Unauthenticated);
        }
        Ok(response)
    }

    /// Prove the identity and exchange the proof for a fresh credential,
    /// storing it for subsequent requests.
    pub async fn refresh_credential(
        &self,
        identity: &PublicKey,
    ) -> Result<SessionCredential, AuthError> {
        let proof = self.prover.prove(identity).await?;
        let credential = self.exchange(proof).await?;
        self.store.put(credential.clone());
        Ok(credential)
    }

    /// Cheap validity check for a cached credential (`GET /auth/verify`).
    async fn verify(&self, credential: &SessionCredential) -> Result<bool, AuthError> {
        let request = ApiRequest::get(AUTH_VERIFY_PATH)
            .with_header("address", credential.identity.to_base58());
        let response = self
            .transport
            .execute(request, RequestAuth::Token(credential.clone()))
            .await?;
        Ok(response.is_success())
    }

    /// Exchange a one-shot proof for a session credential
    /// (`POST /auth/token`).
    async fn exchange(&self, proof: SignedAuthProof) -> Result<SessionCredential, AuthError> {
        let identity = proof.identity;
        let request = ApiRequest::post(AUTH_TOKEN_PATH, serde_json::json!({}));
        let response = self
            .transport
            .execute(request, RequestAuth::Proof(proof))
            .await?;

        if response.is_unauthorized() {
            // A rejected proof cannot be retried: the challenge is one-shot.
            return Err(AuthError::Unauthenticated);
        }
        if !response.is_success() {
            return Err(AuthError::InvalidTokenResponse(format!(
                "status {}",
                response.status
            )));
        }

        let body: TokenResponse = response
            .json()
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        Ok(SessionCredential::new(body.token, identity))
    }
}
