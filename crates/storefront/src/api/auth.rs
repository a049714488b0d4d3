//! Credential issuance and account lifecycle endpoints.

use serde_json::json;
use tracing::instrument;

use greengate_core::RegistrationId;

use super::types::{
    LoginResponse, RegisterProviderRequest, RegisterRequest, RegistrationStatusResponse,
    extract_registration_id,
};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with the server's message on rejected
    /// credentials, or `ApiError::Decode` if no token is in the response.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        let value = self.post("auth/login/", None, &body).await?;
        LoginResponse::from_value(&value)
    }

    /// Register a buyer account. The backend does not auto-login; callers
    /// send the user through the login form afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with field-level validation messages.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode {
            detail: format!("register payload: {e}"),
        })?;
        self.post("auth/register/", None, &body).await?;
        Ok(())
    }

    /// Register a provider (farm) account, which requires manual approval.
    /// Returns the registration ID used for approval polling.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` on validation failure, `ApiError::Decode` if
    /// the response carries no registration ID.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_provider(
        &self,
        request: &RegisterProviderRequest,
    ) -> Result<RegistrationId, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode {
            detail: format!("provider registration payload: {e}"),
        })?;
        let value = self.post("auth/register-provider/", None, &body).await?;
        extract_registration_id(&value)
    }

    /// Poll the approval status of a provider registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self))]
    pub async fn registration_status(
        &self,
        id: RegistrationId,
    ) -> Result<RegistrationStatusResponse, ApiError> {
        let value = self
            .get(&format!("auth/registration-status/{id}/"), None)
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            detail: format!("registration status: {e}"),
        })
    }

    /// Request a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. The backend responds 200 even
    /// for unknown addresses, so a success here never confirms an account.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email });
        self.post("auth/password-reset/", None, &body).await?;
        Ok(())
    }

    /// Complete a password reset using the uid/token pair from the email link.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` if the token is expired or the password is
    /// rejected.
    #[instrument(skip(self, new_password))]
    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "password": new_password });
        self.post(
            &format!("auth/password-reset-confirm/{uid}/{token}/"),
            None,
            &body,
        )
        .await?;
        Ok(())
    }
}
