//! Client for the OTP endpoints that trade a registration number for a ballot
//! token.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::model::{BallotToken, OtpCode};
use crate::store::TokenStore;

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    reg_no: &'a str,
}

#[derive(Debug, Serialize)]
struct OtpConfirmation<'a> {
    reg_no: &'a str,
    otp: OtpCode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Verified {
    ballot_token: BallotToken,
}

/// Runs the two-step OTP verification and fills the persistence slot.
pub struct Verifier<S> {
    client: ApiClient,
    store: S,
    token_key: String,
}

impl<S: TokenStore> Verifier<S> {
    pub fn new(config: &ClientConfig, store: S) -> Result<Self> {
        let client = ApiClient::new(config).map_err(rejection)?;
        Ok(Self {
            client,
            store,
            token_key: config.token_key().to_string(),
        })
    }

    /// Ask the backend to send an OTP to the voter registered as `reg_no`.
    pub async fn request_otp(&self, reg_no: &str) -> Result<()> {
        let reg_no = reg_no.trim();
        if reg_no.is_empty() {
            return Err(Error::Otp("Registration number is required".to_string()));
        }
        self.client
            .post("/verify/request-otp", &OtpRequest { reg_no })
            .await
            .map_err(rejection)?;
        info!("OTP requested");
        Ok(())
    }

    /// Confirm the OTP, store the issued ballot token and return it.
    pub async fn confirm_otp(&self, reg_no: &str, otp: &OtpCode) -> Result<BallotToken> {
        let body = OtpConfirmation {
            reg_no: reg_no.trim(),
            otp: *otp,
        };
        let verified: Verified = self
            .client
            .post_json("/verify/confirm", &body)
            .await
            .map_err(rejection)?;
        self.store
            .set(&self.token_key, verified.ballot_token.expose())?;
        info!("Identity verified, ballot token stored");
        Ok(verified.ballot_token)
    }
}

fn rejection(err: ApiError) -> Error {
    warn!("Verification request failed: {err}");
    match err {
        ApiError::Rejected { status, body } => {
            Error::Otp(body.error.unwrap_or_else(|| format!("HTTP {status}")))
        }
        other => Error::Otp(other.to_string()),
    }
}
