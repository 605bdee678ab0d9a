use log::info;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::model::OtpCode;

use super::{
    error::{Result, SandboxError},
    state::Sandbox,
};

pub fn routes() -> Vec<Route> {
    routes![request_otp, confirm]
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    reg_no: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpConfirmation {
    reg_no: String,
    otp: String,
}

#[derive(Debug, Serialize)]
pub struct OtpSent {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verified {
    message: String,
    ballot_token: String,
}

fn registration_number(reg_no: &str) -> Result<&str> {
    let reg_no = reg_no.trim();
    if reg_no.is_empty() {
        Err(SandboxError::bad_request("Registration number is required"))
    } else {
        Ok(reg_no)
    }
}

/// The sandbox has no mail server: the OTP goes to the log.
#[post("/verify/request-otp", data = "<request>", format = "json")]
async fn request_otp(request: Json<OtpRequest>, sandbox: &State<Sandbox>) -> Result<Json<OtpSent>> {
    let reg_no = registration_number(&request.reg_no)?;
    let otp = sandbox.issue_otp(reg_no);
    info!("OTP for {reg_no}: {otp}");
    Ok(Json(OtpSent {
        message: "OTP sent to your registered email".to_string(),
    }))
}

#[post("/verify/confirm", data = "<request>", format = "json")]
async fn confirm(request: Json<OtpConfirmation>, sandbox: &State<Sandbox>) -> Result<Json<Verified>> {
    let reg_no = registration_number(&request.reg_no)?;
    let otp = request
        .otp
        .parse::<OtpCode>()
        .map_err(|e| SandboxError::bad_request(format!("Invalid OTP: {e}")))?;
    if !sandbox.redeem_otp(reg_no, &otp) {
        return Err(SandboxError::bad_request("Invalid or expired OTP"));
    }
    Ok(Json(Verified {
        message: "Verification successful".to_string(),
        ballot_token: sandbox.issue_token(),
    }))
}
