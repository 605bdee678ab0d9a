use log::debug;
use rocket::{http::Status, response::Responder, serde::json::Json, Request};

use crate::api::ApiErrorBody;

pub type Result<T> = std::result::Result<T, SandboxError>;

/// A rejection sent as a JSON [`ApiErrorBody`].
#[derive(Debug)]
pub struct SandboxError {
    pub status: Status,
    pub body: ApiErrorBody,
}

impl SandboxError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: Status::BadRequest,
            body: ApiErrorBody::message(error),
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.body = self.body.with_code(code);
        self
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for SandboxError {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        debug!("Rejecting request: {:?}", self.body);
        (self.status, Json(self.body)).respond_to(req)
    }
}
