use std::fs;

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Build, Data, Orbit, Request, Response, Rocket,
};

pub use crate::logging::RequestId;
use crate::model::Ballot;

use super::state::{Sandbox, SandboxConfig};

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// Logs every request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Sandbox listening on http://{ip}:{port}{}", super::BASE);
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        let method = req.method();
        // The query carries the ballot token.
        let path = req.uri().path();
        info!("->req{id} {method} {path}");
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let code = res.status();
        let route = match req.route() {
            Some(r) => match r.name {
                Some(ref name) => format!("{name} ({})", r.uri),
                None => r.uri.to_string(),
            },
            None => "UNKNOWN ROUTE".to_string(),
        };
        let log_msg = format!("<-rsp{id} {code} {route}");
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}

/// Loads the ballot fixture and places the [`Sandbox`] into managed state.
pub struct SandboxFairing;

#[rocket::async_trait]
impl Fairing for SandboxFairing {
    fn info(&self) -> Info {
        Info {
            name: "Sandbox",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<SandboxConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load sandbox config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let ballot = match config.sandbox_ballot {
            None => {
                info!("No `sandbox_ballot` configured, serving the example ballot");
                Ballot::example()
            }
            Some(path) => {
                let parsed = fs::read(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        serde_json::from_slice::<Ballot>(&bytes).map_err(|e| e.to_string())
                    });
                match parsed {
                    Ok(ballot) => ballot,
                    Err(e) => {
                        error!("Failed to load ballot from {}: {e}", path.display());
                        return Err(rocket);
                    }
                }
            }
        };
        info!(
            "Serving a ballot with {} positions and {} candidates",
            ballot.positions.len(),
            ballot.candidates.len()
        );

        Ok(rocket.manage(Sandbox::new(ballot)))
    }
}
