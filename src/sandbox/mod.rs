//! An in-memory stand-in for the VoteSphere backend, serving the ballot, vote
//! and OTP endpoints under `/api`.

use rocket::{figment::Figment, Build, Rocket, Route};

mod error;
mod fairing;
mod state;
mod verify;
mod vote;

pub use error::SandboxError;
pub use fairing::{LoggerFairing, RequestId, SandboxFairing};
pub use state::{RecordedVote, Sandbox, SandboxConfig};

/// Mount point of every sandbox route.
pub const BASE: &str = "/api";

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(vote::routes());
    routes.extend(verify::routes());
    routes
}

/// Build the sandbox from Rocket's default configuration sources.
pub fn build() -> Rocket<Build> {
    build_from(rocket::Config::figment())
}

/// Build the sandbox from an explicit configuration.
pub fn build_from(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .mount(BASE, routes())
        .attach(LoggerFairing)
        .attach(SandboxFairing)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };
    use serde_json::{json, Value};

    use crate::api::classify::{BALLOT_ALREADY_USED, INVALID_TOKEN, VOTING_CLOSED};
    use crate::model::{Ballot, Position};

    use super::*;

    async fn client() -> Client {
        Client::tracked(build_from(rocket::Config::figment()))
            .await
            .unwrap()
    }

    fn sandbox(client: &Client) -> &Sandbox {
        client.rocket().state::<Sandbox>().unwrap()
    }

    async fn post(client: &Client, uri: &str, body: Value) -> (Status, Value) {
        let response = client
            .post(uri)
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        let status = response.status();
        let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(client: &Client, uri: &str) -> (Status, Value) {
        let response = client.get(uri).dispatch().await;
        let status = response.status();
        let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    fn full_ballot(token: &str) -> Value {
        json!({
            "token": token,
            "votes": [
                { "positionId": "pos-president", "candidateId": "cand-alice" },
                { "positionId": "pos-secretary", "candidateId": "cand-carol" },
            ]
        })
    }

    #[rocket::async_test]
    async fn ballot_requires_known_token() {
        let client = client().await;

        let (status, body) = get(&client, "/api/vote/ballot?token=nope").await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], INVALID_TOKEN);

        let token = sandbox(&client).issue_token();
        let (status, body) = get(&client, &format!("/api/vote/ballot?token={token}")).await;
        assert_eq!(status, Status::Ok);
        let ballot: Ballot = serde_json::from_value(body).unwrap();
        assert_eq!(ballot, Ballot::example());
    }

    #[rocket::async_test]
    async fn vote_is_recorded_once() {
        let client = client().await;
        let token = sandbox(&client).issue_token();

        let (status, body) = post(&client, "/api/vote", full_ballot(&token)).await;
        assert_eq!(status, Status::Ok);
        assert!(body["message"].is_string());
        assert_eq!(sandbox(&client).recorded_votes().len(), 2);

        let (status, body) = post(&client, "/api/vote", full_ballot(&token)).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], BALLOT_ALREADY_USED);
        assert_eq!(body["error"], "Ballot already used");

        let (status, body) = get(&client, &format!("/api/vote/ballot?token={token}")).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], BALLOT_ALREADY_USED);
        assert_eq!(sandbox(&client).recorded_votes().len(), 2);
    }

    #[rocket::async_test]
    async fn incomplete_or_foreign_votes_rejected() {
        let client = client().await;
        let token = sandbox(&client).issue_token();

        let (status, body) = post(
            &client,
            "/api/vote",
            json!({
                "token": token,
                "votes": [{ "positionId": "pos-president", "candidateId": "cand-alice" }]
            }),
        )
        .await;
        assert_eq!(status, Status::BadRequest);
        assert!(body["error"].as_str().unwrap().contains("General Secretary"));

        let (status, _) = post(
            &client,
            "/api/vote",
            json!({
                "token": token,
                "votes": [
                    { "positionId": "pos-president", "candidateId": "cand-carol" },
                    { "positionId": "pos-secretary", "candidateId": "cand-david" },
                ]
            }),
        )
        .await;
        assert_eq!(status, Status::BadRequest);

        // Rejected ballots leave the token usable.
        let (status, _) = post(&client, "/api/vote", full_ballot(&token)).await;
        assert_eq!(status, Status::Ok);
    }

    #[rocket::async_test]
    async fn closed_window_names_positions() {
        let mut ballot = Ballot::example();
        ballot.positions[0].voting_closes = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        let sandbox = Sandbox::new(ballot);
        let token = sandbox.issue_token();
        let rocket = rocket::custom(rocket::Config::figment())
            .mount(BASE, routes())
            .manage(sandbox);
        let client = Client::tracked(rocket).await.unwrap();

        let (status, body) = post(&client, "/api/vote", full_ballot(&token)).await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], VOTING_CLOSED);
        assert_eq!(body["error"], "Position(s) not open for voting");
        assert_eq!(body["closedPositions"], json!([{ "name": "President" }]));
        assert!(body["hint"].is_string());
    }

    #[rocket::async_test]
    async fn otp_round_trip_issues_token() {
        let client = client().await;

        let (status, _) = post(
            &client,
            "/api/verify/request-otp",
            json!({ "reg_no": "2021/BSE/001" }),
        )
        .await;
        assert_eq!(status, Status::Ok);
        let otp = sandbox(&client).pending_otp("2021/BSE/001").unwrap();

        let (status, body) = post(
            &client,
            "/api/verify/confirm",
            json!({ "reg_no": "2021/BSE/001", "otp": "000000x" }),
        )
        .await;
        assert_eq!(status, Status::BadRequest);
        assert!(body["error"].is_string());

        let (status, body) = post(
            &client,
            "/api/verify/confirm",
            json!({ "reg_no": "2021/BSE/001", "otp": otp.to_string() }),
        )
        .await;
        assert_eq!(status, Status::Ok);
        let token = body["ballotToken"].as_str().unwrap().to_string();
        let (status, _) = get(&client, &format!("/api/vote/ballot?token={token}")).await;
        assert_eq!(status, Status::Ok);

        // One OTP, one token.
        let (status, _) = post(
            &client,
            "/api/verify/confirm",
            json!({ "reg_no": "2021/BSE/001", "otp": otp.to_string() }),
        )
        .await;
        assert_eq!(status, Status::BadRequest);
    }

    #[rocket::async_test]
    async fn fixture_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.json");
        let ballot = Ballot {
            positions: vec![Position::example("pos-treasurer", "Treasurer")],
            candidates: vec![],
        };
        std::fs::write(&path, serde_json::to_vec(&ballot).unwrap()).unwrap();

        let figment = rocket::Config::figment().merge(("sandbox_ballot", &path));
        let client = Client::tracked(build_from(figment)).await.unwrap();

        let token = sandbox(&client).issue_token();
        let (status, body) = get(&client, &format!("/api/vote/ballot?token={token}")).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(serde_json::from_value::<Ballot>(body).unwrap(), ballot);
    }

    #[rocket::async_test]
    async fn bad_fixture_aborts_ignite() {
        let figment = rocket::Config::figment().merge(("sandbox_ballot", "/nonexistent/ballot.json"));
        assert!(Client::tracked(build_from(figment)).await.is_err());
    }
}
