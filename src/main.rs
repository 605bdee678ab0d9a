use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Errors that are critical to the entire server.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Rocket(#[from] RocketError),
}

async fn run() -> Result<(), Error> {
    info!("Configuring sandbox...");
    let rocket = votesphere_client::sandbox::build().ignite().await?;
    info!("...sandbox configured!");
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    if let Err(err) = votesphere_client::logging::init(None, LevelFilter::Info) {
        eprintln!("{err}");
        std::process::exit(1)
    }
    info!("Initialised logging");

    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
