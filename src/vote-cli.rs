//! A terminal front end for casting a VoteSphere ballot.
//! Verifies the voter by OTP, shows the ballot and casts the votes in one go.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use votesphere_client::{
    model::{BallotToken, OtpCode},
    session::{Advisory, BallotSession, SessionState},
    verification::Verifier,
    ClientConfig, Error, FileStore, HttpBallotApi,
};

const PROGRAM_NAME: &str = "vote-cli";

const ABOUT_TEXT: &str = "Cast a ballot in a VoteSphere election.

EXIT CODES:
     0: Success.
     1: Error.
     2: The ballot token is missing, invalid or used. Verify again.";

const CONFIG: &str = "CONFIG";
const TOKEN: &str = "TOKEN";
const REG_NO: &str = "REG_NO";
const OTP: &str = "OTP";
const CHOICE: &str = "CHOICE";

const REQUEST_OTP: &str = "request-otp";
const CONFIRM: &str = "confirm";
const BALLOT: &str = "ballot";
const VOTE: &str = "vote";

const CHOICE_HELP: &str = "A vote, as <POSITION_ID>=<CANDIDATE_ID>.\n\
Every position on the ballot needs exactly one.";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(CONFIG)
                .long("config")
                .help("Configuration file to use instead of VoteSphere.toml")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new(TOKEN)
                .long("token")
                .help("Ballot token to use instead of the stored one")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new(REQUEST_OTP)
                .about("Send a one-time password to the voter's registered email")
                .arg(Arg::new(REG_NO).required(true)),
        )
        .subcommand(
            Command::new(CONFIRM)
                .about("Confirm the one-time password and store a ballot token")
                .arg(Arg::new(REG_NO).required(true))
                .arg(
                    Arg::new(OTP)
                        .required(true)
                        .value_parser(|s: &str| s.parse::<OtpCode>()),
                ),
        )
        .subcommand(Command::new(BALLOT).about("Show the positions and candidates"))
        .subcommand(
            Command::new(VOTE).about("Cast the ballot").arg(
                Arg::new(CHOICE)
                    .long("choice")
                    .short('c')
                    .help(CHOICE_HELP)
                    .action(ArgAction::Append)
                    .required(true)
                    .value_parser(parse_choice),
            ),
        )
}

/// Split `position=candidate`.
fn parse_choice(choice: &str) -> Result<(String, String), String> {
    match choice.split_once('=') {
        Some((position, candidate)) if !position.is_empty() && !candidate.is_empty() => {
            Ok((position.to_string(), candidate.to_string()))
        }
        _ => Err(format!(
            "expected <POSITION_ID>=<CANDIDATE_ID>, found \"{choice}\""
        )),
    }
}

type Session = BallotSession<HttpBallotApi, FileStore>;

fn session(config: &ClientConfig) -> Result<Session, Error> {
    let api = HttpBallotApi::new(config).map_err(|e| Error::Config(e.to_string()))?;
    let store = FileStore::new(config.token_file());
    Ok(BallotSession::with_token_key(api, store, config.token_key()))
}

fn print_ballot(session: &Session, config: &ClientConfig) {
    let ballot = session.ballot();
    for position in &ballot.positions {
        println!("{} [{}]", position.name, position.id);
        match (position.voting_opens, position.voting_closes) {
            (Some(opens), Some(closes)) => println!("  voting {opens} to {closes}"),
            (Some(opens), None) => println!("  voting from {opens}"),
            (None, Some(closes)) => println!("  voting until {closes}"),
            (None, None) => {}
        }
        let candidates = session.candidates_for(&position.id);
        if candidates.is_empty() {
            println!("  (no candidates)");
        }
        for candidate in candidates {
            println!("  {} {} [{}]", candidate.initials(), candidate.name, candidate.id);
            if !candidate.program.is_empty() {
                println!("      {}", candidate.program);
            }
            if let Some(url) = candidate.photo_url.as_deref().and_then(|p| config.file_url(p)) {
                println!("      {url}");
            }
        }
    }
}

async fn execute(args: &ArgMatches) -> Result<(), Error> {
    let config = ClientConfig::load(args.get_one::<PathBuf>(CONFIG).map(PathBuf::as_path))?;
    let handoff = args
        .get_one::<String>(TOKEN)
        .and_then(|token| BallotToken::new(token.as_str()));

    match args.subcommand() {
        Some((REQUEST_OTP, sub)) => {
            let reg_no: &String = sub.get_one(REG_NO).unwrap(); // Required argument.
            let verifier = Verifier::new(&config, FileStore::new(config.token_file()))?;
            verifier.request_otp(reg_no).await?;
            println!("A one-time password has been sent to your registered email.");
        }
        Some((CONFIRM, sub)) => {
            let reg_no: &String = sub.get_one(REG_NO).unwrap(); // Required argument.
            let otp: &OtpCode = sub.get_one(OTP).unwrap(); // Required argument.
            let verifier = Verifier::new(&config, FileStore::new(config.token_file()))?;
            verifier.confirm_otp(reg_no, otp).await?;
            println!("Verified. You may now vote.");
        }
        Some((BALLOT, _)) => {
            let session = session(&config)?;
            match session.open(handoff).await? {
                SessionState::NoElections => println!("No elections are open for voting."),
                _ => {
                    if session.advisory() == Some(Advisory::NoApprovedCandidates) {
                        println!("No approved candidates are available for voting yet.");
                    }
                    print_ballot(&session, &config);
                }
            }
        }
        Some((VOTE, sub)) => {
            let session = session(&config)?;
            if session.open(handoff).await? == SessionState::NoElections {
                println!("No elections are open for voting.");
                return Ok(());
            }
            let choices = sub
                .get_many::<(String, String)>(CHOICE)
                .unwrap_or_default();
            for (position, candidate) in choices {
                session.select_candidate(position, candidate)?;
            }
            let receipt = session.submit().await?;
            println!(
                "{} ({} votes)",
                receipt
                    .message
                    .as_deref()
                    .unwrap_or("Vote cast successfully"),
                receipt.votes_cast
            );
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

/// Run the command, report the result, and return the exit code.
async fn run(args: &ArgMatches) -> u8 {
    match execute(args).await {
        Ok(()) => 0,
        Err(err) if err.requires_reverification() => {
            println!("{err}");
            println!("Run `{PROGRAM_NAME} {REQUEST_OTP} <REG_NO>` to get a new ballot token.");
            2
        }
        Err(err) => {
            println!("{err}");
            1
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = votesphere_client::logging::init(None, LevelFilter::Warn) {
        eprintln!("{err}");
    }
    let args = cli().get_matches();
    let exit_code = run(&args).await;
    std::process::exit(exit_code.into())
}
