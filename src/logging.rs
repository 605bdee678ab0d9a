use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use crate::error::{Error, Result};

/// Default logging configuration file, looked up in the working directory.
pub const LOG_CONFIG_FILE: &str = "log4rs.yaml";

/// A unique identifier for a particular API request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Log an outgoing request.
pub fn log_request(id: RequestId, method: &str, path: &str) {
    info!("->req{id} {method} {path}");
}

/// Log a response, at a level matching its status class.
pub fn log_response(id: RequestId, status: u16, path: &str) {
    let log_msg = format!("<-rsp{id} {status} {path}");
    match status {
        500.. => error!("{log_msg}"),
        400..=499 => warn!("{log_msg}"),
        _ => info!("{log_msg}"),
    }
}

/// Log a request that never got a response.
pub fn log_transport_failure(id: RequestId, path: &str, err: &dyn Display) {
    error!("<-rsp{id} FAILED {path}: {err}");
}

/// Initialise `log4rs` from `config_file` (or [`LOG_CONFIG_FILE`]) if it exists,
/// otherwise log to stderr at `fallback_level`.
pub fn init(config_file: Option<&Path>, fallback_level: LevelFilter) -> Result<()> {
    let path = config_file.unwrap_or_else(|| Path::new(LOG_CONFIG_FILE));
    if path.exists() {
        return log4rs::init_file(path, Default::default())
            .map_err(|e| Error::Config(format!("Failed to initialise logging: {e}")));
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} {h({l:<5})} {t} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(fallback_level))
        .map_err(|e| Error::Config(format!("Failed to initialise logging: {e}")))?;
    log4rs::init_config(config)
        .map_err(|e| Error::Config(format!("Failed to initialise logging: {e}")))?;
    Ok(())
}
