//! Command-line front end for the client session.
//!
//! `session login <token>` stores a token and shows who it belongs to,
//! `session logout` forgets it, `session whoami` restores the stored session.

use donation_tracker::client::{AuthSession, ClientConfig};
use donation_tracker::config::LoggingConfig;
use donation_tracker::utils::logger::init_logging;

const USAGE: &str = "usage: session <login <token> | logout | whoami>";

#[tokio::main]
async fn main() {
    let logging = LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let session = match ClientConfig::from_env().and_then(|cfg| AuthSession::from_config(&cfg)) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["login", token] => {
            session.mount().await;
            session.login(token).await;
        }
        ["logout"] => session.logout(),
        ["whoami"] => session.mount().await,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    match session.user() {
        Some(user) => println!("Signed in as {} <{}>", user.username, user.email),
        None => println!("Not signed in"),
    }
    session.close();
}
