#![allow(clippy::doc_markdown)]
//! Example: log in, list mailboxes and inspect rights
//!
//! Every response is forwarded to `tracing` through [`LoggingSink`].
//!
//! ## Running
//!
//! ```bash
//! IMAP_HOST=localhost IMAP_USER=bob IMAP_PASSWORD=secret \
//!     cargo run --package imapwire --example wire
//! ```
//!
//! Set `RUST_LOG=imapwire=trace` to see every sink event.

use std::env;

use imapwire::{Client, Config, LoggingSink, StatusItem};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imapwire=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("IMAP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("IMAP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(imapwire::connection::DEFAULT_PORT);
    let user = env::var("IMAP_USER")?;
    let password = env::var("IMAP_PASSWORD")?;

    let config = Config::builder(host).port(port).debug(true).build();
    info!(host = %config.host, port = config.port, "connecting");
    let client = Client::connect(config)?;

    let mut sink = LoggingSink;
    client.drain(&mut sink)?;

    client.login(&user, &password)?;
    client.drain(&mut sink)?;

    client.capability()?;
    client.namespace()?;
    client.list("", "*")?;
    client.status("INBOX", &[StatusItem::Messages, StatusItem::Unseen])?;
    client.my_rights("INBOX")?;
    client.drain(&mut sink)?;

    client.logout()?;
    client.drain(&mut sink)?;
    info!("done");
    Ok(())
}
