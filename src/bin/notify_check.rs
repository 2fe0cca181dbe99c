//! Sends one test message through the configured messaging channel.

use placement_agent::notify::{MessagingChannel, TwilioChannel, TwilioConfig};

const TEST_MESSAGE: &str =
    "Hello from your placement agent! If you received this, the Twilio connection is working.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    eprintln!("--- Messaging connection check ---");

    let config = match TwilioConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\nError: {e}");
            eprintln!("  Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_PHONE_NUMBER and MY_PHONE_NUMBER");
            std::process::exit(1);
        }
    };

    eprintln!("   Account SID: {}", config.account_sid);
    eprintln!("   Auth token:  {}", config.masked_token());
    eprintln!("   From:        {}", config.from);
    eprintln!("   To:          {}", config.to);

    eprintln!("\nSending a test message...");
    let channel = TwilioChannel::new(config);
    match channel.send(TEST_MESSAGE).await {
        Ok(sid) => {
            eprintln!("Sent. SID: {sid}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed: {e}");
            Err(e.into())
        }
    }
}
