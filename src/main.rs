use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use placement_agent::calendar::{GoogleCalendar, ScheduleWriter};
use placement_agent::classifier::Classifier;
use placement_agent::config::AgentConfig;
use placement_agent::google::Authenticator;
use placement_agent::llm::create_provider;
use placement_agent::mail::{GmailClient, MailboxReader, query_for};
use placement_agent::notify::{ChannelLimits, Notifier, channel_from_env};
use placement_agent::pipeline::PlacementAgent;
use placement_agent::research::{
    DuckDuckGoSearch, HttpPageFetcher, ReportGenerator, ResearchSettings, browser_client,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Set GEMINI_API_KEY in the environment or in .env");
        std::process::exit(1);
    });

    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_tracing(&config);

    eprintln!("📬 Placement Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Time zone: {}", config.time_zone);
    eprintln!(
        "   Sender filter: {}",
        config.mail.sender.as_deref().unwrap_or("(any)")
    );
    eprintln!("   Calendar: {}\n", config.google.calendar_id);

    let session = Authenticator::installed_app(
        config.google.token_path.clone(),
        config.google.credentials_path.clone(),
    )
    .ready()
    .await
    .context("Google authentication failed")?;

    let llm = create_provider(&config.llm).context("Failed to set up the language model")?;
    let web = browser_client().context("Failed to build HTTP client for research")?;

    let agent = PlacementAgent::new(
        MailboxReader::new(Arc::new(GmailClient::new(session.clone()))),
        Classifier::new(llm.clone(), config.classify_retries),
        ScheduleWriter::new(
            Arc::new(GoogleCalendar::new(session, config.google.calendar_id.clone())),
            config.time_zone,
        ),
        ReportGenerator::new(
            Arc::new(DuckDuckGoSearch::new(web.clone())),
            Arc::new(HttpPageFetcher::new(web)),
            llm,
            ResearchSettings {
                fetch_delay: config.pacing.between_page_fetches,
                ..Default::default()
            },
        ),
        Notifier::new(channel_from_env(), ChannelLimits::default(), config.pacing),
        config.pacing,
    );

    let today = chrono::Utc::now().with_timezone(&config.time_zone).date_naive();
    let query = query_for(&config.mail, today);

    match agent.run_once(&query).await {
        Ok(summary) => {
            info!(processed = summary.fetched, "Agent finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Mailbox search failed, no emails processed");
            Err(e.into())
        }
    }
}

fn init_tracing(config: &AgentConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "placement-agent.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}
