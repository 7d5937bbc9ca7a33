use std::sync::Arc;

use futures::StreamExt;

use ad_gate::config::GateConfig;
use ad_gate::gateway::TelegramGateway;
use ad_gate::moderation::{Moderator, Workflow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GateConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: ADGATE_BOT_TOKEN, ADGATE_CHANNEL_ID");
        std::process::exit(1);
    });

    eprintln!("📮 ad-gate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: {}", config.channel_id);
    eprintln!(
        "   Required groups: {}",
        config
            .required_groups
            .iter()
            .map(|g| g.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!("   Daily cap: {} posts", config.daily_cap);
    eprintln!(
        "   Confirmation step: {}\n",
        if config.require_confirmation { "on" } else { "off" }
    );

    let gateway = Arc::new(TelegramGateway::new(
        config.bot_token.clone(),
        config.channel_id,
    ));
    let oracle: Arc<dyn ad_gate::gateway::MembershipOracle> = gateway.clone();
    let publisher: Arc<dyn ad_gate::gateway::ChannelPublisher> = gateway.clone();
    let moderator = Arc::new(Moderator::new(&config, oracle, publisher));
    let workflow = Arc::new(Workflow::new(moderator, config.require_confirmation));

    let mut events = gateway.start();
    while let Some(inbound) = events.next().await {
        // Events are handled concurrently; the moderator's per-user
        // lock serializes same-user pipeline runs.
        let gateway = Arc::clone(&gateway);
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move {
            if let Some(callback_id) = &inbound.callback_id {
                if let Err(e) = gateway.answer_callback(callback_id).await {
                    tracing::warn!(error = %e, "failed to answer callback");
                }
            }
            let reply = workflow
                .handle(inbound.user_id, inbound.event, chrono::Utc::now())
                .await;
            if let Err(e) = gateway
                .send_reply(inbound.chat_id, &reply.text, reply.menu)
                .await
            {
                tracing::warn!(chat_id = inbound.chat_id, error = %e, "failed to send reply");
            }
        });
    }

    Ok(())
}
