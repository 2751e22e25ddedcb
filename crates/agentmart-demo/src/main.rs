//! End-to-end walkthrough of the agentmart request lifecycle
//!
//! Publishes two listings, funds an account, and drives the three paths a
//! request can take: a paid success, an external failure (no charge), and a
//! multi-turn chat session finished with a paid generation.

use std::sync::Arc;

use agentmart_catalog::Catalog;
use agentmart_connector::{ConnectorRouter, StaticConnector};
use agentmart_processor::Processor;
use agentmart_types::{
    AccountId, AgentListing, AgentSlug, Amount, ConnectorKind, Currency, Result, SessionId,
    TurnRole,
};
use agentmart_wallet::Wallet;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = Catalog::new();
    let wallet = Wallet::new();
    let connector = StaticConnector::new();
    let router = ConnectorRouter::new().with(Arc::new(connector.clone()));
    let processor = Processor::new(catalog.clone(), wallet.clone(), router);

    // Catalog setup
    let summarizer = AgentSlug::parse("text-summarizer")?;
    catalog
        .publish(
            AgentListing::new(summarizer.clone(), "Text Summarizer", Amount::usd(5.0))
                .with_description("Summarizes long documents")
                .with_connector(ConnectorKind::Static, None),
        )
        .await?;

    let chat_bot = AgentSlug::parse("research-chat")?;
    catalog
        .publish(
            AgentListing::new(chat_bot.clone(), "Research Chat", Amount::usd(3.0))
                .with_description("Multi-turn research assistant")
                .with_connector(ConnectorKind::Static, None)
                .conversational(),
        )
        .await?;

    connector
        .set_reply(
            summarizer.clone(),
            json!({"success": true, "result": {"summary": "Three key points..."}}),
        )
        .await;
    connector
        .set_reply(
            chat_bot.clone(),
            json!({"success": true, "result": {"answer": "Based on our conversation..."}}),
        )
        .await;

    // Fund the buyer
    let buyer = AccountId::new();
    wallet.credit(&buyer, Amount::usd(20.0), "signup credit").await?;
    info!(balance = %wallet.balance(&buyer, Currency::Usd).await, "buyer funded");

    // Path 1: paid success
    let request = processor
        .submit(&buyer, &summarizer, json!({"text": "A very long document"}))
        .await?;
    let response = processor.process(&request.id).await?;
    info!(
        success = response.success,
        payload = %response.payload,
        balance = %wallet.balance(&buyer, Currency::Usd).await,
        "summarizer finished"
    );

    // Path 2: external failure, no charge
    connector.fail_with("upstream model unavailable").await;
    let request = processor
        .submit(&buyer, &summarizer, json!({"text": "Another document"}))
        .await?;
    let response = processor.process(&request.id).await?;
    info!(
        success = response.success,
        error = response.error.as_deref().unwrap_or(""),
        balance = %wallet.balance(&buyer, Currency::Usd).await,
        "failed run left the wallet untouched"
    );
    connector.recover().await;

    // Path 3: chat session, charged once at generation
    let session = SessionId::new();
    processor
        .append_turn(&session, &buyer, &chat_bot, TurnRole::User, "What is a ledger?")
        .await?;
    let record = processor
        .append_turn(
            &session,
            &buyer,
            &chat_bot,
            TurnRole::User,
            "And how does double-entry work?",
        )
        .await?;
    info!(turns = record.turns.len(), "chat session accrued turns for free");

    let response = processor.process(&record.id).await?;
    info!(
        success = response.success,
        balance = %wallet.balance(&buyer, Currency::Usd).await,
        "chat generation charged once"
    );

    // Audit trail
    for entry in wallet.account_entries(&buyer).await {
        info!(
            kind = ?entry.kind,
            amount = %entry.amount,
            balance_after = %entry.balance_after,
            memo = %entry.memo,
            "ledger entry"
        );
    }

    Ok(())
}
