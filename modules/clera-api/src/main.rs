use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::{OpenAi, SearchContextSize};
use clera_api::auth::SupabaseAuth;
use clera_api::db::{PgAccountDirectory, PgNewsStore, PgPersonalization, PgSummaryStore};
use clera_api::{router, AppState};
use clera_common::{Config, NewsFeed};
use clera_refresh::{DistributedLock, KvStore, NewsCache, RefreshEndpoint, RefreshTrigger, UnconfiguredStore};
use clera_summary::{HttpLinkPreviewer, HttpPositionsClient, SummaryGenerator, SummaryService};
use upstash_client::UpstashClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clera=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    let store: Arc<dyn KvStore> = match config.kv_credentials() {
        Some((url, token)) => Arc::new(UpstashClient::new(url, token)?),
        None => {
            warn!("UPSTASH_REDIS_REST_URL/TOKEN not set; locks and throttles will fail open");
            Arc::new(UnconfiguredStore)
        }
    };

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    // News caches
    let news_store = Arc::new(PgNewsStore::new(pool.clone()));
    let endpoint = RefreshEndpoint::new(config.self_base_url(), config.cron_secret.clone());
    let news_cache = |feed: NewsFeed| {
        let trigger = RefreshTrigger::new(feed, store.clone(), http.clone(), endpoint.clone());
        NewsCache::new(news_store.clone(), Arc::new(trigger))
    };
    let trending = news_cache(NewsFeed::Trending);
    let watchlist = news_cache(NewsFeed::Watchlist);

    // Portfolio summaries
    let search_context_size = SearchContextSize::parse(&config.pplx_search_context_size)
        .unwrap_or_else(|| {
            warn!(value = %config.pplx_search_context_size, "Unknown search context size, using high");
            SearchContextSize::High
        });
    let llm = OpenAi::perplexity(config.pplx_api_key.clone(), config.pplx_model.clone())
        .with_base_url(config.pplx_base_url.clone())
        .with_search_context_size(search_context_size);
    if config.pplx_api_key.is_empty() {
        warn!("PPLX_API_KEY not set; summary generation will fail and serve stale records");
    }

    let summary_store = Arc::new(PgSummaryStore::new(pool.clone()));
    let generator = SummaryGenerator::builder()
        .accounts(Arc::new(PgAccountDirectory::new(pool.clone())))
        .positions(Arc::new(HttpPositionsClient::new(
            http.clone(),
            &config.backend_url,
            config.backend_api_key.clone(),
        )))
        .personalization(Arc::new(PgPersonalization::new(pool.clone())))
        .llm(Arc::new(llm))
        .previewer(Arc::new(HttpLinkPreviewer::new()?))
        .repository(summary_store.clone())
        .build();
    let summaries = SummaryService::new(summary_store, generator, DistributedLock::new(store));

    let state = Arc::new(AppState {
        trending,
        watchlist,
        summaries,
        auth: SupabaseAuth::new(&config.supabase_jwt_secret),
        admin_secret: config.admin_secret.clone(),
        is_production: config.is_production(),
    });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(env = %config.app_env, "Clera API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
