//! HTTP+JSON binding of the queue service

mod auth;
mod dto;
mod error;
mod extract;
mod routes;

use std::sync::Arc;

use axum::Router;

use crate::app::QueueService;
use crate::config::Config;
use crate::error::Result;

pub struct AppState {
    pub queue: QueueService,
    pub poll_interval_secs: u64,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    routes::routes().with_state(state)
}

pub async fn serve(config: &Config, queue: QueueService) -> Result<()> {
    let state = Arc::new(AppState {
        queue,
        poll_interval_secs: config.poll_interval_secs,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
