use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::engine::{Engine, Orchestrator, WorkflowCatalog};
use crate::health::HealthMonitor;
use crate::registry::AgentRegistry;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<AgentRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub catalog: Arc<WorkflowCatalog>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn from_engine(engine: &Engine, config: Config) -> Self {
        Self {
            orchestrator: engine.orchestrator.clone(),
            registry: engine.registry.clone(),
            monitor: engine.monitor.clone(),
            catalog: engine.catalog.clone(),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/config", get(handlers::get_config))
        .route("/invoke", post(handlers::invoke))
        .route("/orchestrate", post(handlers::orchestrate))
        .route("/status", get(handlers::get_status))
        .route("/agents", get(handlers::list_agents))
        .route("/agents/:id", get(handlers::get_agent))
        .route("/workflows", get(handlers::list_workflows))
        .route("/validate", post(handlers::validate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    println!("Expunge orchestration API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
