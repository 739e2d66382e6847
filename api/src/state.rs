use sqlx::PgPool;

use crate::gateway::ModelGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub gateway: ModelGateway,
}
