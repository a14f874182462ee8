use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub head_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub code: String,
}
