use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateStatusRequest {
    pub client_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
