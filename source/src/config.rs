#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: String,
    pub verify_tls: bool,
    pub max_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            verify_tls: true,
            max_retries: 10,
        }
    }
}
