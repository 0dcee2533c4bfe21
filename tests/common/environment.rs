//! Deployment settings for integration tests.

#[derive(Debug, Clone)]
pub struct TestEnvironment {
    pub app_base_url: String,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self {
            app_base_url: std::env::var("CONNCHECK_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        }
    }
}
