use enose::client::HttpPredictionClient;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub client: HttpPredictionClient,
}

impl AppState {
    pub fn new(client: HttpPredictionClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ServerConfig) -> enose::Result<Self> {
        let client = HttpPredictionClient::new(&config.backend_url, config.request_timeout())?;
        Ok(Self::new(client))
    }

    pub fn backend_url(&self) -> &str {
        self.client.base_url()
    }
}
