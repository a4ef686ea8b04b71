use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

use crate::models::compile::{CompileRequest, CompileResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the remote compile-and-run endpoint.
///
/// One request per call and no retries. Failures are logged and handed back;
/// they never touch room state.
#[derive(Debug, Clone)]
pub struct CompileClient {
    client: Client,
    endpoint: String,
}

impl CompileClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn run(&self, request: &CompileRequest) -> Result<CompileResponse, reqwest::Error> {
        info!("Submitting {} bytes of {} to {}", request.code.len(), request.lang, self.endpoint);
        let result = async {
            self.client
                .post(&self.endpoint)
                .json(request)
                .send()
                .await?
                .error_for_status()?
                .json::<CompileResponse>()
                .await
        }
        .await;

        if let Err(e) = &result {
            error!("Compile request to {} failed: {}", self.endpoint, e);
        }
        result
    }
}
