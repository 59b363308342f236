use std::time::{Duration, Instant};

use async_trait::async_trait;
use rampr_core::{IterationOutcome, VuInfo, Workload, WorkloadError};

use crate::http::{HttpClient, HttpRequest};
use crate::workloads::unique_nonce;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PASSWORD: &str = "Test@123456";

/// Register-then-login against the auth endpoints, a fresh account per
/// iteration.
pub(crate) struct AuthWorkload {
    client: HttpClient,
    api_url: String,
}

impl AuthWorkload {
    pub(crate) fn new(api_url: String) -> Self {
        Self {
            client: HttpClient::default(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Workload for AuthWorkload {
    type Context = ();

    async fn setup(&self) -> Result<(), WorkloadError> {
        Ok(())
    }

    async fn iterate(&self, _ctx: &(), vu: VuInfo) -> IterationOutcome {
        let mut out = IterationOutcome::new();

        let nonce = unique_nonce();
        let email = format!("load_{nonce}_{}_{}@test.com", vu.id, vu.iteration);

        let register = HttpRequest::json(
            http::Method::POST,
            format!("{}/api/auth/register", self.api_url),
            &serde_json::json!({
                "name": format!("Load User {nonce}"),
                "email": email,
                "password": PASSWORD,
            }),
        )
        .with_timeout(REQUEST_TIMEOUT);

        let start = Instant::now();
        let res = self.client.request(register).await;
        out.time("register_duration", start.elapsed());
        out.count("requests_total", 1.0);

        match res {
            Ok(res) => {
                out.check("register status 201", res.status == 201);
                let token = res.json().and_then(|v| {
                    v.get("token").and_then(|t| t.as_str().map(str::to_string))
                });
                out.check("register returns token", token.is_some());
            }
            Err(err) => {
                out.fail(format!("register request failed: {err}"));
                return out;
            }
        }

        let login = HttpRequest::json(
            http::Method::POST,
            format!("{}/api/auth/login", self.api_url),
            &serde_json::json!({ "email": email, "password": PASSWORD }),
        )
        .with_timeout(REQUEST_TIMEOUT);

        let start = Instant::now();
        let res = self.client.request(login).await;
        out.time("login_duration", start.elapsed());
        out.count("requests_total", 1.0);

        match res {
            Ok(res) => {
                out.check("login status 200", res.status == 200);
                let token = res.json().and_then(|v| {
                    v.get("token").and_then(|t| t.as_str().map(str::to_string))
                });
                out.check("login returns token", token.is_some());
            }
            Err(err) => out.fail(format!("login request failed: {err}")),
        }

        out
    }
}
