use std::time::{Duration, Instant};

use async_trait::async_trait;
use rampr_core::{IterationOutcome, VuInfo, Workload, WorkloadError};

use crate::http::{HttpClient, HttpRequest};
use crate::workloads::unique_nonce;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Full CRUD cycle against the books endpoints: list, create, update,
/// delete. A shared account is registered once during setup and its
/// token authenticates every iteration.
pub(crate) struct CrudWorkload {
    client: HttpClient,
    api_url: String,
}

pub(crate) struct CrudContext {
    token: String,
}

impl CrudWorkload {
    pub(crate) fn new(api_url: String) -> Self {
        Self {
            client: HttpClient::default(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Workload for CrudWorkload {
    type Context = CrudContext;

    async fn setup(&self) -> Result<CrudContext, WorkloadError> {
        let register = HttpRequest::json(
            http::Method::POST,
            format!("{}/auth/register", self.api_url),
            &serde_json::json!({
                "name": "Load Books User",
                "email": format!("load_books_{}@test.com", unique_nonce()),
                "password": "Test@123456",
            }),
        )
        .with_timeout(REQUEST_TIMEOUT);

        let res = self.client.request(register).await?;
        if res.status != 201 {
            return Err(format!("register returned status {}", res.status).into());
        }
        let token = res
            .json()
            .and_then(|v| v.get("token").and_then(|t| t.as_str().map(str::to_string)))
            .ok_or("register response has no token")?;

        Ok(CrudContext { token })
    }

    async fn iterate(&self, ctx: &CrudContext, _vu: VuInfo) -> IterationOutcome {
        let mut out = IterationOutcome::new();

        // list
        let req = HttpRequest::get(format!("{}/books", self.api_url))
            .bearer(&ctx.token)
            .with_timeout(REQUEST_TIMEOUT);
        let start = Instant::now();
        let res = self.client.request(req).await;
        out.time("list_books_duration", start.elapsed());
        out.count("requests_total", 1.0);
        match res {
            Ok(res) => {
                out.check("list books status 200", res.status == 200);
                let is_array = res.json().map(|v| v.is_array()).unwrap_or(false);
                out.check("list books returns array", is_array);
            }
            Err(err) => {
                out.fail(format!("list request failed: {err}"));
                return out;
            }
        }

        // create; the rest of the cycle needs the new book's id
        let req = HttpRequest::json(
            http::Method::POST,
            format!("{}/books", self.api_url),
            &serde_json::json!({
                "title": format!("Load Book {}", unique_nonce()),
                "author": "Load Author",
                "year": 2024,
            }),
        )
        .bearer(&ctx.token)
        .with_timeout(REQUEST_TIMEOUT);
        let start = Instant::now();
        let res = self.client.request(req).await;
        out.time("create_book_duration", start.elapsed());
        out.count("requests_total", 1.0);
        let book_id = match res {
            Ok(res) => {
                let created = out.check("create book status 201", res.status == 201);
                let id = res.json().and_then(|v| v.get("id").map(id_to_string));
                let has_id = out.check("create book returns id", id.is_some());
                // without a created book the rest of the cycle is meaningless
                match id {
                    Some(id) if created && has_id => id,
                    _ => return out,
                }
            }
            Err(err) => {
                out.fail(format!("create request failed: {err}"));
                return out;
            }
        };

        // update
        let req = HttpRequest::json(
            http::Method::PUT,
            format!("{}/books/{book_id}", self.api_url),
            &serde_json::json!({
                "title": "Load Book Updated",
                "author": "Load Author",
                "year": 2025,
            }),
        )
        .bearer(&ctx.token)
        .with_timeout(REQUEST_TIMEOUT);
        let start = Instant::now();
        let res = self.client.request(req).await;
        out.time("update_book_duration", start.elapsed());
        out.count("requests_total", 1.0);
        match res {
            Ok(res) => {
                out.check("update book status 200", res.status == 200);
            }
            Err(err) => {
                out.fail(format!("update request failed: {err}"));
                return out;
            }
        }

        // delete
        let req = HttpRequest::delete(format!("{}/books/{book_id}", self.api_url))
            .bearer(&ctx.token)
            .with_timeout(REQUEST_TIMEOUT);
        let start = Instant::now();
        let res = self.client.request(req).await;
        out.time("delete_book_duration", start.elapsed());
        out.count("requests_total", 1.0);
        match res {
            Ok(res) => {
                out.check("delete book status 200", res.status == 200);
            }
            Err(err) => out.fail(format!("delete request failed: {err}")),
        }

        out
    }
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
