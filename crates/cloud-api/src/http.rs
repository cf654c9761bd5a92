//! REST implementation of `CloudApi`
//!
//! Pools live under `/v1/lbpools/{project}/{region}/{pool}` and tasks under
//! `/v1/tasks/{task}`. Every request carries an `APIKey` authorization header
//! and a fresh `x-request-id` for correlation with control-plane logs.

use common::Secret;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, Result, classify_status};
use crate::retry::retry_on_conflict;
use crate::types::{LbPool, MemberSpec, TaskInfo, TaskResults, UpdatePoolRequest};
use crate::{ApiFuture, CloudApi, RequestOpts, Scope};

/// HTTP client bound to one project/region.
pub struct HttpCloudApi {
    client: reqwest::Client,
    base_url: String,
    scope: Scope,
    api_token: Secret<String>,
}

impl HttpCloudApi {
    /// `base_url` is the API root without a trailing `/v1`, e.g.
    /// `https://api.example.com/cloud`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        scope: Scope,
        api_token: Secret<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            scope,
            api_token,
        }
    }

    fn pool_url(&self, pool_id: &str) -> String {
        format!(
            "{}/v1/lbpools/{}/{}/{}",
            self.base_url, self.scope.project_id, self.scope.region_id, pool_id
        )
    }

    fn member_url(&self, pool_id: &str, member_id: Option<&str>) -> String {
        match member_id {
            Some(id) => format!("{}/member/{}", self.pool_url(pool_id), id),
            None => format!("{}/member", self.pool_url(pool_id)),
        }
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/v1/tasks/{}", self.base_url, task_id)
    }

    /// Send a request and decode a JSON body, mapping failures to `ApiError`.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = request
            .header(
                reqwest::header::AUTHORIZATION,
                format!("APIKey {}", self.api_token.expose()),
            )
            .header("x-request-id", request_id.as_str())
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        metrics::counter!(
            "lbmember_api_requests_total",
            "operation" => operation,
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            debug!(operation, request_id = %request_id, status = status.as_u16(), "request rejected");
            return Err(classify_status(
                status.as_u16(),
                &body,
                format!("{operation} returned {status}: {body}"),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("invalid {operation} response: {e}")))
    }
}

impl CloudApi for HttpCloudApi {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn create_member<'a>(
        &'a self,
        pool_id: &'a str,
        spec: &'a MemberSpec,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            let url = self.member_url(pool_id, None);
            retry_on_conflict(opts, "create_member", || {
                self.execute("create_member", self.client.post(&url).json(spec))
            })
            .await
        })
    }

    fn get_pool<'a>(&'a self, pool_id: &'a str) -> ApiFuture<'a, LbPool> {
        Box::pin(async move {
            self.execute("get_pool", self.client.get(self.pool_url(pool_id)))
                .await
        })
    }

    fn update_members<'a>(
        &'a self,
        pool_id: &'a str,
        name: &'a str,
        members: &'a [MemberSpec],
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            let url = self.pool_url(pool_id);
            let body = UpdatePoolRequest { name, members };
            retry_on_conflict(opts, "update_members", || {
                self.execute("update_members", self.client.patch(&url).json(&body))
            })
            .await
        })
    }

    fn delete_member<'a>(
        &'a self,
        pool_id: &'a str,
        member_id: &'a str,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            let url = self.member_url(pool_id, Some(member_id));
            retry_on_conflict(opts, "delete_member", || {
                self.execute("delete_member", self.client.delete(&url))
            })
            .await
        })
    }

    fn get_task<'a>(&'a self, task_id: &'a str) -> ApiFuture<'a, TaskInfo> {
        Box::pin(async move {
            self.execute("get_task", self.client.get(self.task_url(task_id)))
                .await
        })
    }
}
