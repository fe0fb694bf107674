//! Typed client over the recruiting API.
//!
//! [`ApiClient`] talks to any [`Transport`]: the in-process [`Gateway`] or a
//! remote server through [`HttpTransport`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::gateway::{Envelope, Gateway, Request};
use crate::models::{
    Assessment, AssessmentPatch, AssessmentResponse, Candidate, CandidatePatch, Job, JobOrderUpdate,
    JobPatch, NewAssessment, NewCandidate, NewJob, NewNote, NewResponse, PipelineStats, Stage,
};
use crate::query::{DEFAULT_PAGE_SIZE, InvalidPage, Page, PageRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-success status; `message` is the server's `error` string when it sent one.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    InvalidArgument(#[from] InvalidPage),

    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Envelope, ClientError>;
}

#[async_trait]
impl Transport for Gateway {
    async fn send(&self, request: Request) -> Result<Envelope, ClientError> {
        Ok(self.handle(request).await)
    }
}

/// Sends requests to a running server, e.g. `http://localhost:3000/api/`.
pub struct HttpTransport {
    http: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        // Without the trailing slash `join` would drop the last path segment.
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Envelope, ClientError> {
        let url = self
            .base
            .join(request.target.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let mut builder = self.http.request(request.method, url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(_) if !status.is_success() => None,
                Err(e) => return Err(ClientError::Decode(e)),
            }
        };
        Ok(Envelope { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
            search: None,
            status: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub stage: Option<String>,
    pub job_id: Option<String>,
}

impl Default for CandidateQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
            search: None,
            stage: None,
            job_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentQuery {
    pub page: i64,
    pub page_size: i64,
    pub job_id: Option<String>,
}

impl Default for AssessmentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
            job_id: None,
        }
    }
}

/// Path plus query string built from the non-empty pairs.
fn list_target(path: &str, page: PageRequest, filters: &[(&str, Option<&str>)]) -> String {
    let mut url = match Url::parse("http://client.local/") {
        Ok(base) => base,
        Err(_) => return path.to_string(),
    };
    url.set_path(path);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("page", &page.page().to_string());
        pairs.append_pair("pageSize", &page.page_size().to_string());
        for (key, value) in filters {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                pairs.append_pair(key, value);
            }
        }
    }
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call(&self, request: Request) -> Result<Option<Value>, ClientError> {
        let method = request.method.clone();
        let target = request.target.clone();
        let envelope = self.transport.send(request).await?;
        debug!(%method, %target, status = envelope.status.as_u16(), "api call finished");

        if !envelope.status.is_success() {
            let message = envelope
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error! status: {}", envelope.status.as_u16()));
            return Err(ClientError::Api {
                status: envelope.status,
                message,
            });
        }
        if envelope.status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(envelope.body)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: Request) -> Result<T, ClientError> {
        let body = self.call(request).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(body)?)
    }

    async fn execute(&self, request: Request) -> Result<(), ClientError> {
        self.call(request).await.map(|_| ())
    }

    fn with_json<B: Serialize>(
        method: Method,
        target: String,
        body: &B,
    ) -> Result<Request, ClientError> {
        Ok(Request::new(method, target).with_body(serde_json::to_value(body)?))
    }

    // --- Jobs ---

    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Page<Job>, ClientError> {
        let page = PageRequest::new(query.page, query.page_size)?;
        let tags = query.tags.join(",");
        let target = list_target(
            "/jobs",
            page,
            &[
                ("search", query.search.as_deref()),
                ("status", query.status.as_deref()),
                ("tags", Some(tags.as_str())),
            ],
        );
        self.fetch(Request::get(target)).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, ClientError> {
        self.fetch(Request::get(format!("/jobs/{id}"))).await
    }

    pub async fn create_job(&self, job: &NewJob) -> Result<Job, ClientError> {
        self.fetch(Self::with_json(Method::POST, "/jobs".to_string(), job)?)
            .await
    }

    pub async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<Job, ClientError> {
        self.fetch(Self::with_json(Method::PUT, format!("/jobs/{id}"), patch)?)
            .await
    }

    pub async fn delete_job(&self, id: &str) -> Result<(), ClientError> {
        self.execute(Request::new(Method::DELETE, format!("/jobs/{id}")))
            .await
    }

    pub async fn archive_job(&self, id: &str) -> Result<Job, ClientError> {
        self.fetch(Request::new(Method::PATCH, format!("/jobs/{id}/archive")))
            .await
    }

    pub async fn unarchive_job(&self, id: &str) -> Result<Job, ClientError> {
        self.fetch(Request::new(Method::PATCH, format!("/jobs/{id}/unarchive")))
            .await
    }

    pub async fn reorder_jobs(&self, updates: &[JobOrderUpdate]) -> Result<Vec<Job>, ClientError> {
        self.fetch(Self::with_json(
            Method::PATCH,
            "/jobs/reorder".to_string(),
            &updates,
        )?)
        .await
    }

    // --- Candidates ---

    pub async fn list_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Page<Candidate>, ClientError> {
        let page = PageRequest::new(query.page, query.page_size)?;
        let target = list_target(
            "/candidates",
            page,
            &[
                ("search", query.search.as_deref()),
                ("stage", query.stage.as_deref()),
                ("jobId", query.job_id.as_deref()),
            ],
        );
        self.fetch(Request::get(target)).await
    }

    pub async fn get_candidate(&self, id: &str) -> Result<Candidate, ClientError> {
        self.fetch(Request::get(format!("/candidates/{id}"))).await
    }

    pub async fn create_candidate(&self, candidate: &NewCandidate) -> Result<Candidate, ClientError> {
        self.fetch(Self::with_json(
            Method::POST,
            "/candidates".to_string(),
            candidate,
        )?)
        .await
    }

    pub async fn update_candidate(
        &self,
        id: &str,
        patch: &CandidatePatch,
    ) -> Result<Candidate, ClientError> {
        self.fetch(Self::with_json(
            Method::PUT,
            format!("/candidates/{id}"),
            patch,
        )?)
        .await
    }

    pub async fn update_candidate_stage(
        &self,
        id: &str,
        stage: Stage,
    ) -> Result<Candidate, ClientError> {
        let patch = CandidatePatch {
            stage: Some(stage),
            ..CandidatePatch::default()
        };
        self.update_candidate(id, &patch).await
    }

    pub async fn delete_candidate(&self, id: &str) -> Result<(), ClientError> {
        self.execute(Request::new(Method::DELETE, format!("/candidates/{id}")))
            .await
    }

    pub async fn add_note(&self, candidate_id: &str, note: &NewNote) -> Result<Candidate, ClientError> {
        self.fetch(Self::with_json(
            Method::POST,
            format!("/candidates/{candidate_id}/notes"),
            note,
        )?)
        .await
    }

    pub async fn candidate_responses(
        &self,
        candidate_id: &str,
    ) -> Result<Vec<AssessmentResponse>, ClientError> {
        self.fetch(Request::get(format!("/candidates/{candidate_id}/responses")))
            .await
    }

    // --- Assessments ---

    pub async fn list_assessments(
        &self,
        query: &AssessmentQuery,
    ) -> Result<Page<Assessment>, ClientError> {
        let page = PageRequest::new(query.page, query.page_size)?;
        let target = list_target("/assessments", page, &[("jobId", query.job_id.as_deref())]);
        self.fetch(Request::get(target)).await
    }

    pub async fn get_assessment(&self, id: &str) -> Result<Assessment, ClientError> {
        self.fetch(Request::get(format!("/assessments/{id}"))).await
    }

    pub async fn create_assessment(
        &self,
        assessment: &NewAssessment,
    ) -> Result<Assessment, ClientError> {
        self.fetch(Self::with_json(
            Method::POST,
            "/assessments".to_string(),
            assessment,
        )?)
        .await
    }

    pub async fn update_assessment(
        &self,
        id: &str,
        patch: &AssessmentPatch,
    ) -> Result<Assessment, ClientError> {
        self.fetch(Self::with_json(
            Method::PUT,
            format!("/assessments/{id}"),
            patch,
        )?)
        .await
    }

    pub async fn delete_assessment(&self, id: &str) -> Result<(), ClientError> {
        self.execute(Request::new(Method::DELETE, format!("/assessments/{id}")))
            .await
    }

    pub async fn assessment_responses(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<AssessmentResponse>, ClientError> {
        self.fetch(Request::get(format!("/assessments/{assessment_id}/responses")))
            .await
    }

    // --- Responses and aggregates ---

    pub async fn submit_response(
        &self,
        response: &NewResponse,
    ) -> Result<AssessmentResponse, ClientError> {
        self.fetch(Self::with_json(
            Method::POST,
            "/responses".to_string(),
            response,
        )?)
        .await
    }

    pub async fn get_response(&self, id: &str) -> Result<AssessmentResponse, ClientError> {
        self.fetch(Request::get(format!("/responses/{id}"))).await
    }

    pub async fn delete_response(&self, id: &str) -> Result<(), ClientError> {
        self.execute(Request::new(Method::DELETE, format!("/responses/{id}")))
            .await
    }

    pub async fn stats(&self) -> Result<PipelineStats, ClientError> {
        self.fetch(Request::get("/stats")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::reliable_gateway;
    use crate::models::{JobStatus, Question, QuestionResponse, QuestionType, Section};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays one envelope and counts how often it was asked.
    struct ScriptedTransport {
        reply: Envelope,
        calls: AtomicUsize,
        last_target: Mutex<Option<String>>,
    }

    impl ScriptedTransport {
        fn replying(status: StatusCode, body: Option<Value>) -> Arc<Self> {
            Arc::new(Self {
                reply: Envelope { status, body },
                calls: AtomicUsize::new(0),
                last_target: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: Request) -> Result<Envelope, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_target.lock().unwrap() = Some(request.target);
            Ok(self.reply.clone())
        }
    }

    fn in_process_client() -> ApiClient {
        ApiClient::new(Arc::new(reliable_gateway()))
    }

    #[tokio::test]
    async fn job_crud_through_the_gateway() {
        let client = in_process_client();
        let job = client
            .create_job(&NewJob {
                title: "Backend Engineer".to_string(),
                tags: vec!["Rust".to_string()],
                ..NewJob::default()
            })
            .await
            .unwrap();
        assert_eq!(client.get_job(&job.id).await.unwrap(), job);

        let archived = client.archive_job(&job.id).await.unwrap();
        assert_eq!(archived.status, JobStatus::Archived);

        let active = client
            .list_jobs(&JobQuery {
                status: Some("active".to_string()),
                ..JobQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(active.pagination.total, 0);

        client.delete_job(&job.id).await.unwrap();
        let err = client.get_job(&job.id).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "Job not found");
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let client = in_process_client();
        let err = client.create_job(&NewJob::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status, ref message }
                if status == StatusCode::BAD_REQUEST && message == "Title is required"
        ));
    }

    #[tokio::test]
    async fn bodiless_failure_gets_a_generic_message() {
        let transport = ScriptedTransport::replying(StatusCode::SERVICE_UNAVAILABLE, None);
        let client = ApiClient::new(transport);
        let err = client.stats().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[tokio::test]
    async fn invalid_page_is_rejected_before_sending() {
        let transport = ScriptedTransport::replying(StatusCode::OK, Some(json!({})));
        let client = ApiClient::new(transport.clone());
        let err = client
            .list_candidates(&CandidateQuery {
                page: 0,
                ..CandidateQuery::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_content_resolves_to_unit() {
        let transport = ScriptedTransport::replying(StatusCode::NO_CONTENT, None);
        let client = ApiClient::new(transport.clone());
        client.delete_candidate("c-1").await.unwrap();
        assert_eq!(
            transport.last_target.lock().unwrap().as_deref(),
            Some("/candidates/c-1")
        );
    }

    #[tokio::test]
    async fn list_targets_carry_filters() {
        let transport = ScriptedTransport::replying(
            StatusCode::OK,
            Some(json!({
                "data": [],
                "pagination": { "page": 2, "pageSize": 5, "total": 0, "totalPages": 0 }
            })),
        );
        let client = ApiClient::new(transport.clone());
        client
            .list_jobs(&JobQuery {
                page: 2,
                page_size: 5,
                search: Some("front end".to_string()),
                tags: vec!["React".to_string(), "CSS".to_string()],
                ..JobQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(
            transport.last_target.lock().unwrap().as_deref(),
            Some("/jobs?page=2&pageSize=5&search=front+end&tags=React%2CCSS")
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let transport = ScriptedTransport::replying(StatusCode::OK, Some(json!({ "id": 5 })));
        let client = ApiClient::new(transport);
        let err = client.get_job("j-1").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn candidate_pipeline_end_to_end() {
        let client = in_process_client();
        let job = client
            .create_job(&NewJob {
                title: "Backend Engineer".to_string(),
                ..NewJob::default()
            })
            .await
            .unwrap();
        let candidate = client
            .create_candidate(&NewCandidate {
                name: "Bob Johnson".to_string(),
                email: "bob@x.com".to_string(),
                job_id: job.id.clone(),
                ..NewCandidate::default()
            })
            .await
            .unwrap();
        let moved = client
            .update_candidate_stage(&candidate.id, Stage::Tech)
            .await
            .unwrap();
        assert_eq!(moved.stage, Stage::Tech);

        let assessment = client
            .create_assessment(&NewAssessment {
                job_id: job.id.clone(),
                title: "Screening".to_string(),
                sections: vec![Section {
                    id: String::new(),
                    title: "Basics".to_string(),
                    questions: vec![Question {
                        id: "why".to_string(),
                        kind: QuestionType::ShortText,
                        title: "Why us?".to_string(),
                        required: true,
                        options: None,
                        validation: None,
                        conditional_logic: None,
                    }],
                }],
            })
            .await
            .unwrap();
        let response = client
            .submit_response(&NewResponse {
                assessment_id: assessment.id.clone(),
                candidate_id: candidate.id.clone(),
                responses: vec![QuestionResponse {
                    question_id: "why".to_string(),
                    value: json!("Interesting problems"),
                    skipped: false,
                }],
                completed: true,
            })
            .await
            .unwrap();
        assert!(response.completed_at.is_some());
        let response_id = response.id.clone();
        assert_eq!(
            client.assessment_responses(&assessment.id).await.unwrap(),
            vec![response.clone()]
        );
        assert_eq!(
            client.candidate_responses(&candidate.id).await.unwrap(),
            vec![response]
        );

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.candidates_by_stage[&Stage::Tech], 1);
        assert_eq!(stats.total_responses, 1);

        let stored = client.get_response(&response_id).await.unwrap();
        assert_eq!(stored.candidate_id, candidate.id);
        client.delete_response(&response_id).await.unwrap();
        let err = client.get_response(&response_id).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
