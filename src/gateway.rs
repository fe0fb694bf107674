//! In-process stand-in for the recruiting HTTP API.
//!
//! Every request is delayed, may fail at random, and is then routed to the
//! record store and query engine. Results come back as an [`Envelope`]
//! carrying an HTTP status and an optional JSON body.

use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::chaos::{Chaos, EndpointClass, Sleeper};
use crate::config::{ConfigError, GatewayConfig};
use crate::db::Store;
use crate::error::StoreError;
use crate::models::{
    AssessmentPatch, Candidate, CandidatePatch, JobOrderUpdate, JobPatch, NewAssessment,
    NewCandidate, NewJob, NewNote, NewResponse, Stage,
};
use crate::query::{self, AssessmentFilter, CandidateFilter, InvalidPage, JobFilter, PageRequest};

const ROUTE_BASE: &str = "http://gateway.local/";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path plus optional query string, e.g. `/api/jobs?page=2`.
    pub target: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Envelope {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    /// The `error` string of a failure body, if there is one.
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged, never sent to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => GatewayError::BadRequest(message),
            err @ StoreError::NotFound { .. } => GatewayError::NotFound(err.to_string()),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl From<InvalidPage> for GatewayError {
    fn from(err: InvalidPage) -> Self {
        GatewayError::BadRequest(err.to_string())
    }
}

impl GatewayError {
    fn into_envelope(self) -> Envelope {
        match self {
            GatewayError::BadRequest(message) => Envelope::error(StatusCode::BAD_REQUEST, &message),
            GatewayError::NotFound(message) => Envelope::error(StatusCode::NOT_FOUND, &message),
            GatewayError::Internal(detail) => {
                error!(%detail, "request failed inside the gateway");
                Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}

type Handled = Result<Envelope, GatewayError>;

/// Reorder bodies arrive either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReorderBody {
    Bare(Vec<JobOrderUpdate>),
    Wrapped {
        #[serde(rename = "jobUpdates")]
        job_updates: Vec<JobOrderUpdate>,
    },
}

impl ReorderBody {
    fn into_updates(self) -> Vec<JobOrderUpdate> {
        match self {
            ReorderBody::Bare(updates) | ReorderBody::Wrapped { job_updates: updates } => updates,
        }
    }
}

pub struct Gateway {
    store: Arc<Store>,
    chaos: Chaos,
    sleeper: Arc<dyn Sleeper>,
}

impl Gateway {
    pub fn new(
        store: Arc<Store>,
        config: &GatewayConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, ConfigError> {
        let chaos = Chaos::from_config(config)?;
        debug!(
            failure_rate = chaos.failure_rate(),
            seeded = config.seed.is_some(),
            "gateway ready"
        );
        Ok(Self {
            store,
            chaos,
            sleeper,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn handle(&self, request: Request) -> Envelope {
        let disruption = self.chaos.draw(EndpointClass::of(&request.method));
        self.sleeper.sleep(disruption.delay).await;

        let delay_ms = u64::try_from(disruption.delay.as_millis()).unwrap_or(u64::MAX);
        if disruption.fail {
            warn!(
                method = %request.method,
                target = %request.target,
                delay_ms,
                "injected gateway failure"
            );
            return Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
        }

        let method = request.method.clone();
        let target = request.target.clone();
        let envelope = self
            .route(request)
            .unwrap_or_else(GatewayError::into_envelope);
        debug!(
            %method,
            %target,
            status = envelope.status.as_u16(),
            delay_ms,
            "gateway request handled"
        );
        envelope
    }

    fn route(&self, request: Request) -> Handled {
        let url = Url::parse(ROUTE_BASE)
            .and_then(|base| base.join(&request.target))
            .map_err(|e| GatewayError::BadRequest(format!("Invalid request target: {e}")))?;
        let params = QueryParams::from_url(&url);
        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        if segments.first() == Some(&"api") {
            segments.remove(0);
        }
        let body = request.body;
        let store = &*self.store;

        match (request.method.as_str(), segments.as_slice()) {
            // Jobs
            ("GET", ["jobs"]) => {
                let filter = JobFilter {
                    search: params.text("search"),
                    status: params.text("status"),
                    tags: params.list("tags"),
                };
                let page = query::list_jobs(store.all_jobs()?, params.page_request()?, &filter);
                Ok(Envelope::ok(to_body(&page)?))
            }
            ("POST", ["jobs"]) => {
                let job = store.insert_job(parse_body::<NewJob>(body)?)?;
                Ok(Envelope::created(to_body(&job)?))
            }
            ("PATCH", ["jobs", "reorder"]) => {
                let updates = parse_body::<ReorderBody>(body)?.into_updates();
                let jobs = store.reorder_jobs(&updates)?;
                Ok(Envelope::ok(to_body(&jobs)?))
            }
            ("GET", ["jobs", id]) => Ok(Envelope::ok(to_body(&store.get_job(id)?)?)),
            ("PUT", ["jobs", id]) => {
                let job = store.update_job(id, parse_body::<JobPatch>(body)?)?;
                Ok(Envelope::ok(to_body(&job)?))
            }
            ("DELETE", ["jobs", id]) => {
                store.delete_job(id)?;
                Ok(Envelope::no_content())
            }
            ("PATCH", ["jobs", id, "archive"]) => {
                Ok(Envelope::ok(to_body(&store.archive_job(id)?)?))
            }
            ("PATCH", ["jobs", id, "unarchive"]) => {
                Ok(Envelope::ok(to_body(&store.unarchive_job(id)?)?))
            }

            // Candidates
            ("GET", ["candidates"]) => {
                let filter = CandidateFilter {
                    search: params.text("search"),
                    stage: params.text("stage"),
                    job_id: params.text("jobId"),
                };
                let page = query::list_candidates(
                    candidate_pool(store, &filter)?,
                    params.page_request()?,
                    &filter,
                );
                Ok(Envelope::ok(to_body(&page)?))
            }
            ("POST", ["candidates"]) => {
                let candidate = store.insert_candidate(parse_body::<NewCandidate>(body)?)?;
                Ok(Envelope::created(to_body(&candidate)?))
            }
            ("GET", ["candidates", id]) => Ok(Envelope::ok(to_body(&store.get_candidate(id)?)?)),
            ("PUT", ["candidates", id]) => {
                let candidate = store.update_candidate(id, parse_body::<CandidatePatch>(body)?)?;
                Ok(Envelope::ok(to_body(&candidate)?))
            }
            ("DELETE", ["candidates", id]) => {
                store.delete_candidate(id)?;
                Ok(Envelope::no_content())
            }
            ("POST", ["candidates", id, "notes"]) => {
                let candidate = store.add_note(id, parse_body::<NewNote>(body)?)?;
                Ok(Envelope::created(to_body(&candidate)?))
            }
            ("GET", ["candidates", id, "responses"]) => {
                store.get_candidate(id)?;
                Ok(Envelope::ok(to_body(&store.responses_for_candidate(id)?)?))
            }

            // Assessments
            ("GET", ["assessments"]) => {
                let filter = AssessmentFilter {
                    job_id: params.text("jobId"),
                };
                let pool = match filter.job_id.as_deref() {
                    Some(job_id) => store.assessments_for_job(job_id)?,
                    None => store.all_assessments()?,
                };
                let page = query::list_assessments(
                    pool,
                    params.page_request()?,
                    &filter,
                );
                Ok(Envelope::ok(to_body(&page)?))
            }
            ("POST", ["assessments"]) => {
                let assessment = store.insert_assessment(parse_body::<NewAssessment>(body)?)?;
                Ok(Envelope::created(to_body(&assessment)?))
            }
            ("GET", ["assessments", id]) => {
                Ok(Envelope::ok(to_body(&store.get_assessment(id)?)?))
            }
            ("PUT", ["assessments", id]) => {
                let assessment =
                    store.update_assessment(id, parse_body::<AssessmentPatch>(body)?)?;
                Ok(Envelope::ok(to_body(&assessment)?))
            }
            ("DELETE", ["assessments", id]) => {
                store.delete_assessment(id)?;
                Ok(Envelope::no_content())
            }
            ("GET", ["assessments", id, "responses"]) => {
                store.get_assessment(id)?;
                Ok(Envelope::ok(to_body(&store.responses_for_assessment(id)?)?))
            }

            // Responses and aggregates
            ("POST", ["responses"]) => {
                let response = store.insert_response(parse_body::<NewResponse>(body)?)?;
                Ok(Envelope::created(to_body(&response)?))
            }
            ("GET", ["responses", id]) => Ok(Envelope::ok(to_body(&store.get_response(id)?)?)),
            ("DELETE", ["responses", id]) => {
                store.delete_response(id)?;
                Ok(Envelope::no_content())
            }
            ("GET", ["stats"]) => Ok(Envelope::ok(to_body(&store.pipeline_stats()?)?)),

            (method, _) => Err(GatewayError::NotFound(format!(
                "No route for {} {}",
                method,
                url.path()
            ))),
        }
    }
}

/// Narrow the candidate set through the store indices before filtering.
fn candidate_pool(store: &Store, filter: &CandidateFilter) -> Result<Vec<Candidate>, GatewayError> {
    let stage = filter
        .stage
        .as_deref()
        .and_then(|stage| stage.parse::<Stage>().ok());
    let pool = match (stage, filter.job_id.as_deref()) {
        (Some(stage), job_id) => store.candidates_in_stage(stage, job_id)?,
        (None, Some(job_id)) => store.candidates_for_job(job_id)?,
        (None, None) => store.all_candidates()?,
    };
    Ok(pool)
}

/// Decoded query string of a list request.
struct QueryParams(HashMap<String, String>);

impl QueryParams {
    fn from_url(url: &Url) -> Self {
        Self(url.query_pairs().into_owned().collect())
    }

    fn text(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Comma separated values, blanks dropped.
    fn list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn number(&self, key: &str) -> Result<Option<i64>, GatewayError> {
        self.text(key)
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| {
                    GatewayError::BadRequest(format!("invalid argument: {key} must be a number"))
                })
            })
            .transpose()
    }

    fn page_request(&self) -> Result<PageRequest, GatewayError> {
        let defaults = PageRequest::default();
        let page = self.number("page")?.unwrap_or(defaults.page() as i64);
        let page_size = match self.number("pageSize")? {
            Some(size) => size,
            None => self.number("limit")?.unwrap_or(defaults.page_size() as i64),
        };
        Ok(PageRequest::new(page, page_size)?)
    }
}

/// A missing body reads as an empty object so required-field checks can
/// report exactly what is missing.
fn parse_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T, GatewayError> {
    serde_json::from_value(body.unwrap_or_else(|| json!({})))
        .map_err(|e| GatewayError::BadRequest(format!("Invalid request body: {e}")))
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Internal(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::chaos::test_support::RecordingSleeper;
    use crate::db::test_support::memory_store;

    pub fn reliable_gateway() -> Gateway {
        gateway_with(0.0, Arc::new(RecordingSleeper::default()))
    }

    pub fn gateway_with(failure_rate: f64, sleeper: Arc<dyn Sleeper>) -> Gateway {
        let config = GatewayConfig {
            failure_rate,
            seed: Some(2024),
            ..GatewayConfig::default()
        };
        Gateway::new(Arc::new(memory_store()), &config, sleeper).expect("valid gateway config")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{gateway_with, reliable_gateway};
    use super::*;
    use crate::chaos::LatencyProfile;
    use crate::chaos::test_support::RecordingSleeper;
    use rstest::rstest;

    async fn send(gateway: &Gateway, method: Method, target: &str, body: Option<Value>) -> Envelope {
        let mut request = Request::new(method, target);
        request.body = body;
        gateway.handle(request).await
    }

    async fn create_job(gateway: &Gateway, title: &str, tags: &[&str]) -> Value {
        let envelope = send(
            gateway,
            Method::POST,
            "/jobs",
            Some(json!({ "title": title, "tags": tags })),
        )
        .await;
        assert_eq!(envelope.status, StatusCode::CREATED);
        envelope.body.unwrap()
    }

    fn id_of(value: &Value) -> String {
        value["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn job_lifecycle_maps_to_status_codes() {
        let gateway = reliable_gateway();
        let job = create_job(&gateway, "Backend Engineer", &["Rust"]).await;
        let id = id_of(&job);
        assert_eq!(job["slug"], "backend-engineer");
        assert_eq!(job["order"], 1);

        let fetched = send(&gateway, Method::GET, &format!("/api/jobs/{id}"), None).await;
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.body.as_ref(), Some(&job));

        let archived = send(&gateway, Method::PATCH, &format!("/jobs/{id}/archive"), None).await;
        assert_eq!(archived.body.unwrap()["status"], "archived");

        let deleted = send(&gateway, Method::DELETE, &format!("/jobs/{id}"), None).await;
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);
        assert!(deleted.body.is_none());

        let gone = send(&gateway, Method::GET, &format!("/jobs/{id}"), None).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
        assert_eq!(gone.error_message(), Some("Job not found"));
    }

    #[rstest]
    #[case("/jobs", json!({ "tags": ["x"] }), "Title is required")]
    #[case("/candidates", json!({ "name": "Ann" }), "Name, email, and jobId are required")]
    #[case("/assessments", json!({ "title": "Screening" }), "Title and jobId are required")]
    #[tokio::test]
    async fn missing_required_fields_are_bad_requests(
        #[case] target: &str,
        #[case] body: Value,
        #[case] message: &str,
    ) {
        let gateway = reliable_gateway();
        let envelope = send(&gateway, Method::POST, target, Some(body)).await;
        assert_eq!(envelope.status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.error_message(), Some(message));
        assert_eq!(gateway.store().pipeline_stats().unwrap().total_jobs, 0);
    }

    #[rstest]
    #[case("/jobs?page=0")]
    #[case("/jobs?pageSize=0")]
    #[case("/candidates?page=-2")]
    #[case("/assessments?page=abc")]
    #[tokio::test]
    async fn invalid_pagination_is_rejected(#[case] target: &str) {
        let gateway = reliable_gateway();
        let envelope = send(&gateway, Method::GET, target, None).await;
        assert_eq!(envelope.status, StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case(Method::GET, "/interviews")]
    #[case(Method::POST, "/stats")]
    #[case(Method::PATCH, "/jobs")]
    #[tokio::test]
    async fn unknown_routes_are_not_found(#[case] method: Method, #[case] target: &str) {
        let gateway = reliable_gateway();
        let envelope = send(&gateway, method, target, None).await;
        assert_eq!(envelope.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn job_listing_filters_and_paginates() {
        let gateway = reliable_gateway();
        create_job(&gateway, "Senior Frontend Developer", &["React", "CSS"]).await;
        create_job(&gateway, "Backend Engineer", &["Node.js"]).await;
        create_job(&gateway, "Frontend Intern", &["React"]).await;

        let react = send(&gateway, Method::GET, "/jobs?tags=React,Go&status=all", None).await;
        let body = react.body.unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["pagination"]["total"], 2);

        let paged = send(&gateway, Method::GET, "/api/jobs?page=2&limit=2", None).await;
        let body = paged.body.unwrap();
        assert_eq!(body["data"][0]["title"], "Frontend Intern");
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["pagination"]["pageSize"], 2);

        let search = send(&gateway, Method::GET, "/jobs?search=FRONT", None).await;
        assert_eq!(search.body.unwrap()["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn reorder_accepts_bare_and_wrapped_bodies() {
        let gateway = reliable_gateway();
        let a = id_of(&create_job(&gateway, "A role", &[]).await);
        let b = id_of(&create_job(&gateway, "B role", &[]).await);

        let bare = send(
            &gateway,
            Method::PATCH,
            "/jobs/reorder",
            Some(json!([{ "id": a, "order": 2 }, { "id": b, "order": 1 }])),
        )
        .await;
        assert_eq!(bare.status, StatusCode::OK);
        assert_eq!(bare.body.unwrap()[0]["id"], b.as_str());

        let wrapped = send(
            &gateway,
            Method::PATCH,
            "/jobs/reorder",
            Some(json!({ "jobUpdates": [{ "id": a, "order": 1 }, { "id": b, "order": 2 }] })),
        )
        .await;
        assert_eq!(wrapped.status, StatusCode::OK);

        let listing = send(&gateway, Method::GET, "/jobs", None).await.body.unwrap();
        assert_eq!(listing["data"][0]["id"], a.as_str());
    }

    #[tokio::test]
    async fn candidate_routes_cover_notes_and_filters() {
        let gateway = reliable_gateway();
        let job = id_of(&create_job(&gateway, "Backend Engineer", &[]).await);
        let created = send(
            &gateway,
            Method::POST,
            "/candidates",
            Some(json!({ "name": "Jane Smith", "email": "jane@x.com", "jobId": job })),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        let candidate = id_of(created.body.as_ref().unwrap());

        let dangling = send(
            &gateway,
            Method::POST,
            "/candidates",
            Some(json!({ "name": "Ghost", "email": "g@x.com", "jobId": "missing" })),
        )
        .await;
        assert_eq!(dangling.error_message(), Some("Job not found"));

        let moved = send(
            &gateway,
            Method::PUT,
            &format!("/candidates/{candidate}"),
            Some(json!({ "stage": "tech" })),
        )
        .await;
        assert_eq!(moved.body.unwrap()["stage"], "tech");

        let noted = send(
            &gateway,
            Method::POST,
            &format!("/candidates/{candidate}/notes"),
            Some(json!({ "content": "Great call", "authorId": "r1" })),
        )
        .await;
        assert_eq!(noted.status, StatusCode::CREATED);
        assert_eq!(noted.body.unwrap()["notes"][0]["content"], "Great call");

        let tech = send(
            &gateway,
            Method::GET,
            &format!("/candidates?stage=tech&jobId={job}"),
            None,
        )
        .await;
        assert_eq!(tech.body.unwrap()["pagination"]["total"], 1);
        let bogus = send(&gateway, Method::GET, "/candidates?stage=interview", None).await;
        assert_eq!(bogus.body.unwrap()["pagination"]["total"], 0);

        let responses = send(
            &gateway,
            Method::GET,
            &format!("/candidates/{candidate}/responses"),
            None,
        )
        .await;
        assert_eq!(responses.body, Some(json!([])));
        let missing = send(&gateway, Method::GET, "/candidates/nope/responses", None).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let gateway = reliable_gateway();
        let envelope = send(&gateway, Method::POST, "/jobs", Some(json!("just text"))).await;
        assert_eq!(envelope.status, StatusCode::BAD_REQUEST);
        assert!(envelope.error_message().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn certain_failure_fails_everything_and_writes_nothing() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let gateway = gateway_with(1.0, sleeper.clone());
        for _ in 0..10 {
            let envelope = send(
                &gateway,
                Method::POST,
                "/jobs",
                Some(json!({ "title": "Backend Engineer" })),
            )
            .await;
            assert_eq!(envelope.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(envelope.error_message(), Some("Internal server error"));
        }
        assert!(gateway.store().all_jobs().unwrap().is_empty());

        let write = LatencyProfile::default().write;
        let delays = sleeper.delays();
        assert_eq!(delays.len(), 10);
        assert!(delays.iter().all(|delay| write.contains(*delay)));
    }

    #[tokio::test]
    async fn default_failure_rate_fails_about_one_in_ten() {
        let gateway = gateway_with(0.1, Arc::new(RecordingSleeper::default()));
        let mut failures = 0;
        for _ in 0..1000 {
            let envelope = send(&gateway, Method::GET, "/stats", None).await;
            if envelope.status == StatusCode::INTERNAL_SERVER_ERROR {
                failures += 1;
            } else {
                assert_eq!(envelope.status, StatusCode::OK);
            }
        }
        assert!((70..=130).contains(&failures), "{failures} failures");
    }

    #[tokio::test]
    async fn delays_follow_the_endpoint_class() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let gateway = gateway_with(0.0, sleeper.clone());
        send(&gateway, Method::GET, "/jobs", None).await;
        send(&gateway, Method::POST, "/jobs", Some(json!({ "title": "QA" }))).await;

        let profile = LatencyProfile::default();
        let delays = sleeper.delays();
        assert!(profile.read.contains(delays[0]));
        assert!(profile.write.contains(delays[1]));
    }
}
