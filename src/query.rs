//! Paginated, filtered views over a full record set.
//!
//! Everything here is pure: callers load the unfiltered records from the
//! store and hand them over together with a validated [`PageRequest`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::models::{Assessment, Candidate, Job};

/// Sentinel accepted by status and stage filters meaning "do not filter".
pub const ALL: &str = "all";

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument: {field} must be at least 1 (got {value})")]
pub struct InvalidPage {
    pub field: &'static str,
    pub value: i64,
}

/// A page number and size that are both known to be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, InvalidPage> {
        let page = usize::try_from(page)
            .ok()
            .filter(|&p| p >= 1)
            .ok_or(InvalidPage { field: "page", value: page })?;
        let page_size = usize::try_from(page_size)
            .ok()
            .filter(|&s| s >= 1)
            .ok_or(InvalidPage {
                field: "pageSize",
                value: page_size,
            })?;
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn start_index(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Filter, sort and slice `records`.
///
/// Pages past the end come back empty with accurate totals.
pub fn paginate<T, F, S>(records: Vec<T>, request: PageRequest, filter: F, mut sort: S) -> Page<T>
where
    F: Fn(&T) -> bool,
    S: FnMut(&T, &T) -> Ordering,
{
    let mut matching: Vec<T> = records.into_iter().filter(|record| filter(record)).collect();
    matching.sort_by(&mut sort);

    let total = matching.len();
    let data = matching
        .into_iter()
        .skip(request.start_index())
        .take(request.page_size)
        .collect();

    Page {
        data,
        pagination: Pagination {
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: total.div_ceil(request.page_size),
        },
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// `None` and `"all"` match everything; anything else is exact equality.
fn matches_exact(filter: Option<&str>, actual: &str) -> bool {
    match filter {
        None | Some(ALL) => true,
        Some(expected) => expected == actual,
    }
}

fn normalized_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(term) = normalized_search(self.search.as_deref()) {
            let hit = contains_ci(&job.title, &term)
                || job
                    .description
                    .as_deref()
                    .is_some_and(|description| contains_ci(description, &term))
                || job.tags.iter().any(|tag| contains_ci(tag, &term));
            if !hit {
                return false;
            }
        }
        if !matches_exact(self.status.as_deref(), job.status.as_str()) {
            return false;
        }
        self.tags.is_empty() || self.tags.iter().any(|tag| job.tags.contains(tag))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub job_id: Option<String>,
}

impl CandidateFilter {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        if let Some(term) = normalized_search(self.search.as_deref()) {
            if !contains_ci(&candidate.name, &term) && !contains_ci(&candidate.email, &term) {
                return false;
            }
        }
        if !matches_exact(self.stage.as_deref(), candidate.stage.as_str()) {
            return false;
        }
        self.job_id
            .as_deref()
            .is_none_or(|job_id| candidate.job_id == job_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessmentFilter {
    pub job_id: Option<String>,
}

impl AssessmentFilter {
    pub fn matches(&self, assessment: &Assessment) -> bool {
        self.job_id
            .as_deref()
            .is_none_or(|job_id| assessment.job_id == job_id)
    }
}

pub fn by_order(a: &Job, b: &Job) -> Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

pub fn by_newest_application(a: &Candidate, b: &Candidate) -> Ordering {
    b.applied_at
        .cmp(&a.applied_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn by_newest_assessment(a: &Assessment, b: &Assessment) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn list_jobs(jobs: Vec<Job>, request: PageRequest, filter: &JobFilter) -> Page<Job> {
    paginate(jobs, request, |job| filter.matches(job), by_order)
}

pub fn list_candidates(
    candidates: Vec<Candidate>,
    request: PageRequest,
    filter: &CandidateFilter,
) -> Page<Candidate> {
    paginate(
        candidates,
        request,
        |candidate| filter.matches(candidate),
        by_newest_application,
    )
}

pub fn list_assessments(
    assessments: Vec<Assessment>,
    request: PageRequest,
    filter: &AssessmentFilter,
) -> Page<Assessment> {
    paginate(
        assessments,
        request,
        |assessment| filter.matches(assessment),
        by_newest_assessment,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::fixture_time;
    use crate::models::{JobStatus, Stage};
    use chrono::TimeDelta;
    use rstest::rstest;

    fn job(id: &str, title: &str, status: JobStatus, order: i64, tags: &[&str]) -> Job {
        Job {
            id: id.to_string(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            status,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            order,
            description: None,
            requirements: None,
            created_at: fixture_time(),
            updated_at: fixture_time(),
        }
    }

    fn sample_jobs() -> Vec<Job> {
        let mut frontend = job(
            "j1",
            "Senior Frontend Developer",
            JobStatus::Active,
            1,
            &["React", "TypeScript", "CSS"],
        );
        frontend.description =
            Some("We are looking for a senior frontend developer with React expertise.".to_string());
        // Deliberately out of order so sorting is exercised.
        vec![
            job("j3", "UX Designer", JobStatus::Archived, 3, &["Figma", "Prototyping"]),
            frontend,
            job("j2", "Backend Engineer", JobStatus::Active, 2, &["Node.js", "API"]),
        ]
    }

    fn candidate(id: &str, name: &str, job_id: &str, stage: Stage, minutes_ago: i64) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            job_id: job_id.to_string(),
            stage,
            applied_at: fixture_time() - TimeDelta::minutes(minutes_ago),
            notes: Vec::new(),
            resume: None,
        }
    }

    fn job_ids(page: &Page<Job>) -> Vec<&str> {
        page.data.iter().map(|job| job.id.as_str()).collect()
    }

    fn candidate_ids(page: &Page<Candidate>) -> Vec<&str> {
        page.data.iter().map(|candidate| candidate.id.as_str()).collect()
    }

    #[test]
    fn active_filter_returns_first_two_jobs_in_order() {
        let filter = JobFilter {
            status: Some("active".to_string()),
            ..JobFilter::default()
        };
        let page = list_jobs(sample_jobs(), PageRequest::new(1, 10).unwrap(), &filter);

        assert_eq!(job_ids(&page), vec!["j1", "j2"]);
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn status_all_is_the_same_as_no_status() {
        let request = PageRequest::new(1, 10).unwrap();
        let all = JobFilter {
            status: Some(ALL.to_string()),
            ..JobFilter::default()
        };
        assert_eq!(
            list_jobs(sample_jobs(), request, &all),
            list_jobs(sample_jobs(), request, &JobFilter::default())
        );
    }

    #[test]
    fn unknown_status_matches_nothing() {
        let filter = JobFilter {
            status: Some("paused".to_string()),
            ..JobFilter::default()
        };
        let page = list_jobs(sample_jobs(), PageRequest::default(), &filter);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }

    #[rstest]
    #[case("frontend", vec!["j1"])]
    #[case("EXPERTISE", vec!["j1"])]
    #[case("figma", vec!["j3"])]
    #[case("engineer", vec!["j2"])]
    #[case("   ", vec!["j1", "j2", "j3"])]
    fn search_covers_title_description_and_tags(#[case] search: &str, #[case] expected: Vec<&str>) {
        let filter = JobFilter {
            search: Some(search.to_string()),
            ..JobFilter::default()
        };
        let page = list_jobs(sample_jobs(), PageRequest::default(), &filter);
        assert_eq!(job_ids(&page), expected);
    }

    #[test]
    fn filters_combine_with_and() {
        let filter = JobFilter {
            search: Some("e".to_string()),
            status: Some("active".to_string()),
            tags: vec!["API".to_string(), "Figma".to_string()],
        };
        let page = list_jobs(sample_jobs(), PageRequest::default(), &filter);
        assert_eq!(job_ids(&page), vec!["j2"]);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(25, 7, 4)]
    #[case(3, 1, 3)]
    fn total_pages_is_ceiling_of_total_over_size(
        #[case] total: usize,
        #[case] page_size: i64,
        #[case] expected_pages: usize,
    ) {
        let jobs: Vec<Job> = (0..total)
            .map(|i| job(&format!("j{:03}", i), "Role", JobStatus::Active, i as i64, &[]))
            .collect();
        let page_count = i64::try_from(expected_pages.max(1)).unwrap();
        for page_number in 1..=page_count + 1 {
            let request = PageRequest::new(page_number, page_size).unwrap();
            let page = list_jobs(jobs.clone(), request, &JobFilter::default());
            assert_eq!(page.pagination.total, total);
            assert_eq!(page.pagination.total_pages, expected_pages);
            assert!(page.data.len() <= request.page_size());
        }
    }

    #[test]
    fn out_of_range_page_is_empty_with_metadata() {
        let page = list_jobs(sample_jobs(), PageRequest::new(5, 2).unwrap(), &JobFilter::default());
        assert!(page.data.is_empty());
        assert_eq!(
            page.pagination,
            Pagination {
                page: 5,
                page_size: 2,
                total: 3,
                total_pages: 2
            }
        );
    }

    #[test]
    fn second_page_continues_where_first_stopped() {
        let request = PageRequest::new(2, 2).unwrap();
        let page = list_jobs(sample_jobs(), request, &JobFilter::default());
        assert_eq!(job_ids(&page), vec!["j3"]);
    }

    #[rstest]
    #[case(0, 10, "page")]
    #[case(1, 0, "pageSize")]
    #[case(-3, 10, "page")]
    fn page_request_rejects_values_below_one(
        #[case] page: i64,
        #[case] size: i64,
        #[case] field: &str,
    ) {
        let err = PageRequest::new(page, size).unwrap_err();
        assert_eq!(err.field, field);
    }

    #[test]
    fn candidates_are_newest_first_and_scoped() {
        let candidates = vec![
            candidate("c1", "John Doe", "j1", Stage::Applied, 60),
            candidate("c2", "Jane Smith", "j1", Stage::Screen, 10),
            candidate("c3", "Bob Johnson", "j2", Stage::Tech, 30),
        ];

        let all = list_candidates(candidates.clone(), PageRequest::default(), &CandidateFilter::default());
        assert_eq!(candidate_ids(&all), vec!["c2", "c3", "c1"]);

        let scoped = CandidateFilter {
            job_id: Some("j1".to_string()),
            stage: Some(ALL.to_string()),
            search: Some("DOE".to_string()),
        };
        let page = list_candidates(candidates, PageRequest::default(), &scoped);
        assert_eq!(candidate_ids(&page), vec!["c1"]);
    }

    #[test]
    fn candidate_search_matches_email() {
        let candidates = vec![
            candidate("c1", "John Doe", "j1", Stage::Applied, 1),
            candidate("c2", "Jane Smith", "j1", Stage::Applied, 2),
        ];
        let filter = CandidateFilter {
            search: Some("jane.smith@".to_string()),
            ..CandidateFilter::default()
        };
        let page = list_candidates(candidates, PageRequest::default(), &filter);
        assert_eq!(candidate_ids(&page), vec!["c2"]);
    }

    #[test]
    fn listing_twice_gives_identical_pages() {
        let filter = JobFilter {
            search: Some("e".to_string()),
            ..JobFilter::default()
        };
        let request = PageRequest::new(1, 2).unwrap();
        assert_eq!(
            list_jobs(sample_jobs(), request, &filter),
            list_jobs(sample_jobs(), request, &filter)
        );
    }
}
