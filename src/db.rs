use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::MonotonicClock;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Assessment, AssessmentPatch, AssessmentResponse, Candidate, CandidatePatch, Job,
    JobOrderUpdate, JobPatch, JobStatus, NewAssessment, NewCandidate, NewJob, NewNote,
    NewResponse, Note, PipelineStats, Section, Stage, Timestamp,
};
use crate::validation::{Validate, validate_answers, validate_sections};

const SCHEMA_VERSION: i64 = 1;

const JOB_COLUMNS: &str = "id, title, slug, status, tags, sort_order, description, requirements, \
                           created_at, updated_at";
const CANDIDATE_COLUMNS: &str = "id, name, email, job_id, stage, applied_at, notes, resume";
const ASSESSMENT_COLUMNS: &str = "id, job_id, title, sections, created_at";
const RESPONSE_COLUMNS: &str =
    "id, assessment_id, candidate_id, answers, submitted_at, completed_at";

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").unwrap_or_else(|e| panic!("slug pattern is valid: {e}"))
});

/// URL-safe slug: lowercase alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(&title.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn new_key() -> String {
    Uuid::new_v4().to_string()
}

/// Embedded record store for jobs, candidates, assessments and responses.
///
/// One SQLite connection guarded by a mutex; every operation holds the lock
/// for its whole read-modify-write, so readers never see half an operation.
pub struct Store {
    conn: Mutex<Connection>,
    clock: MonotonicClock,
    path: Option<PathBuf>,
}

impl Store {
    pub fn open(path: &Path, clock: MonotonicClock) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, clock, Some(path.to_path_buf()))
    }

    pub fn open_in_memory(clock: MonotonicClock) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, clock, None)
    }

    fn from_connection(
        conn: Connection,
        clock: MonotonicClock,
        path: Option<PathBuf>,
    ) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate(&conn)?;
        clock.observe(latest_stamp(&conn)?);
        debug!(path = ?path, "record store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush and release the underlying connection.
    pub fn close(self) -> StoreResult<()> {
        let conn = self.conn.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Database(e))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // --- Jobs ---

    pub fn insert_job(&self, new: NewJob) -> StoreResult<Job> {
        new.validate()?;
        let conn = self.lock()?;
        let order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM jobs",
            [],
            |row| row.get(0),
        )?;
        let now = self.clock.now();
        let job = Job {
            id: new_key(),
            slug: slugify(&new.title),
            title: new.title,
            status: new.status.unwrap_or(JobStatus::Active),
            tags: new.tags,
            order,
            description: new.description,
            requirements: new.requirements,
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO jobs (id, title, slug, status, tags, sort_order, description, requirements,
                               created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.title,
                job.slug,
                job.status,
                to_json(&job.tags)?,
                job.order,
                job.description,
                job.requirements.as_ref().map(to_json).transpose()?,
                job.created_at.timestamp_millis(),
                job.updated_at.timestamp_millis(),
            ],
        )?;
        debug!(job_id = %job.id, order = job.order, "job inserted");
        Ok(job)
    }

    pub fn get_job(&self, id: &str) -> StoreResult<Job> {
        let conn = self.lock()?;
        find_job(&conn, id)?.ok_or_else(|| StoreError::not_found("Job", id))
    }

    pub fn all_jobs(&self) -> StoreResult<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY sort_order"
        ))?;
        let rows = stmt.query_map([], row_to_job)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_job(&self, id: &str, patch: JobPatch) -> StoreResult<Job> {
        let conn = self.lock()?;
        let mut job = find_job(&conn, id)?.ok_or_else(|| StoreError::not_found("Job", id))?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::validation("Title is required"));
            }
            job.slug = slugify(&title);
            job.title = title;
        }
        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(tags) = patch.tags {
            job.tags = tags;
        }
        if patch.description.is_some() {
            job.description = patch.description;
        }
        if patch.requirements.is_some() {
            job.requirements = patch.requirements;
        }
        job.updated_at = self.clock.now();

        conn.execute(
            "UPDATE jobs SET title = ?2, slug = ?3, status = ?4, tags = ?5, description = ?6,
                             requirements = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                job.id,
                job.title,
                job.slug,
                job.status,
                to_json(&job.tags)?,
                job.description,
                job.requirements.as_ref().map(to_json).transpose()?,
                job.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(job)
    }

    pub fn archive_job(&self, id: &str) -> StoreResult<Job> {
        self.set_job_status(id, JobStatus::Archived)
    }

    pub fn unarchive_job(&self, id: &str) -> StoreResult<Job> {
        self.set_job_status(id, JobStatus::Active)
    }

    fn set_job_status(&self, id: &str, status: JobStatus) -> StoreResult<Job> {
        self.update_job(
            id,
            JobPatch {
                status: Some(status),
                ..JobPatch::default()
            },
        )
    }

    /// Delete a job together with its candidates, assessments and their responses.
    pub fn delete_job(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(StoreError::not_found("Job", id));
        }
        info!(job_id = %id, "job deleted with dependants");
        Ok(())
    }

    /// Rewrite the order of several jobs as one unit.
    ///
    /// Either every update lands or none does. Orders must stay unique across
    /// all jobs, including those the request does not touch.
    pub fn reorder_jobs(&self, updates: &[JobOrderUpdate]) -> StoreResult<Vec<Job>> {
        let mut seen_ids = HashSet::new();
        let mut seen_orders = HashSet::new();
        for update in updates {
            if !seen_ids.insert(update.id.as_str()) {
                return Err(StoreError::validation(format!(
                    "Job {} appears more than once",
                    update.id
                )));
            }
            if !seen_orders.insert(update.order) {
                return Err(StoreError::validation(format!(
                    "Order {} is assigned more than once",
                    update.order
                )));
            }
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = self.clock.now().timestamp_millis();
        // Park the affected rows below every existing and requested order
        // first, so no intermediate write trips the UNIQUE index.
        let lowest_existing: i64 = tx.query_row(
            "SELECT COALESCE(MIN(sort_order), 0) FROM jobs",
            [],
            |row| row.get(0),
        )?;
        let lowest_target = updates.iter().map(|u| u.order).min();
        let parking_base = lowest_target.map_or(lowest_existing, |t| t.min(lowest_existing)) - 1;
        for (offset, update) in (0_i64..).zip(updates) {
            let parked = tx.execute(
                "UPDATE jobs SET sort_order = ?2 WHERE id = ?1",
                params![update.id, parking_base - offset],
            )?;
            if parked == 0 {
                return Err(StoreError::not_found("Job", update.id.clone()));
            }
        }
        for update in updates {
            tx.execute(
                "UPDATE jobs SET sort_order = ?2, updated_at = ?3 WHERE id = ?1",
                params![update.id, update.order, now],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::validation(format!(
                        "Order {} is already used by another job",
                        update.order
                    ))
                }
                other => StoreError::Database(other),
            })?;
        }
        let reordered = jobs_by_ids(&tx, updates.iter().map(|u| u.id.as_str()))?;
        tx.commit()?;
        debug!(count = updates.len(), "jobs reordered");
        Ok(reordered)
    }

    // --- Candidates ---

    pub fn insert_candidate(&self, new: NewCandidate) -> StoreResult<Candidate> {
        new.validate()?;
        let conn = self.lock()?;
        ensure_job_exists(&conn, &new.job_id)?;
        let candidate = Candidate {
            id: new_key(),
            name: new.name,
            email: new.email,
            job_id: new.job_id,
            stage: new.stage.unwrap_or(Stage::Applied),
            applied_at: self.clock.now(),
            notes: Vec::new(),
            resume: new.resume,
        };
        conn.execute(
            "INSERT INTO candidates (id, name, email, job_id, stage, applied_at, notes, resume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                candidate.id,
                candidate.name,
                candidate.email,
                candidate.job_id,
                candidate.stage,
                candidate.applied_at.timestamp_millis(),
                to_json(&candidate.notes)?,
                candidate.resume,
            ],
        )?;
        debug!(candidate_id = %candidate.id, job_id = %candidate.job_id, "candidate inserted");
        Ok(candidate)
    }

    pub fn get_candidate(&self, id: &str) -> StoreResult<Candidate> {
        let conn = self.lock()?;
        find_candidate(&conn, id)?.ok_or_else(|| StoreError::not_found("Candidate", id))
    }

    pub fn all_candidates(&self) -> StoreResult<Vec<Candidate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY applied_at DESC, id"
        ))?;
        let rows = stmt.query_map([], row_to_candidate)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn candidates_for_job(&self, job_id: &str) -> StoreResult<Vec<Candidate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE job_id = ?1
             ORDER BY applied_at DESC, id"
        ))?;
        let rows = stmt.query_map([job_id], row_to_candidate)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn candidates_in_stage(
        &self,
        stage: Stage,
        job_id: Option<&str>,
    ) -> StoreResult<Vec<Candidate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates
             WHERE stage = ?1 AND (?2 IS NULL OR job_id = ?2)
             ORDER BY applied_at DESC, id"
        ))?;
        let rows = stmt.query_map(params![stage, job_id], row_to_candidate)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_candidate(&self, id: &str, patch: CandidatePatch) -> StoreResult<Candidate> {
        let conn = self.lock()?;
        let mut candidate =
            find_candidate(&conn, id)?.ok_or_else(|| StoreError::not_found("Candidate", id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::validation("Name is required"));
            }
            candidate.name = name;
        }
        if let Some(email) = patch.email {
            if email.trim().is_empty() {
                return Err(StoreError::validation("Email is required"));
            }
            candidate.email = email;
        }
        if let Some(job_id) = patch.job_id {
            ensure_job_exists(&conn, &job_id)?;
            candidate.job_id = job_id;
        }
        if let Some(stage) = patch.stage {
            candidate.stage = stage;
        }
        if patch.resume.is_some() {
            candidate.resume = patch.resume;
        }

        conn.execute(
            "UPDATE candidates SET name = ?2, email = ?3, job_id = ?4, stage = ?5, resume = ?6
             WHERE id = ?1",
            params![
                candidate.id,
                candidate.name,
                candidate.email,
                candidate.job_id,
                candidate.stage,
                candidate.resume,
            ],
        )?;
        Ok(candidate)
    }

    pub fn add_note(&self, candidate_id: &str, new: NewNote) -> StoreResult<Candidate> {
        new.validate()?;
        let conn = self.lock()?;
        let mut candidate = find_candidate(&conn, candidate_id)?
            .ok_or_else(|| StoreError::not_found("Candidate", candidate_id))?;
        candidate.notes.push(Note {
            id: new_key(),
            content: new.content,
            mentions: distinct_mentions(new.mentions),
            author_id: new.author_id,
            created_at: self.clock.now(),
        });
        conn.execute(
            "UPDATE candidates SET notes = ?2 WHERE id = ?1",
            params![candidate.id, to_json(&candidate.notes)?],
        )?;
        Ok(candidate)
    }

    /// Delete a candidate and the responses they submitted.
    pub fn delete_candidate(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM candidates WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(StoreError::not_found("Candidate", id));
        }
        Ok(())
    }

    // --- Assessments ---

    pub fn insert_assessment(&self, new: NewAssessment) -> StoreResult<Assessment> {
        new.validate()?;
        let conn = self.lock()?;
        ensure_job_exists(&conn, &new.job_id)?;
        let assessment = Assessment {
            id: new_key(),
            job_id: new.job_id,
            title: new.title,
            sections: with_assigned_ids(new.sections),
            created_at: self.clock.now(),
        };
        conn.execute(
            "INSERT INTO assessments (id, job_id, title, sections, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                assessment.id,
                assessment.job_id,
                assessment.title,
                to_json(&assessment.sections)?,
                assessment.created_at.timestamp_millis(),
            ],
        )?;
        debug!(assessment_id = %assessment.id, "assessment inserted");
        Ok(assessment)
    }

    pub fn get_assessment(&self, id: &str) -> StoreResult<Assessment> {
        let conn = self.lock()?;
        find_assessment(&conn, id)?.ok_or_else(|| StoreError::not_found("Assessment", id))
    }

    pub fn all_assessments(&self) -> StoreResult<Vec<Assessment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt.query_map([], row_to_assessment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn assessments_for_job(&self, job_id: &str) -> StoreResult<Vec<Assessment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE job_id = ?1
             ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt.query_map([job_id], row_to_assessment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_assessment(&self, id: &str, patch: AssessmentPatch) -> StoreResult<Assessment> {
        let conn = self.lock()?;
        let mut assessment =
            find_assessment(&conn, id)?.ok_or_else(|| StoreError::not_found("Assessment", id))?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::validation("Title is required"));
            }
            assessment.title = title;
        }
        if let Some(job_id) = patch.job_id {
            ensure_job_exists(&conn, &job_id)?;
            assessment.job_id = job_id;
        }
        if let Some(sections) = patch.sections {
            validate_sections(&sections)?;
            assessment.sections = with_assigned_ids(sections);
        }

        conn.execute(
            "UPDATE assessments SET job_id = ?2, title = ?3, sections = ?4 WHERE id = ?1",
            params![
                assessment.id,
                assessment.job_id,
                assessment.title,
                to_json(&assessment.sections)?,
            ],
        )?;
        Ok(assessment)
    }

    /// Delete an assessment and every response submitted against it.
    pub fn delete_assessment(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM assessments WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(StoreError::not_found("Assessment", id));
        }
        Ok(())
    }

    // --- Responses ---

    pub fn insert_response(&self, new: NewResponse) -> StoreResult<AssessmentResponse> {
        new.validate()?;
        let conn = self.lock()?;
        let assessment = find_assessment(&conn, &new.assessment_id)?
            .ok_or_else(|| StoreError::validation("Assessment not found"))?;
        if find_candidate(&conn, &new.candidate_id)?.is_none() {
            return Err(StoreError::validation("Candidate not found"));
        }
        validate_answers(&assessment, &new.responses)?;

        let submitted_at = self.clock.now();
        let response = AssessmentResponse {
            id: new_key(),
            assessment_id: new.assessment_id,
            candidate_id: new.candidate_id,
            responses: new.responses,
            submitted_at,
            completed_at: new.completed.then_some(submitted_at),
        };
        conn.execute(
            "INSERT INTO responses (id, assessment_id, candidate_id, answers, submitted_at,
                                    completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                response.id,
                response.assessment_id,
                response.candidate_id,
                to_json(&response.responses)?,
                response.submitted_at.timestamp_millis(),
                response.completed_at.map(|at| at.timestamp_millis()),
            ],
        )?;
        Ok(response)
    }

    pub fn get_response(&self, id: &str) -> StoreResult<AssessmentResponse> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RESPONSE_COLUMNS} FROM responses WHERE id = ?1"),
            [id],
            row_to_response,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Response", id))
    }

    pub fn responses_for_assessment(
        &self,
        assessment_id: &str,
    ) -> StoreResult<Vec<AssessmentResponse>> {
        self.responses_where("assessment_id", assessment_id)
    }

    pub fn responses_for_candidate(
        &self,
        candidate_id: &str,
    ) -> StoreResult<Vec<AssessmentResponse>> {
        self.responses_where("candidate_id", candidate_id)
    }

    fn responses_where(&self, column: &str, value: &str) -> StoreResult<Vec<AssessmentResponse>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE {column} = ?1
             ORDER BY submitted_at DESC, id"
        ))?;
        let rows = stmt.query_map([value], row_to_response)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_response(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM responses WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(StoreError::not_found("Response", id));
        }
        Ok(())
    }

    // --- Aggregates ---

    pub fn pipeline_stats(&self) -> StoreResult<PipelineStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> StoreResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        };

        let mut stats = PipelineStats {
            total_jobs: count("SELECT COUNT(*) FROM jobs")?,
            active_jobs: count("SELECT COUNT(*) FROM jobs WHERE status = 'active'")?,
            archived_jobs: count("SELECT COUNT(*) FROM jobs WHERE status = 'archived'")?,
            total_candidates: count("SELECT COUNT(*) FROM candidates")?,
            total_assessments: count("SELECT COUNT(*) FROM assessments")?,
            total_responses: count("SELECT COUNT(*) FROM responses")?,
            ..PipelineStats::default()
        };
        stats.candidates_by_stage = Stage::ALL.into_iter().map(|stage| (stage, 0)).collect();

        let mut stmt = conn.prepare("SELECT stage, COUNT(*) FROM candidates GROUP BY stage")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, Stage>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (stage, n) = row?;
            stats
                .candidates_by_stage
                .insert(stage, u64::try_from(n).unwrap_or_default());
        }
        Ok(stats)
    }

    /// Load the sample pipeline when the store holds no jobs yet.
    ///
    /// Returns whether anything was written.
    pub fn seed_if_empty(&self) -> StoreResult<bool> {
        let job_count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        if job_count > 0 {
            return Ok(false);
        }

        let sample_jobs = [
            (
                "Senior Frontend Developer",
                JobStatus::Active,
                ["React", "TypeScript", "CSS"],
                "We are looking for a senior frontend developer with React expertise.",
                [
                    "5+ years React experience",
                    "TypeScript proficiency",
                    "CSS/SCSS skills",
                ],
            ),
            (
                "Backend Engineer",
                JobStatus::Active,
                ["Node.js", "PostgreSQL", "API"],
                "Backend engineer to work on our core API services.",
                ["Node.js experience", "Database design", "RESTful APIs"],
            ),
            (
                "UX Designer",
                JobStatus::Archived,
                ["Figma", "User Research", "Prototyping"],
                "UX Designer to improve our user experience.",
                [
                    "Figma proficiency",
                    "User research experience",
                    "Portfolio required",
                ],
            ),
        ];
        let mut jobs = Vec::new();
        for (title, status, tags, description, requirements) in sample_jobs {
            jobs.push(self.insert_job(NewJob {
                title: title.to_string(),
                status: Some(status),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                description: Some(description.to_string()),
                requirements: Some(requirements.iter().map(|r| r.to_string()).collect()),
            })?);
        }

        let sample_candidates = [
            ("Bob Johnson", "bob.johnson@example.com", 1, Stage::Tech),
            ("Jane Smith", "jane.smith@example.com", 0, Stage::Screen),
            ("John Doe", "john.doe@example.com", 0, Stage::Applied),
        ];
        for (name, email, job_index, stage) in sample_candidates {
            let job_id = jobs
                .get(job_index)
                .map(|job| job.id.clone())
                .ok_or_else(|| StoreError::validation("sample job missing"))?;
            self.insert_candidate(NewCandidate {
                name: name.to_string(),
                email: email.to_string(),
                job_id,
                stage: Some(stage),
                resume: None,
            })?;
        }
        info!(jobs = jobs.len(), "seeded sample pipeline");
        Ok(true)
    }
}

// --- Schema ---

fn migrate(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::validation(format!(
            "database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }
    if version == SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        r#"
        BEGIN;
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'archived')),
            tags TEXT NOT NULL DEFAULT '[]',
            sort_order INTEGER NOT NULL UNIQUE,
            description TEXT,
            requirements TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS candidates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            stage TEXT NOT NULL DEFAULT 'applied'
                CHECK (stage IN ('applied', 'screen', 'tech', 'offer', 'hired', 'rejected')),
            applied_at INTEGER NOT NULL,
            notes TEXT NOT NULL DEFAULT '[]',
            resume TEXT
        );

        CREATE TABLE IF NOT EXISTS assessments (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            sections TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            assessment_id TEXT NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
            candidate_id TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
            answers TEXT NOT NULL DEFAULT '[]',
            submitted_at INTEGER NOT NULL,
            completed_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE INDEX IF NOT EXISTS idx_candidates_job ON candidates(job_id);
        CREATE INDEX IF NOT EXISTS idx_candidates_stage ON candidates(stage);
        CREATE INDEX IF NOT EXISTS idx_candidates_applied ON candidates(applied_at);
        CREATE INDEX IF NOT EXISTS idx_assessments_job ON assessments(job_id);
        CREATE INDEX IF NOT EXISTS idx_responses_assessment ON responses(assessment_id);
        CREATE INDEX IF NOT EXISTS idx_responses_candidate ON responses(candidate_id);

        PRAGMA user_version = 1;
        COMMIT;
        "#,
    )?;
    info!(version = SCHEMA_VERSION, "record store schema created");
    Ok(())
}

/// Newest stamp already persisted, so a reopened store keeps counting upward.
fn latest_stamp(conn: &Connection) -> StoreResult<i64> {
    let latest: Option<i64> = conn.query_row(
        "SELECT MAX(stamp) FROM (
             SELECT MAX(updated_at) AS stamp FROM jobs
             UNION ALL SELECT MAX(applied_at) FROM candidates
             UNION ALL SELECT MAX(created_at) FROM assessments
             UNION ALL SELECT MAX(submitted_at) FROM responses
             UNION ALL SELECT MAX(json_extract(note.value, '$.createdAt'))
                 FROM candidates, json_each(candidates.notes) AS note
         )",
        [],
        |row| row.get(0),
    )?;
    Ok(latest.unwrap_or(i64::MIN))
}

// --- Row helpers ---

/// Mentions form a set: blanks dropped, first occurrence kept.
fn distinct_mentions(mentions: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    mentions
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty() && seen.insert(m.clone()))
        .collect()
}

fn find_job(conn: &Connection, id: &str) -> StoreResult<Option<Job>> {
    Ok(conn
        .query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
            [id],
            row_to_job,
        )
        .optional()?)
}

fn find_candidate(conn: &Connection, id: &str) -> StoreResult<Option<Candidate>> {
    Ok(conn
        .query_row(
            &format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"),
            [id],
            row_to_candidate,
        )
        .optional()?)
}

fn find_assessment(conn: &Connection, id: &str) -> StoreResult<Option<Assessment>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"),
            [id],
            row_to_assessment,
        )
        .optional()?)
}

fn jobs_by_ids<'a>(
    tx: &Transaction<'_>,
    ids: impl Iterator<Item = &'a str>,
) -> StoreResult<Vec<Job>> {
    let mut jobs = Vec::new();
    for id in ids {
        if let Some(job) = find_job(tx, id)? {
            jobs.push(job);
        }
    }
    jobs.sort_by_key(|job| job.order);
    Ok(jobs)
}

/// Referenced job must exist; a dangling reference is the caller's mistake.
fn ensure_job_exists(conn: &Connection, job_id: &str) -> StoreResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM jobs WHERE id = ?1)",
        [job_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::validation("Job not found"))
    }
}

fn with_assigned_ids(mut sections: Vec<Section>) -> Vec<Section> {
    for section in &mut sections {
        if section.id.is_empty() {
            section.id = new_key();
        }
        for question in &mut section.questions {
            if question.id.is_empty() {
                question.id = new_key();
            }
        }
    }
    sections
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn optional_json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Timestamp> {
    let millis: i64 = row.get(idx)?;
    Timestamp::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn row_to_job(row: &Row) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        status: row.get(3)?,
        tags: json_column(row, 4)?,
        order: row.get(5)?,
        description: row.get(6)?,
        requirements: optional_json_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn row_to_candidate(row: &Row) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        job_id: row.get(3)?,
        stage: row.get(4)?,
        applied_at: timestamp_column(row, 5)?,
        notes: json_column(row, 6)?,
        resume: row.get(7)?,
    })
}

fn row_to_assessment(row: &Row) -> rusqlite::Result<Assessment> {
    Ok(Assessment {
        id: row.get(0)?,
        job_id: row.get(1)?,
        title: row.get(2)?,
        sections: json_column(row, 3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn row_to_response(row: &Row) -> rusqlite::Result<AssessmentResponse> {
    let completed_at: Option<i64> = row.get(5)?;
    Ok(AssessmentResponse {
        id: row.get(0)?,
        assessment_id: row.get(1)?,
        candidate_id: row.get(2)?,
        responses: json_column(row, 3)?,
        submitted_at: timestamp_column(row, 4)?,
        completed_at: completed_at
            .map(|millis| {
                Timestamp::from_timestamp_millis(millis)
                    .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, millis))
            })
            .transpose()?,
    })
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Stage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Stage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
