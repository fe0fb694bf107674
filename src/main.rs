use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use talentflow::chaos::{LatencyProfile, TokioSleeper};
use talentflow::client::{
    ApiClient, AssessmentQuery, CandidateQuery, HttpTransport, JobQuery, Transport,
};
use talentflow::clock::MonotonicClock;
use talentflow::config::{self, DEFAULT_FAILURE_RATE, GatewayConfig};
use talentflow::db::Store;
use talentflow::gateway::Gateway;
use talentflow::models::{
    AssessmentPatch, AssessmentResponse, Job, JobOrderUpdate, JobPatch, NewAssessment,
    NewCandidate, NewJob, NewNote, NewResponse, Stage,
};
use talentflow::query::DEFAULT_PAGE_SIZE;

#[derive(Parser)]
#[command(name = "talentflow")]
#[command(about = "Recruiting pipeline - jobs, candidates, and assessments")]
struct Cli {
    /// Database file
    #[arg(long, env = "TALENTFLOW_DB", global = true)]
    db: Option<PathBuf>,

    /// Probability that a request fails with a simulated server error
    #[arg(long, env = "TALENTFLOW_FAILURE_RATE", default_value_t = DEFAULT_FAILURE_RATE, global = true)]
    failure_rate: f64,

    /// Skip the simulated network latency
    #[arg(long, env = "TALENTFLOW_NO_LATENCY", global = true)]
    no_latency: bool,

    /// Seed for simulated latency and failures
    #[arg(long, env = "TALENTFLOW_SEED", global = true)]
    seed: Option<u64>,

    /// Talk to a running API at this base URL instead of the local database
    #[arg(long, env = "TALENTFLOW_REMOTE", global = true)]
    remote: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init {
        /// Load sample jobs and candidates when the database is empty
        #[arg(long)]
        seed: bool,
    },

    /// Manage job postings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Manage candidates
    Candidates {
        #[command(subcommand)]
        command: CandidateCommands,
    },

    /// Manage assessments
    Assessments {
        #[command(subcommand)]
        command: AssessmentCommands,
    },

    /// Submit an assessment response from a JSON file
    Respond {
        /// Path to response JSON (assessmentId, candidateId, responses, completed)
        file: PathBuf,
    },

    /// Show pipeline statistics
    Stats,
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs in board order
    List {
        /// Filter by status (active, archived, all)
        #[arg(short, long)]
        status: Option<String>,

        /// Search title, description, and tags
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Comma separated tags; any match counts
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: i64,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE as i64)]
        page_size: i64,
    },

    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Add a job posting
    Add {
        title: String,

        /// Comma separated tags
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Requirement line (repeatable)
        #[arg(short, long = "requirement")]
        requirements: Vec<String>,
    },

    /// Edit a job posting
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Comma separated tags, replacing the current ones
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Archive a job
    Archive { id: String },

    /// Restore an archived job
    Unarchive { id: String },

    /// Delete a job with its candidates and assessments
    Delete { id: String },

    /// Move jobs to new positions, as ID=ORDER pairs
    Reorder {
        #[arg(required = true)]
        moves: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CandidateCommands {
    /// List candidates, newest application first
    List {
        /// Filter by stage (applied, screen, tech, offer, hired, rejected, all)
        #[arg(short, long)]
        stage: Option<String>,

        /// Filter by job ID
        #[arg(short, long)]
        job: Option<String>,

        /// Search name and email
        #[arg(short = 'q', long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: i64,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE as i64)]
        page_size: i64,
    },

    /// Show candidate details and notes
    Show { id: String },

    /// Add a candidate to a job
    Add {
        name: String,
        email: String,

        /// Job ID
        #[arg(short, long)]
        job: String,

        /// Resume text or link
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Move a candidate to a pipeline stage
    Stage { id: String, stage: Stage },

    /// Attach a note; @name tokens are recorded as mentions
    Note {
        id: String,
        content: String,

        #[arg(short, long, default_value = "cli")]
        author: String,
    },

    /// Delete a candidate
    Delete { id: String },

    /// List assessment responses submitted by a candidate
    Responses { id: String },
}

#[derive(Subcommand)]
enum AssessmentCommands {
    /// List assessments
    List {
        /// Filter by job ID
        #[arg(short, long)]
        job: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: i64,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE as i64)]
        page_size: i64,
    },

    /// Show an assessment with its questions
    Show { id: String },

    /// Create an assessment from a JSON file (jobId, title, sections)
    Add { file: PathBuf },

    /// Replace parts of an assessment from a JSON file
    Update { id: String, file: PathBuf },

    /// Delete an assessment and its responses
    Delete { id: String },

    /// List responses submitted for an assessment
    Responses { id: String },
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_moves(moves: &[String]) -> Result<Vec<JobOrderUpdate>> {
    moves
        .iter()
        .map(|pair| {
            let (id, order) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected ID=ORDER, got '{}'", pair))?;
            let order = order
                .trim()
                .parse::<i64>()
                .with_context(|| format!("order in '{}' is not a number", pair))?;
            Ok(JobOrderUpdate {
                id: id.trim().to_string(),
                order,
            })
        })
        .collect()
}

fn extract_mentions(content: &str) -> Result<Vec<String>> {
    let mention = Regex::new(r"@([A-Za-z0-9_.-]+)")?;
    let mut seen = HashSet::new();
    Ok(mention
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_jobs(jobs: &[Job]) {
    println!("{:<6} {:<36} {:<9} {:<30} {:<20}", "ORDER", "ID", "STATUS", "TITLE", "TAGS");
    println!("{}", "-".repeat(105));
    for job in jobs {
        println!(
            "{:<6} {:<36} {:<9} {:<30} {:<20}",
            job.order,
            job.id,
            job.status,
            truncate(&job.title, 28),
            truncate(&job.tags.join(", "), 20)
        );
    }
}

fn print_responses(responses: &[AssessmentResponse]) {
    if responses.is_empty() {
        println!("No responses found.");
        return;
    }
    println!("{:<36} {:<36} {:<8} {:<20}", "ID", "CANDIDATE", "ANSWERS", "SUBMITTED");
    println!("{}", "-".repeat(103));
    for response in responses {
        println!(
            "{:<36} {:<36} {:<8} {:<20}{}",
            response.id,
            response.candidate_id,
            response.responses.len(),
            response.submitted_at.format("%Y-%m-%d %H:%M"),
            if response.completed_at.is_some() { "" } else { " (draft)" }
        );
    }
}

fn build_client(cli: &Cli) -> Result<ApiClient> {
    let transport: Arc<dyn Transport> = match &cli.remote {
        Some(url) => Arc::new(HttpTransport::new(url)?),
        None => {
            let store = open_store(cli)?;
            let config = GatewayConfig {
                failure_rate: cli.failure_rate,
                latency: if cli.no_latency {
                    LatencyProfile::none()
                } else {
                    LatencyProfile::default()
                },
                seed: cli.seed,
            };
            Arc::new(Gateway::new(Arc::new(store), &config, Arc::new(TokioSleeper))?)
        }
    };
    Ok(ApiClient::new(transport))
}

fn open_store(cli: &Cli) -> Result<Store> {
    let path = cli.db.clone().unwrap_or_else(config::default_db_path);
    Store::open(&path, MonotonicClock::system())
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { seed } = &cli.command {
        if cli.remote.is_some() {
            bail!("init works on the local database; drop --remote");
        }
        let store = open_store(&cli)?;
        let location = store
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if *seed && store.seed_if_empty()? {
            println!("Loaded sample pipeline.");
        }
        store.close()?;
        println!("Database initialized at {}", location);
        return Ok(());
    }

    let client = build_client(&cli)?;

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Jobs { command } => match command {
            JobCommands::List {
                status,
                search,
                tags,
                page,
                page_size,
            } => {
                let result = client
                    .list_jobs(&JobQuery {
                        page,
                        page_size,
                        search,
                        status,
                        tags: split_tags(tags.as_deref()),
                    })
                    .await?;
                if result.data.is_empty() {
                    println!("No jobs found.");
                } else {
                    print_jobs(&result.data);
                    println!(
                        "\nPage {}/{} ({} jobs)",
                        result.pagination.page,
                        result.pagination.total_pages,
                        result.pagination.total
                    );
                }
            }

            JobCommands::Show { id } => {
                let job = client.get_job(&id).await?;
                println!("Job {}", job.id);
                println!("Title: {}", job.title);
                println!("Slug: {}", job.slug);
                println!("Status: {}", job.status);
                println!("Order: {}", job.order);
                if !job.tags.is_empty() {
                    println!("Tags: {}", job.tags.join(", "));
                }
                println!("Created: {}", job.created_at);
                println!("Updated: {}", job.updated_at);
                if let Some(description) = &job.description {
                    println!("\n{}", description);
                }
                if let Some(requirements) = &job.requirements {
                    println!("\nRequirements:");
                    for requirement in requirements {
                        println!("  - {}", requirement);
                    }
                }
            }

            JobCommands::Add {
                title,
                tags,
                description,
                requirements,
            } => {
                let job = client
                    .create_job(&NewJob {
                        title,
                        status: None,
                        tags: split_tags(tags.as_deref()),
                        description,
                        requirements: (!requirements.is_empty()).then_some(requirements),
                    })
                    .await?;
                println!("Added job {} at position {}", job.id, job.order);
            }

            JobCommands::Edit {
                id,
                title,
                tags,
                description,
            } => {
                let job = client
                    .update_job(
                        &id,
                        &JobPatch {
                            title,
                            tags: tags.as_deref().map(|raw| split_tags(Some(raw))),
                            description,
                            ..JobPatch::default()
                        },
                    )
                    .await?;
                println!("Updated job {} ({})", job.id, job.title);
            }

            JobCommands::Archive { id } => {
                let job = client.archive_job(&id).await?;
                println!("Archived '{}'.", job.title);
            }

            JobCommands::Unarchive { id } => {
                let job = client.unarchive_job(&id).await?;
                println!("Restored '{}'.", job.title);
            }

            JobCommands::Delete { id } => {
                client.delete_job(&id).await?;
                println!("Deleted job {}.", id);
            }

            JobCommands::Reorder { moves } => {
                let updates = parse_moves(&moves)?;
                let jobs = client.reorder_jobs(&updates).await?;
                print_jobs(&jobs);
            }
        },

        Commands::Candidates { command } => match command {
            CandidateCommands::List {
                stage,
                job,
                search,
                page,
                page_size,
            } => {
                let result = client
                    .list_candidates(&CandidateQuery {
                        page,
                        page_size,
                        search,
                        stage,
                        job_id: job,
                    })
                    .await?;
                if result.data.is_empty() {
                    println!("No candidates found.");
                } else {
                    println!("{:<36} {:<9} {:<22} {:<28}", "ID", "STAGE", "NAME", "EMAIL");
                    println!("{}", "-".repeat(98));
                    for candidate in &result.data {
                        println!(
                            "{:<36} {:<9} {:<22} {:<28}",
                            candidate.id,
                            candidate.stage,
                            truncate(&candidate.name, 20),
                            truncate(&candidate.email, 28)
                        );
                    }
                    println!(
                        "\nPage {}/{} ({} candidates)",
                        result.pagination.page,
                        result.pagination.total_pages,
                        result.pagination.total
                    );
                }
            }

            CandidateCommands::Show { id } => {
                let candidate = client.get_candidate(&id).await?;
                println!("Candidate {}", candidate.id);
                println!("Name: {}", candidate.name);
                println!("Email: {}", candidate.email);
                println!("Job: {}", candidate.job_id);
                println!("Stage: {}", candidate.stage);
                println!("Applied: {}", candidate.applied_at);
                if let Some(resume) = &candidate.resume {
                    println!("Resume: {}", resume);
                }
                if !candidate.notes.is_empty() {
                    println!("\nNotes ({}):", candidate.notes.len());
                    for note in &candidate.notes {
                        println!(
                            "  [{}] {}: {}",
                            note.created_at.format("%Y-%m-%d %H:%M"),
                            note.author_id,
                            note.content
                        );
                    }
                }
            }

            CandidateCommands::Add {
                name,
                email,
                job,
                resume,
            } => {
                let candidate = client
                    .create_candidate(&NewCandidate {
                        name,
                        email,
                        job_id: job,
                        stage: None,
                        resume,
                    })
                    .await?;
                println!("Added candidate {} ({})", candidate.id, candidate.stage);
            }

            CandidateCommands::Stage { id, stage } => {
                let candidate = client.update_candidate_stage(&id, stage).await?;
                println!("Moved {} to {}.", candidate.name, candidate.stage);
            }

            CandidateCommands::Note {
                id,
                content,
                author,
            } => {
                let mentions = extract_mentions(&content)?;
                let candidate = client
                    .add_note(
                        &id,
                        &NewNote {
                            content,
                            mentions,
                            author_id: author,
                        },
                    )
                    .await?;
                println!("Note added ({} total).", candidate.notes.len());
            }

            CandidateCommands::Delete { id } => {
                client.delete_candidate(&id).await?;
                println!("Deleted candidate {}.", id);
            }

            CandidateCommands::Responses { id } => {
                let responses = client.candidate_responses(&id).await?;
                print_responses(&responses);
            }
        },

        Commands::Assessments { command } => match command {
            AssessmentCommands::List {
                job,
                page,
                page_size,
            } => {
                let result = client
                    .list_assessments(&AssessmentQuery {
                        page,
                        page_size,
                        job_id: job,
                    })
                    .await?;
                if result.data.is_empty() {
                    println!("No assessments found.");
                } else {
                    println!("{:<36} {:<36} {:<30} {:>9}", "ID", "JOB", "TITLE", "QUESTIONS");
                    println!("{}", "-".repeat(114));
                    for assessment in &result.data {
                        println!(
                            "{:<36} {:<36} {:<30} {:>9}",
                            assessment.id,
                            assessment.job_id,
                            truncate(&assessment.title, 28),
                            assessment.questions().count()
                        );
                    }
                }
            }

            AssessmentCommands::Show { id } => {
                let assessment = client.get_assessment(&id).await?;
                println!("Assessment {}", assessment.id);
                println!("Title: {}", assessment.title);
                println!("Job: {}", assessment.job_id);
                for section in &assessment.sections {
                    println!("\n## {}", section.title);
                    for question in &section.questions {
                        let marker = if question.required { "*" } else { " " };
                        println!("  {} [{}] {}", marker, question.id, question.title);
                    }
                }
            }

            AssessmentCommands::Add { file } => {
                let new: NewAssessment = read_json(&file)?;
                let assessment = client.create_assessment(&new).await?;
                println!(
                    "Created assessment {} with {} questions.",
                    assessment.id,
                    assessment.questions().count()
                );
            }

            AssessmentCommands::Update { id, file } => {
                let patch: AssessmentPatch = read_json(&file)?;
                let assessment = client.update_assessment(&id, &patch).await?;
                println!("Updated assessment {}.", assessment.id);
            }

            AssessmentCommands::Delete { id } => {
                client.delete_assessment(&id).await?;
                println!("Deleted assessment {}.", id);
            }

            AssessmentCommands::Responses { id } => {
                let responses = client.assessment_responses(&id).await?;
                print_responses(&responses);
            }
        },

        Commands::Respond { file } => {
            let new: NewResponse = read_json(&file)?;
            let response = client.submit_response(&new).await?;
            println!("Recorded response {}.", response.id);
        }

        Commands::Stats => {
            let stats = client.stats().await?;
            println!(
                "Jobs: {} ({} active, {} archived)",
                stats.total_jobs, stats.active_jobs, stats.archived_jobs
            );
            println!("Candidates: {}", stats.total_candidates);
            for stage in Stage::ALL {
                let count = stats.candidates_by_stage.get(&stage).copied().unwrap_or(0);
                println!("  {:<9} {:>5}", stage, count);
            }
            println!("Assessments: {}", stats.total_assessments);
            println!("Responses: {}", stats.total_responses);
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
