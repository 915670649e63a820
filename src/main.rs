use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod export;
mod forms;
mod models;
mod record;
mod report;
mod router;
mod session;
mod stats;

use api::{FeedbackRepository, HttpTransport};
use config::Config;
use error::FeedbackError;
use forms::{DynamicForm, FixedForm, FormInput, FormRenderer, CUSTOM_FORM_IDS};
use record::WireShape;
use router::{Resolution, Route, CUSTOM_FORM_PREFIX};
use session::Session;

type Repository = FeedbackRepository<HttpTransport>;

#[derive(Parser)]
#[command(name = "feedback-survey")]
#[command(about = "Submit feedback surveys and review submissions as an admin", long_about = None)]
struct Cli {
    /// Backend base URL (overrides FEEDBACK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Login form: an email address, or the admin username
    #[arg(long, global = true, requires = "password")]
    user: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
    /// Admin gate username
    #[arg(long, global = true, requires = "admin_password")]
    admin_user: Option<String>,
    #[arg(long, global = true)]
    admin_password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a path and show the view it leads to
    Open { path: String },
    /// List the built-in survey forms
    Library,
    /// Create a shareable survey link for any topic
    NewForm { topic: String },
    /// Submit the standard survey for a topic
    Submit {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Course, item, store or event the review is about
        #[arg(long, default_value = "")]
        identifier: String,
        /// Star rating from 1 to 5
        #[arg(long, default_value = "")]
        rating: String,
        #[arg(long, default_value = "")]
        comments: String,
        /// Yes or No
        #[arg(long, default_value = "Yes")]
        recommend: String,
    },
    /// Submit a custom form, e.g. --answer 1=Avery --answer field_2="Demo day"
    SubmitCustom {
        form_id: String,
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(String, String)>,
    },
    /// Show statistics and all submissions
    Dashboard {
        /// Also write the dashboard as markdown
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a submission, then reload the list
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Export all submissions
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    /// Canonical records, fields at the top level
    Json,
    /// Canonical records, fields under `answers`
    JsonNested,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feedback_survey=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.api_url.as_deref());
    info!("Backend API URL: {}", config.feedback_url());

    let session = sign_in(&cli)?;
    let repo = FeedbackRepository::new(HttpTransport::new(config.clone()));

    match cli.command {
        Commands::Open { path } => {
            let output = open(&path, &session, &repo, &config).await?;
            print!("{output}");
        }
        Commands::Library => {
            require(router::FORM_LIBRARY_PATH, &session)?;
            print!("{}", report::build_library());
        }
        Commands::NewForm { topic } => {
            let path = forms::create_topic(&topic)?;
            println!("Form created. Share this link to collect reviews: {path}");
        }
        Commands::Submit {
            topic,
            name,
            email,
            identifier,
            rating,
            comments,
            recommend,
        } => {
            let route = require(&router::survey_path(&topic), &session)?;
            let topic = match route {
                Route::Survey { topic } => topic,
                _ => bail!("{topic:?} is not a standard survey topic"),
            };
            let form = FixedForm::new(&topic);
            let input: FormInput = [
                ("name", name),
                ("email", email),
                ("courseName", identifier),
                ("rating", rating),
                ("comments", comments),
                ("recommend", recommend),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
            submit(&repo, &form, &input).await?;
        }
        Commands::SubmitCustom { form_id, answers } => {
            let form_id = if form_id.starts_with(CUSTOM_FORM_PREFIX) {
                form_id
            } else {
                format!("{CUSTOM_FORM_PREFIX}{form_id}")
            };
            let route = require(&format!("/survey/{form_id}"), &session)?;
            let form = match route {
                Route::CustomSurvey { form_id } => DynamicForm::lookup(&form_id),
                _ => None,
            }
            .with_context(|| invalid_custom_form(&form_id))?;
            let input: FormInput = answers.into_iter().collect();
            submit(&repo, &form, &input).await?;
        }
        Commands::Dashboard { out } => {
            require(router::ADMIN_PATH, &session)?;
            let dashboard = dashboard(&repo, &config).await?;
            print!("{dashboard}");
            if let Some(out) = out {
                std::fs::write(&out, &dashboard)?;
                println!("Dashboard written to {}.", out.display());
            }
        }
        Commands::Delete { id, yes } => {
            require(router::ADMIN_PATH, &session)?;
            if !yes {
                bail!("Refusing to delete feedback {id} without --yes");
            }
            repo.remove(&id)
                .await
                .with_context(|| format!("Failed to delete feedback {id}"))?;
            let records = list_or_explain(&repo, &config).await?;
            let statistics = stats::aggregate(&records);
            println!(
                "Deleted {id}. {} submissions remain (avg rating {:.2}, {}% recommend).",
                statistics.total, statistics.avg_rating, statistics.recommend_rate
            );
        }
        Commands::Export { out, format } => {
            require(router::ADMIN_PATH, &session)?;
            let records = list_or_explain(&repo, &config).await?;
            match format {
                ExportFormat::Csv => {
                    let file = std::fs::File::create(&out)
                        .with_context(|| format!("failed to create {}", out.display()))?;
                    export::write_csv(&records, file)?;
                }
                ExportFormat::Json | ExportFormat::JsonNested => {
                    let shape = match format {
                        ExportFormat::JsonNested => WireShape::Nested,
                        _ => WireShape::Flat,
                    };
                    let values: Vec<_> = records
                        .iter()
                        .map(|record| record::denormalize(record, shape))
                        .collect();
                    std::fs::write(&out, serde_json::to_string_pretty(&values)?)?;
                }
            }
            println!("Exported {} submissions to {}.", records.len(), out.display());
        }
    }

    let session = session.logout();
    debug!(?session, "signed out");
    Ok(())
}

fn sign_in(cli: &Cli) -> anyhow::Result<Session> {
    let mut session = Session::default();
    if let Some(user) = &cli.user {
        session = session.sign_in(user, cli.password.as_deref().unwrap_or_default())?;
    }
    if let Some(admin) = &cli.admin_user {
        session = session.admin_sign_in(admin, cli.admin_password.as_deref().unwrap_or_default())?;
    }
    Ok(session)
}

/// Resolves a path through the access gates; a redirect aborts the command.
fn require(path: &str, session: &Session) -> anyhow::Result<Route> {
    match router::resolve_path(path, session) {
        Resolution::View(route) => Ok(route),
        Resolution::Redirect(target) => bail!(
            "{path} is not available without signing in (redirected to {target}); \
             pass --user/--password or --admin-user/--admin-password"
        ),
    }
}

async fn open(
    path: &str,
    session: &Session,
    repo: &Repository,
    config: &Config,
) -> anyhow::Result<String> {
    let mut route = Route::parse(path);
    // Every redirect target resolves within two hops.
    for _ in 0..3 {
        match router::resolve(route.clone(), session) {
            Resolution::View(view) => return render_view(&view, repo, config).await,
            Resolution::Redirect(target) => {
                println!("{} -> {target}", route.path());
                route = Route::parse(target);
            }
        }
    }
    bail!("too many redirects while opening {path}")
}

async fn render_view(route: &Route, repo: &Repository, config: &Config) -> anyhow::Result<String> {
    let output = match route {
        Route::Login => {
            "Sign in with --user <EMAIL> --password <PASSWORD>.\n".to_string()
        }
        Route::AdminLogin => {
            "Administrator login is required to view analysis and builder tools.\n\
             Use --admin-user <USERNAME> --admin-password <PASSWORD>.\n"
                .to_string()
        }
        Route::FormLibrary => report::build_library(),
        Route::Survey { topic } => report::build_form(&FixedForm::new(topic)),
        Route::CustomSurvey { form_id } => match DynamicForm::lookup(form_id) {
            Some(form) => report::build_form(&form),
            None => format!("{}\n", invalid_custom_form(form_id)),
        },
        Route::Admin => dashboard(repo, config).await?,
        Route::Root | Route::Unmatched => format!("Nothing to show at {}\n", route.path()),
    };
    Ok(output)
}

async fn submit(repo: &Repository, form: &dyn FormRenderer, input: &FormInput) -> anyhow::Result<()> {
    let result = match form.build_payload(input) {
        Ok(payload) => repo.create(&payload).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            println!("Thank you! Your feedback for {} was submitted.", form.title());
            Ok(())
        }
        Err(err) if err.is_client_side() => Err(err.into()),
        Err(err) => {
            error!("submission failed: {err}");
            Err(anyhow::Error::new(err).context("Submission Failed. Check backend connection."))
        }
    }
}

async fn dashboard(repo: &Repository, config: &Config) -> anyhow::Result<String> {
    let records = list_or_explain(repo, config).await?;
    let statistics = stats::aggregate(&records);
    Ok(report::build_dashboard(
        &records,
        &statistics,
        &config.feedback_url(),
        Utc::now(),
    ))
}

async fn list_or_explain(
    repo: &Repository,
    config: &Config,
) -> anyhow::Result<Vec<models::SubmissionRecord>> {
    match repo.list().await {
        Ok(records) => Ok(records),
        Err(FeedbackError::Fetch { total, failures }) => {
            for (index, failure) in &failures {
                error!("record {index}: {} (raw: {})", failure.reason, failure.raw);
            }
            bail!(
                "{} of {total} fetched records could not be read; see the log above",
                failures.len()
            )
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!(
            "Failed to fetch data. Ensure the backend server is running at {}",
            config.feedback_url()
        ))),
    }
}

fn invalid_custom_form(form_id: &str) -> String {
    format!(
        "The custom form link you followed ({form_id}) is invalid or the form has been deleted. \
         Known forms: {}",
        CUSTOM_FORM_IDS.join(", ")
    )
}

fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field key in {raw:?}"));
    }
    let key = if key.chars().all(|c| c.is_ascii_digit()) {
        format!("field_{key}")
    } else {
        key.to_string()
    };
    Ok((key, value.to_string()))
}
