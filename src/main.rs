use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voice_interview::config::ReactorConfig;
use voice_interview::driver::{self, Settings};
use voice_interview::kernel::session::SessionRequest;

const DEFAULT_WS_BASE: &str = "ws://localhost:8000/ws/interview";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let settings = settings_from_env()?;
    tracing::info!(
        url = %settings.url,
        candidate = %settings.request.candidate_name,
        role = %settings.request.job_role,
        "starting interview"
    );

    let session = driver::run(settings)
        .await
        .context("interview session failed")?;

    match session {
        Some(session) if session.completed => {
            println!("Interview {} complete.", session.id);
            if let Some(report) = &session.report {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
        }
        Some(session) => println!("Interview {} ended early.", session.id),
        None => println!("No interview session was started."),
    }
    Ok(())
}

fn settings_from_env() -> Result<Settings> {
    let url = std::env::var("INTERVIEW_WS_URL")
        .unwrap_or_else(|_| format!("{DEFAULT_WS_BASE}/{}", uuid::Uuid::new_v4()));
    let candidate_name = std::env::var("CANDIDATE_NAME").unwrap_or_else(|_| "Candidate".into());
    let job_role = std::env::var("JOB_ROLE").unwrap_or_else(|_| "Software Engineer".into());

    let config = match std::env::var("INTERVIEW_CONFIG") {
        Ok(path) => ReactorConfig::from_json_file(&path)
            .with_context(|| format!("failed to load INTERVIEW_CONFIG from {path}"))?,
        Err(_) => ReactorConfig::default(),
    };

    Ok(Settings {
        url,
        request: SessionRequest::new(candidate_name, job_role),
        config,
    })
}
