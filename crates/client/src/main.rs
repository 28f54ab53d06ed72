//! oidcrp CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use oidcrp_auth::OidcSecurityService;
use oidcrp_client::cli::{Cli, Commands, OutputFormat};
use oidcrp_client::output::{format_problems, format_report};
use oidcrp_client::session::{check_auth_report, connect, describe_event};
use oidcrp_core::auth::validate_config;
use oidcrp_core::config::OpenIdConfiguration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oidcrp_client=debug,oidcrp_auth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    #[cfg(feature = "mock")]
    let mock_idp_url = cli.mock_idp_url.as_deref();
    #[cfg(not(feature = "mock"))]
    let mock_idp_url: Option<&str> = None;

    match cli.command {
        Commands::ValidateConfig => {
            let problems = validate_config(&OpenIdConfiguration::from_env());
            println!("{}", format_problems(&problems, cli.format));
            Ok(exit_code(problems.is_empty()))
        }
        Commands::CheckAuth { url } => {
            let service = connect(OpenIdConfiguration::from_env(), mock_idp_url).await?;
            let report = check_auth_report(&service, &url).await;
            println!("{}", format_report(&report, cli.format));
            Ok(exit_code(report.authenticated))
        }
        Commands::LoginUrl => {
            let service = connect(OpenIdConfiguration::from_env(), mock_idp_url).await?;
            println!("{}", service.authorize_url().await?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Login { watch } => {
            let service = connect(OpenIdConfiguration::from_env(), mock_idp_url).await?;
            let authorize_url = service.authorize_url().await?;

            if !cli.quiet {
                eprintln!("Open this URL in a browser and sign in:\n\n  {authorize_url}\n");
                eprintln!("Then paste the URL you were redirected to:");
            }
            let callback_url = read_line().await?;

            let report = check_auth_report(&service, callback_url.trim()).await;
            println!("{}", format_report(&report, cli.format));

            if report.authenticated && watch {
                watch_events(&service, cli.format).await;
                service.logoff_local();
            }
            Ok(exit_code(report.authenticated))
        }
        #[cfg(feature = "mock")]
        Commands::MockIdp { port } => {
            oidcrp_auth::mock_idp::MockIdpServer::new(port)
                .run()
                .await
                .context("Mock IdP server failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn read_line() -> Result<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read callback URL")?;
    Ok(line)
}

/// Print auth events until Ctrl+C or the event channel closes.
async fn watch_events(service: &OidcSecurityService, format: OutputFormat) {
    let mut events = service.subscribe();
    tracing::info!("Watching auth events, press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let line = describe_event(&event);
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::json!({ "event": line }))
                        }
                        OutputFormat::Pretty => println!("{}", line),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} auth events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Stopping");
                break;
            }
        }
    }
}
