//! Command-line driver for the document API: uploads a file, triggers
//! processing, and writes the simplified result as markdown. The whole run
//! is pushed through the same view state machine the web client uses.

use std::path::Path;
use std::process::ExitCode;

use plainlex::client::ApiClient;
use plainlex::domain::{ProcessOptions, SimplificationLevel, TargetAudience};
use plainlex::presenter;
use plainlex::view::{ViewEvent, ViewState, reduce};

struct CliArgs {
    file: String,
    base_url: String,
    options: ProcessOptions,
    token: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut file = None;
    let mut base_url = "http://127.0.0.1:8000".to_string();
    let mut options = ProcessOptions::default();
    let mut token = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--level" => {
                let value = args.next().ok_or("--level needs a value")?;
                options.simplification_level = match value.as_str() {
                    "basic" => SimplificationLevel::Basic,
                    "standard" => SimplificationLevel::Standard,
                    "detailed" => SimplificationLevel::Detailed,
                    other => return Err(format!("unknown level {other:?}")),
                };
            }
            "--audience" => {
                let value = args.next().ok_or("--audience needs a value")?;
                options.target_audience = match value.as_str() {
                    "general_public" => TargetAudience::GeneralPublic,
                    "business_owners" => TargetAudience::BusinessOwners,
                    "individuals" => TargetAudience::Individuals,
                    "students" => TargetAudience::Students,
                    other => return Err(format!("unknown audience {other:?}")),
                };
            }
            "--include-original" => options.include_original = true,
            "--base-url" => base_url = args.next().ok_or("--base-url needs a value")?,
            "--token" => token = Some(args.next().ok_or("--token needs a value")?),
            other if other.starts_with("--") => return Err(format!("unknown flag {other:?}")),
            other => {
                if file.replace(other.to_string()).is_some() {
                    return Err("only one input file is supported".to_string());
                }
            }
        }
    }

    Ok(CliArgs {
        file: file.ok_or("no input file given")?,
        base_url,
        options,
        token,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!(
                "usage: plainlex-cli <file> [--level basic|standard|detailed] \
                 [--audience general_public|business_owners|individuals|students] \
                 [--include-original] [--base-url URL] [--token TOKEN]"
            );
            return ExitCode::from(2);
        }
    };

    let data = match std::fs::read(&args.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args.file);
            return ExitCode::FAILURE;
        }
    };
    let filename = Path::new(&args.file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.clone());

    let mut client = ApiClient::new(&args.base_url);
    if let Some(token) = &args.token {
        client = client.with_token(token);
    }

    let mut state = reduce(ViewState::Idle, ViewEvent::UploadStarted);
    eprintln!("uploading {filename}...");

    let event = match client.upload(&filename, None, data).await {
        Ok(upload) => ViewEvent::UploadSucceeded(upload),
        Err(e) => ViewEvent::UploadFailed(e.to_string()),
    };
    state = reduce(state, event);

    // Upload success auto-triggers processing; its outcome always comes back
    // through the reducer so a failure cannot be lost.
    if let ViewState::Processing { upload } = &state {
        eprintln!("processing document {}...", upload.document_id);
        let event = match client.process(upload.document_id, &args.options).await {
            Ok(document) => ViewEvent::ProcessingSucceeded(Box::new(document)),
            Err(e) => ViewEvent::ProcessingFailed(e.to_string()),
        };
        state = reduce(state, event);
    }

    match state {
        ViewState::Completed { document } => {
            let markdown = presenter::render_markdown(&document);
            let out_file = presenter::download_filename(&document);
            if let Err(e) = std::fs::write(&out_file, &markdown) {
                eprintln!("warning: could not save {out_file}: {e}");
            } else {
                eprintln!("saved {out_file}");
            }
            println!("{markdown}");
            ExitCode::SUCCESS
        }
        ViewState::Failed { message } => {
            eprintln!("failed: {message}");
            eprintln!("try again by re-running the command");
            ExitCode::FAILURE
        }
        other => {
            eprintln!("unexpected final state: {}", other.name());
            ExitCode::FAILURE
        }
    }
}
