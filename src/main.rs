//! UI Refine CLI.
//!
//! Usage:
//!   ui-refine add --name <screen> --screenshot <image> [--url <url>]
//!                 [--code-file <path>] [--language <tag>]
//!   ui-refine list                       All records, newest first
//!   ui-refine show <id>                  One record with its report or error
//!   ui-refine analyze <id>               Run (or re-run after an error) the review
//!   ui-refine delete <id> [--yes]        Remove one record
//!   ui-refine clear [--yes]              Remove every record
//!   ui-refine status                     API key and provider status
//!   ui-refine set-key <key>              Store the Gemini key in the OS keychain
//!
//! `<id>` may be any unique prefix of a record id.

use std::io::{BufRead, Write};

use ui_refine_lib::encoding::Screenshot;
use ui_refine_lib::llm::ReviewProvider;
use ui_refine_lib::settings::{self, Settings};
use ui_refine_lib::{AnalysisOutcome, AnalysisRecord, NewAnalysis, ReviewPipeline, Storage};

const USAGE: &str = "Usage:
  ui-refine add --name <screen> --screenshot <image> [--url <url>] [--code-file <path>] [--language <tag>]
  ui-refine list
  ui-refine show <id>
  ui-refine analyze <id>
  ui-refine delete <id> [--yes]
  ui-refine clear [--yes]
  ui-refine status
  ui-refine set-key <key>";

#[tokio::main]
async fn main() {
    ui_refine_lib::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Vec<String>) -> Result<(), String> {
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    if command == "set-key" {
        let key = rest.first().ok_or("set-key needs a key")?;
        settings::save_api_key(key)?;
        println!("Gemini API key saved to the OS keychain.");
        return Ok(());
    }

    let settings = Settings::from_env();
    let status = settings.api_key_status();
    if !status.configured {
        eprintln!("{}", status.message);
    }
    let mut pipeline = ui_refine_lib::open_pipeline(&settings);

    match command.as_str() {
        "add" => cmd_add(&mut pipeline, rest),
        "list" => {
            cmd_list(&pipeline);
            Ok(())
        }
        "show" => {
            let id = resolve_id(&pipeline, rest.first())?;
            if let Some(record) = pipeline.get(&id) {
                print_record(record);
            }
            Ok(())
        }
        "analyze" => {
            let id = resolve_id(&pipeline, rest.first())?;
            cmd_analyze(&mut pipeline, &id).await
        }
        "delete" => {
            let id = resolve_id(&pipeline, rest.first())?;
            if !has_flag(rest, "--yes") && !confirm(&format!("Delete analysis {}?", id)) {
                println!("Cancelled.");
                return Ok(());
            }
            pipeline.delete(&id).map_err(|e| e.to_string())?;
            println!("Deleted {}.", id);
            Ok(())
        }
        "clear" => {
            if pipeline.records().is_empty() {
                println!("No analyses to clear.");
                return Ok(());
            }
            if !has_flag(rest, "--yes")
                && !confirm("Are you sure you want to delete all analyses? This action cannot be undone.")
            {
                println!("Cancelled.");
                return Ok(());
            }
            pipeline.clear_all().map_err(|e| e.to_string())?;
            println!("All analyses deleted.");
            Ok(())
        }
        "status" => {
            let info = pipeline.provider().info();
            println!("{}", status.message);
            println!(
                "{}",
                serde_json::to_string_pretty(&info).map_err(|e| e.to_string())?
            );
            println!("Data directory: {}", settings.data_dir.display());
            println!("Records: {}", pipeline.records().len());
            Ok(())
        }
        other => Err(format!("Unknown command: {}\n{}", other, USAGE)),
    }
}

fn cmd_add<S: Storage, P: ReviewProvider>(
    pipeline: &mut ReviewPipeline<S, P>,
    args: &[String],
) -> Result<(), String> {
    let screen_name = flag_value(args, "--name").unwrap_or_default();
    let screenshot = match flag_value(args, "--screenshot") {
        Some(path) => Some(Screenshot::from_path(&path).map_err(|e| e.to_string())?),
        None => None,
    };
    let code_snippet = match flag_value(args, "--code-file") {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {}", path, e))?,
        ),
        None => None,
    };

    let record = pipeline
        .submit(NewAnalysis {
            screen_name,
            url: flag_value(args, "--url"),
            screenshot,
            code_snippet,
            code_language: flag_value(args, "--language"),
        })
        .map_err(|e| e.to_string())?;

    println!("Added {} ({}), status: {}", record.id, record.screen_name, record.status());
    if record.screenshot_preview.is_none() {
        eprintln!("Warning: screenshot preview could not be created; analysis will fail.");
    }
    Ok(())
}

fn cmd_list<S: Storage, P: ReviewProvider>(pipeline: &ReviewPipeline<S, P>) {
    if pipeline.records().is_empty() {
        println!("No analyses yet. Add a screen with `ui-refine add` to get started.");
        return;
    }
    for record in pipeline.records() {
        println!(
            "{}  {:<10}  {}{}",
            short_id(&record.id),
            record.status().to_string(),
            record.screen_name,
            record
                .url
                .as_deref()
                .map(|u| format!("  ({})", u))
                .unwrap_or_default()
        );
    }
}

async fn cmd_analyze<S: Storage, P: ReviewProvider>(
    pipeline: &mut ReviewPipeline<S, P>,
    id: &str,
) -> Result<(), String> {
    println!("Analyzing {}...", id);
    match pipeline.begin_analysis(id).await.map_err(|e| e.to_string())? {
        AnalysisOutcome::NotConfigured(notice) => Err(notice),
        AnalysisOutcome::NotFound => Err(format!("No analysis with id {}", id)),
        AnalysisOutcome::Refused(reason) => Err(reason.to_string()),
        AnalysisOutcome::Completed(record) => {
            print_record(&record);
            Ok(())
        }
        AnalysisOutcome::Failed(record) => {
            print_record(&record);
            Err("Analysis failed. Fix the problem above and run `analyze` again.".to_string())
        }
    }
}

fn print_record(record: &AnalysisRecord) {
    println!("Id:        {}", record.id);
    println!("Screen:    {}", record.screen_name);
    if let Some(url) = &record.url {
        println!("URL:       {}", url);
    }
    println!("Status:    {}", record.status());
    println!("Created:   {} (ms since epoch)", record.timestamp);
    if let Some(code) = &record.code_snippet {
        println!(
            "Code:      {} lines ({})",
            code.lines().count(),
            record.code_language.as_deref().unwrap_or("plaintext")
        );
    }
    if let Some(error) = record.error() {
        println!("\nError: {}", error);
    }
    if let Some(report) = record.analysis_report() {
        println!("\n{}", report);
    }
}

/// Match a full id or a unique prefix.
fn resolve_id<S: Storage, P: ReviewProvider>(
    pipeline: &ReviewPipeline<S, P>,
    arg: Option<&String>,
) -> Result<String, String> {
    let prefix = arg.ok_or("Missing record id")?;
    let matches: Vec<&AnalysisRecord> = pipeline
        .records()
        .iter()
        .filter(|r| r.id.starts_with(prefix.as_str()))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => Err(format!("No analysis with id {}", prefix)),
        _ => Err(format!("Id prefix {} is ambiguous", prefix)),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
