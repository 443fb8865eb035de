use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use mentor_engine::{
    AnalysisEngine, AnalyzeRequest, AnalyzeResponse, EngineSettings, Language, Severity,
    SCHEMA_VERSION,
};

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            path,
            json,
            mode,
            min_function_lines,
            use_cache,
        } => {
            let mut settings = EngineSettings {
                mode: mode.into(),
                ..EngineSettings::default()
            };
            if let Some(threshold) = min_function_lines {
                settings.min_function_lines = threshold;
            }

            let cache_path = cli::default_cache_path();
            let engine = if use_cache {
                AnalysisEngine::new().with_cache_snapshot(&cache_path)
            } else {
                AnalysisEngine::new()
            };

            let files = collect_files(&path)?;
            if files.is_empty() {
                eprintln!("no supported source files under {}", path.display());
                return Ok(());
            }

            let mut total_patterns = 0;
            let mut outputs = Vec::new();
            for file in &files {
                let code = std::fs::read_to_string(file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                let language = language_id_for(file).unwrap_or_default();
                let response = engine
                    .analyze(AnalyzeRequest {
                        schema_version: SCHEMA_VERSION,
                        file: file.display().to_string(),
                        language,
                        code,
                        workspace: None,
                        changed_ranges: None,
                        settings: Some(settings.clone()),
                    })
                    .await?;
                total_patterns += response.patterns.len();
                if json {
                    outputs.push(response);
                } else {
                    print_human(file, &response);
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                println!(
                    "\n{} pattern(s) across {} file(s)",
                    total_patterns,
                    files.len()
                );
            }

            if use_cache {
                engine.save_cache_snapshot(&cache_path)?;
            }
        }
    }
    Ok(())
}

/// Gather supported source files: the path itself, or a gitignore-aware walk
/// when it is a directory.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkBuilder::new(path).build() {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_file() && language_id_for(entry_path).is_some() {
            files.push(entry_path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn language_id_for(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    Language::from_identifier(extension).map(|l| l.as_str().to_string())
}

fn print_human(file: &Path, response: &AnalyzeResponse) {
    for pattern in &response.patterns {
        let severity = match pattern.occurrence.severity {
            Severity::High => "high".red(),
            Severity::Medium => "medium".yellow(),
            Severity::Low => "low".dimmed(),
        };
        println!(
            "{}:{}:{} {} {} [{}] ({:.0}% confidence)",
            file.display(),
            pattern.occurrence.range.start.line + 1,
            pattern.occurrence.range.start.column + 1,
            pattern.occurrence.kind.as_str().bold(),
            severity,
            pattern.category.as_str().cyan(),
            pattern.confidence * 100.0,
        );
    }
}
