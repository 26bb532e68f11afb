//! `relay`: headless driver for staged conversion jobs.
mod catalog;
mod cli;
mod driver;
mod effects;
mod report;

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use relay_core::{
    builtin_tools, find_tool, format_bytes, NoticeLevel, PollConfig, ResultView, SessionConfig,
    ToolConfig,
};
use relay_engine::{ClientSettings, EngineHandle};
use relay_logging::{relay_info, LevelFilter};

use crate::cli::{parse_pages, Cli};
use crate::driver::{Driver, SessionRequest};
use crate::effects::EffectRunner;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    relay_logging::initialize(cli.log_destination(), level);

    if cli.dump_catalog {
        println!("{}", catalog::builtin_catalog_ron()?);
        return Ok(());
    }

    let tools = match &cli.catalog {
        Some(path) => catalog::load_catalog(path)?,
        None => builtin_tools(),
    };
    if cli.list_tools {
        for tool in &tools {
            println!("{:<16} {}", tool.slug, describe_tool(tool));
        }
        return Ok(());
    }

    let slug = cli.tool.as_deref().context("a tool is required")?;
    let tool = find_tool(&tools, slug)
        .cloned()
        .ok_or_else(|| anyhow!("unknown tool `{slug}`; try --list-tools"))?;
    if cli.files.is_empty() {
        bail!("no files given");
    }
    let pages = cli
        .pages
        .as_deref()
        .map(parse_pages)
        .transpose()
        .map_err(|err| anyhow!("invalid --pages: {err}"))?;

    let mut config = SessionConfig::new(tool);
    config.poll = PollConfig {
        interval: Duration::try_from_secs_f64(cli.poll_interval)
            .context("invalid --poll-interval")?,
        max_attempts: cli.poll_attempts.max(1),
    };

    let mut settings = ClientSettings::new(cli.server.clone());
    settings.csrf_token = cli.csrf_token.clone();
    let engine = EngineHandle::new(settings, cli.output_dir.clone())?;
    let runner = EffectRunner::new(engine);
    relay_info!("Using {} at {}", config.tool.slug, cli.server);

    let outcome = Driver::new(&runner).run(
        config,
        SessionRequest {
            files: cli.files,
            pages,
            extra_fields: cli.fields,
            download: !cli.no_download,
        },
    )?;

    let lines = report::outcome_lines(&outcome.view, outcome.saved.as_deref());
    if lines.is_empty() {
        // Upload rejected; the reason is the latest error notice.
        let reason = outcome
            .view
            .notices
            .iter()
            .rev()
            .find(|notice| notice.level == NoticeLevel::Error)
            .map(|notice| notice.text.clone())
            .unwrap_or_else(|| "submission did not complete".to_string());
        bail!(reason);
    }
    for line in &lines {
        println!("{line}");
    }
    let succeeded = matches!(outcome.view.result, Some(ResultView::Success { .. }));
    drop(runner);
    if !succeeded {
        std::process::exit(2);
    }
    Ok(())
}

fn describe_tool(tool: &ToolConfig) -> String {
    let extensions = tool
        .accepted_extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{:?}, up to {}, accepts {}",
        tool.mode,
        format_bytes(tool.max_bytes),
        extensions
    )
}
