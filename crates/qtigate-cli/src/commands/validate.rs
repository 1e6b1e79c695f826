//! `qtigate validate`: run the pipeline over each file.

use std::{
    fs,
    future::Future,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tracing::{debug, info, info_span, instrument, warn};
use uuid::Uuid;

use qtigate_adapters::{HttpContentService, ReqwestFetcher};
use qtigate_core::{
    application::{ApplicationError, ReachabilityOptions, ValidationPipeline},
    domain::{
        Diagnostic, ErrorCategory, RootTag, ValidationContext, ValidationResult,
        markup::root_attribute,
    },
};

use crate::{
    cli::{OutputFormat, ValidateArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Per-file entry of the JSON report.
#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    id: String,
    root: RootTag,
    is_valid: bool,
    errors: Vec<Diagnostic>,
}

impl FileReport {
    fn new(file: &Path, ctx: &ValidationContext, result: &ValidationResult) -> Self {
        Self {
            file: file.to_path_buf(),
            id: ctx.id().to_string(),
            root: ctx.root_tag(),
            is_valid: result.is_valid(),
            errors: result.diagnostics(),
        }
    }

    fn timed_out(file: &Path, ctx: &ValidationContext, limit: Duration) -> Self {
        let err = ApplicationError::PipelineTimeout {
            seconds: limit.as_secs(),
        };
        Self {
            file: file.to_path_buf(),
            id: ctx.id().to_string(),
            root: ctx.root_tag(),
            is_valid: false,
            errors: vec![Diagnostic {
                category: ErrorCategory::Internal,
                message: err.to_string(),
                context: None,
                suggestion: err.suggestions().into_iter().next(),
            }],
        }
    }
}

/// Run one document under the caller-level timeout.
fn run_bounded(
    runtime: &tokio::runtime::Runtime,
    limit: Duration,
    path: &Path,
    ctx: &ValidationContext,
    run: impl Future<Output = ValidationResult>,
) -> FileReport {
    match runtime.block_on(tokio::time::timeout(limit, run)) {
        Ok(result) => FileReport::new(path, ctx, &result),
        Err(_) => {
            warn!(file = %path.display(), seconds = limit.as_secs(), "validation timed out");
            FileReport::timed_out(path, ctx, limit)
        }
    }
}

pub fn execute(args: ValidateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let pipeline = build_pipeline(&config, args.offline)?;
    info!(passes = ?pipeline.pass_names(), "pipeline ready");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let limit = Duration::from_secs(config.pipeline.timeout_secs);

    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let xml = read_document(path)?;
        let ctx = context_for(path, &xml, &args)?;
        reports.push(run_bounded(&runtime, limit, path, &ctx, pipeline.run(&xml, &ctx)));
    }

    match output.format() {
        OutputFormat::Json => output.json(&reports)?,
        _ => render_human(&reports, &output)?,
    }

    let failed = reports.iter().filter(|r| !r.is_valid).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::ValidationFailed {
            failed,
            total: reports.len(),
        })
    }
}

/// Offline runs only the content rules; otherwise each pass is added when
/// its configuration allows it.
fn build_pipeline(config: &AppConfig, offline: bool) -> CliResult<ValidationPipeline> {
    if offline {
        return Ok(ValidationPipeline::offline());
    }

    let mut builder = ValidationPipeline::builder();
    if config.reachability.enabled {
        let options = ReachabilityOptions::default()
            .with_timeout(Duration::from_secs(config.reachability.fetch_timeout_secs));
        builder = builder.with_reachability(Arc::new(ReqwestFetcher::new()?), options);
    }
    match &config.service.base_url {
        Some(base_url) => {
            let service = HttpContentService::new(
                base_url.clone(),
                config.service.api_token.clone(),
                Duration::from_secs(config.service.request_timeout_secs),
            )?;
            builder = builder.with_ground_truth(Arc::new(service), config.pipeline.item_strategy);
        }
        None => debug!("service.base_url not set, ground-truth pass disabled"),
    }
    Ok(builder.build())
}

fn read_document(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CliError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => CliError::IoError {
            message: format!("Failed to read '{}'", path.display()),
            source: e,
        },
    })
}

#[instrument(skip_all, fields(file = %path.display()))]
fn context_for(path: &Path, xml: &str, args: &ValidateArgs) -> CliResult<ValidationContext> {
    let root = match args.root_tag {
        Some(tag) => RootTag::from(tag),
        None => RootTag::detect(xml).ok_or_else(|| CliError::InvalidInput {
            message: format!(
                "could not detect the root element of '{}'; pass --root-tag",
                path.display()
            ),
            source: None,
        })?,
    };

    let id = args
        .id
        .clone()
        .unwrap_or_else(|| format!("qtigate-tmp-{}", Uuid::new_v4().simple()));

    let title = args
        .title
        .clone()
        .or_else(|| root_attribute(xml, root.element_name(), "title").map(str::to_owned))
        .filter(|t| !t.trim().is_empty())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();

    debug!(%id, %root, %title, "validation context");
    let span = info_span!("qti_validation", file = %path.display(), id = %id, root = %root);
    Ok(ValidationContext::new(id, root, title).with_span(span))
}

fn render_human(reports: &[FileReport], output: &OutputManager) -> CliResult<()> {
    for report in reports {
        let label = format!("{} ({} '{}')", report.file.display(), report.root, report.id);
        if report.is_valid {
            output.success(&format!("{label}: valid"))?;
            continue;
        }

        output.error(&format!("{label}: {} error(s)", report.errors.len()))?;
        for (n, diagnostic) in report.errors.iter().enumerate() {
            output.print(&format!(
                "  {}. [{}] {}",
                n + 1,
                diagnostic.category,
                diagnostic.message
            ))?;
            if let Some(context) = &diagnostic.context {
                output.detail(&format!("     context: {context}"))?;
            }
            if let Some(suggestion) = &diagnostic.suggestion {
                output.detail(&format!("     suggestion: {suggestion}"))?;
            }
        }
    }

    if reports.len() > 1 {
        let valid = reports.iter().filter(|r| r.is_valid).count();
        output.header(&format!("{valid} of {} document(s) valid", reports.len()))?;
    }
    Ok(())
}
