use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use qcr_ai::embeddings::openai_embed::OpenAiEmbedder;
use qcr_ai::index::{build_index_from_folder, index_status, BuildReport, IndexBuilder, UpdateMode};
use qcr_ai::llm::openai_llm::OpenAiLlm;
use qcr_ai::openai::ApiClient;
use qcr_ai::retrieve::{QueryHandler, QueryOptions};
use qcr_core::config::Settings;
use qcr_core::error::AppError;
use qcr_core::ingest::load_paths;

use crate::output;

/// Settings resolved once per invocation, with CLI overrides applied.
pub struct AppContext {
    pub settings: Settings,
}

impl AppContext {
    pub fn load(data_dir: Option<PathBuf>, index_path: Option<PathBuf>) -> Result<Self, AppError> {
        let mut settings = Settings::from_env()?;
        if let Some(dir) = data_dir {
            settings.data_folder = dir;
        }
        if let Some(path) = index_path {
            settings.index_path = path;
        }
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn api_client(&self) -> Result<ApiClient, AppError> {
        ApiClient::from_settings(&self.settings)
    }

    pub fn embedder(&self) -> Result<OpenAiEmbedder, AppError> {
        Ok(OpenAiEmbedder::new(self.api_client()?))
    }

    pub fn query_handler(&self) -> Result<QueryHandler, AppError> {
        let client = self.api_client()?;
        let llm = OpenAiLlm::new(client.clone()).with_temperature(self.settings.temperature);
        Ok(QueryHandler::open(
            &self.settings.index_path,
            Box::new(OpenAiEmbedder::new(client)),
            Box::new(llm),
            QueryOptions::from_settings(&self.settings),
        ))
    }
}

pub fn status(ctx: &AppContext, check_api: bool) -> Result<(), AppError> {
    let st = index_status(&ctx.settings.index_path);
    println!("{}", output::format_status(&ctx.settings, &st));
    if !ctx.settings.has_api_key() {
        tracing::warn!("OPENAI_API_KEY is not set; build, ask and search commands will fail");
        println!("\nWarning: OPENAI_API_KEY is not set. Export it or add it to a .env file.");
        return Ok(());
    }
    if check_api {
        ctx.api_client()?.health_check()?;
        println!("API: reachable ({})", ctx.settings.api_base_url);
    }
    Ok(())
}

pub fn build(ctx: &AppContext, force: bool) -> Result<(), AppError> {
    let st = index_status(&ctx.settings.index_path);
    if st.ready && !force {
        println!(
            "Index already exists at {} ({} chunks). Use --force or `qcr rebuild` to rebuild it.",
            st.path, st.chunk_count
        );
        return Ok(());
    }
    let report = build_from_data_folder(ctx, &ctx.settings.index_path)?;
    println!("{}", output::format_build_report(&report));
    Ok(())
}

pub fn rebuild(ctx: &AppContext, yes: bool) -> Result<(), AppError> {
    if !yes {
        print!(
            "This deletes the index at {} and rebuilds it. Type 'yes' to continue: ",
            ctx.settings.index_path.display()
        );
        io::stdout().flush().ok();
        if !read_confirmation(io::stdin().lock())? {
            println!("Rebuild cancelled.");
            return Ok(());
        }
    }

    // Build next to the old index so a failed build leaves it in place.
    let staging = staging_path(&ctx.settings.index_path);
    remove_index_dir(&staging)?;
    let mut report = build_from_data_folder(ctx, &staging)?;
    remove_index_dir(&ctx.settings.index_path)?;
    fs::rename(&staging, &ctx.settings.index_path).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to move rebuilt index into place").with_details(format!(
            "from={}; to={}; err={}",
            staging.display(),
            ctx.settings.index_path.display(),
            e
        ))
    })?;
    report.index_path = ctx.settings.index_path.clone();
    println!("{}", output::format_build_report(&report));
    Ok(())
}

pub fn update(ctx: &AppContext, paths: &[PathBuf], append: bool) -> Result<(), AppError> {
    let embedder = ctx.embedder()?;
    let builder = IndexBuilder::from_settings(&embedder, &ctx.settings)?;
    let loaded = load_paths(paths, &ctx.settings.pdftotext_bin);
    if !loaded.failures.is_empty() {
        println!("{}", output::format_failures(&loaded.failures));
    }
    let mode = if append { UpdateMode::Append } else { UpdateMode::Deduplicate };
    let report = builder.update(&ctx.settings.index_path, &loaded.documents, mode)?;
    println!("{}", output::format_update_report(&report));
    Ok(())
}

pub fn ask(ctx: &AppContext, question: &str, with_sources: bool, json: bool) -> Result<(), AppError> {
    let handler = ctx.query_handler()?;
    let res = handler.handle_query(question, with_sources)?;
    if json {
        println!("{}", output::to_json(&res));
    } else {
        println!("{}", output::format_answer(&res));
    }
    Ok(())
}

pub fn search(ctx: &AppContext, query: &str, k: usize, json: bool) -> Result<(), AppError> {
    let handler = ready_handler(ctx)?;
    let cases = handler.search_similar_cases(query, k)?;
    if json {
        println!("{}", output::to_json(&cases));
    } else {
        println!("{}", output::format_similar_cases(query, &cases));
    }
    Ok(())
}

pub fn docs(ctx: &AppContext, query: &str, k: usize, json: bool) -> Result<(), AppError> {
    let handler = ready_handler(ctx)?;
    let docs = handler.get_relevant_documents(query, k)?;
    if json {
        println!("{}", output::to_json(&docs));
    } else {
        println!("{}", output::format_documents(query, &docs));
    }
    Ok(())
}

pub fn keywords(ctx: &AppContext, keywords: &[String], k: usize, json: bool) -> Result<(), AppError> {
    let handler = ready_handler(ctx)?;
    let hits = handler.search_by_keywords(keywords, k)?;
    if json {
        println!("{}", output::to_json(&hits));
    } else {
        println!("{}", output::format_keyword_hits(&hits));
    }
    Ok(())
}

/// Lookups on a missing index return empty lists; tell the user why on stderr.
fn ready_handler(ctx: &AppContext) -> Result<QueryHandler, AppError> {
    let handler = ctx.query_handler()?;
    if !handler.is_ready() {
        eprintln!(
            "No index at {}. Run `qcr build` first.",
            ctx.settings.index_path.display()
        );
    }
    Ok(handler)
}

pub(crate) fn build_from_data_folder(ctx: &AppContext, index_path: &Path) -> Result<BuildReport, AppError> {
    let embedder = ctx.embedder()?;
    let builder = IndexBuilder::from_settings(&embedder, &ctx.settings)?;
    println!(
        "Building index from {} ...",
        ctx.settings.data_folder.display()
    );
    build_index_from_folder(
        &builder,
        &ctx.settings.data_folder,
        index_path,
        &ctx.settings.pdftotext_bin,
    )
}

fn read_confirmation<R: BufRead>(mut input: R) -> Result<bool, AppError> {
    let mut line = String::new();
    input.read_line(&mut line).map_err(|e| {
        AppError::new("CLI_IO_FAILED", "Failed to read confirmation").with_details(e.to_string())
    })?;
    Ok(confirmed(&line))
}

fn confirmed(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("yes")
}

fn staging_path(index_path: &Path) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".rebuild");
    index_path.with_file_name(name)
}

fn remove_index_dir(path: &Path) -> Result<(), AppError> {
    if !path.exists() {
        return Ok(());
    }
    fs::remove_dir_all(path).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to delete index directory")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}
