use qcr_ai::answer::AnswerResponse;
use qcr_ai::index::index_status;
use qcr_core::demo::{sample_queries, seed_demo_folder};
use qcr_core::error::AppError;

use crate::commands::{build_from_data_folder, AppContext};
use crate::output;

const DEMO_SOURCES_SHOWN: usize = 3;
const DEMO_SEARCH: &str = "welding defect";

pub fn run(ctx: &AppContext) -> Result<(), AppError> {
    let settings = &ctx.settings;
    settings.require_api_key()?;

    if !settings.data_folder.is_dir() {
        let files = seed_demo_folder(&settings.data_folder)?;
        println!(
            "Created {} sample case files in {}",
            files.len(),
            settings.data_folder.display()
        );
    }

    if !index_status(&settings.index_path).ready {
        let report = build_from_data_folder(ctx, &settings.index_path)?;
        println!("{}", output::format_build_report(&report));
    }

    let handler = ctx.query_handler()?;
    for (i, question) in sample_queries().iter().enumerate() {
        println!("\n=== Question {}: {question}", i + 1);
        let res = handler.handle_query(question, true)?;
        println!("{}", output::format_answer(&limit_sources(res, DEMO_SOURCES_SHOWN)));
    }

    println!("\n=== Similar cases for \"{DEMO_SEARCH}\"");
    let cases = handler.search_similar_cases(DEMO_SEARCH, 3)?;
    println!("{}", output::format_similar_cases(DEMO_SEARCH, &cases));
    Ok(())
}

fn limit_sources(mut res: AnswerResponse, max: usize) -> AnswerResponse {
    res.sources.truncate(max);
    res
}
