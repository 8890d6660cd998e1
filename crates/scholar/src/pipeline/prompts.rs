use serde::Serialize;
use tera::Error as TeraError;

use super::sources::enumerate_sources;
use crate::prompt_template::load_prompt_file;

/// The system prompt of every stage
///
/// Passed to the pipeline when it is built, so deployments and tests can swap any
/// of them without touching global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub document_analyzer: String,
    pub researcher: String,
    pub reviewer: String,
    pub synthesizer: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            document_analyzer: include_str!("../prompts/system/document_analyzer.md").to_string(),
            researcher: include_str!("../prompts/system/researcher.md").to_string(),
            reviewer: include_str!("../prompts/system/reviewer.md").to_string(),
            synthesizer: include_str!("../prompts/system/synthesizer.md").to_string(),
        }
    }
}

#[derive(Serialize)]
struct DocumentAnalysisContext<'a> {
    topic: &'a str,
    file_names: Vec<&'a str>,
}

#[derive(Serialize)]
struct StageContext<'a> {
    topic: &'a str,
    document_insights: &'a str,
    findings: &'a str,
    critique: &'a str,
    sources: String,
}

pub fn document_analysis_prompt(topic: &str, file_names: Vec<&str>) -> Result<String, TeraError> {
    load_prompt_file(
        "document_analysis.md",
        &DocumentAnalysisContext { topic, file_names },
    )
}

pub fn research_prompt(topic: &str, document_insights: &str) -> Result<String, TeraError> {
    load_prompt_file(
        "research.md",
        &StageContext {
            topic,
            document_insights,
            findings: "",
            critique: "",
            sources: String::new(),
        },
    )
}

pub fn review_prompt(
    topic: &str,
    document_insights: &str,
    findings: &str,
) -> Result<String, TeraError> {
    load_prompt_file(
        "review.md",
        &StageContext {
            topic,
            document_insights,
            findings,
            critique: "",
            sources: String::new(),
        },
    )
}

pub fn synthesis_prompt(
    topic: &str,
    document_insights: &str,
    findings: &str,
    critique: &str,
    sources: &[String],
) -> Result<String, TeraError> {
    load_prompt_file(
        "synthesis.md",
        &StageContext {
            topic,
            document_insights,
            findings,
            critique,
            sources: enumerate_sources(sources),
        },
    )
}
