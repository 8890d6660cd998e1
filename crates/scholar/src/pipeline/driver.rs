use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use super::prompts::{
    document_analysis_prompt, research_prompt, review_prompt, synthesis_prompt, PromptSet,
};
use super::sources::extract_source_urls;
use crate::errors::{PipelineError, PipelineResult, Stage};
use crate::models::message::{FilePart, Message};
use crate::protocol::record::StreamRecord;
use crate::providers::base::{Attachment, GenerateRequest, Provider, TextStream};

/// Capacity of the channel between the pipeline and the response body
pub const CHANNEL_CAPACITY: usize = 100;

/// What the client sees when a run fails; the cause is only logged
pub const FAILURE_MESSAGE: &str = "An error occurred during research analysis.";

/// The progress notices of a run, in the order they can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    AnalyzingDocuments(usize),
    DocumentsAnalyzed(usize),
    DocumentAnalysisDegraded,
    Researching,
    SourcesFound(usize),
    Reviewing,
    ReviewComplete,
    Synthesizing,
}

impl StageStatus {
    pub fn message(&self) -> String {
        match self {
            StageStatus::AnalyzingDocuments(n) => {
                format!("📄 Document Analyzer: Analyzing {} uploaded file(s)...", n)
            }
            StageStatus::DocumentsAnalyzed(n) => {
                format!("✅ Document Analyzer: Extracted insights from {} file(s)", n)
            }
            StageStatus::DocumentAnalysisDegraded => {
                "⚠️ Document Analyzer: Could not analyze some files, continuing with web research..."
                    .to_string()
            }
            StageStatus::Researching => {
                "🔍 Researcher Agent: Searching for research papers and articles...".to_string()
            }
            StageStatus::SourcesFound(n) => format!("✅ Researcher: Found {} sources", n),
            StageStatus::Reviewing => {
                "🧐 Reviewer Agent: Analyzing research quality and gaps...".to_string()
            }
            StageStatus::ReviewComplete => "✅ Reviewer: Analysis complete".to_string(),
            StageStatus::Synthesizing => "🎨 Synthesizer Agent: Creating final report...".to_string(),
        }
    }
}

impl From<StageStatus> for StreamRecord {
    fn from(status: StageStatus) -> Self {
        StreamRecord::Status(status.message())
    }
}

/// The write side of one response stream
///
/// Owned by a single run. Terminal records consume the sink, so nothing can follow
/// them, and the channel closes when the sink is dropped on whichever path the run
/// takes.
pub struct RecordSink {
    tx: mpsc::Sender<StreamRecord>,
}

impl RecordSink {
    pub fn new(tx: mpsc::Sender<StreamRecord>) -> Self {
        Self { tx }
    }

    /// A sink and the stream of records written to it
    pub fn channel() -> (Self, ReceiverStream<StreamRecord>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self::new(tx), ReceiverStream::new(rx))
    }

    async fn send(&self, record: StreamRecord) -> PipelineResult<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| PipelineError::Disconnected)
    }

    pub async fn status(&self, status: StageStatus) -> PipelineResult<()> {
        self.send(status.into()).await
    }

    pub async fn text_delta(&self, fragment: String) -> PipelineResult<()> {
        self.send(StreamRecord::TextDelta(fragment)).await
    }

    pub async fn finish(self) -> PipelineResult<()> {
        self.send(StreamRecord::Finish).await
    }

    pub async fn fail(self, message: &str) -> PipelineResult<()> {
        self.send(StreamRecord::error(message)).await
    }
}

/// Output of the research stage
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchFindings {
    pub text: String,
    pub sources: Vec<String>,
}

/// Runs the fixed chain of model-backed stages over one submission
pub struct ResearchPipeline {
    provider: Arc<dyn Provider>,
    prompts: PromptSet,
}

impl ResearchPipeline {
    pub fn new(provider: Arc<dyn Provider>, prompts: PromptSet) -> Self {
        Self { provider, prompts }
    }

    /// Run every stage for the submission, writing progress and output to the sink
    ///
    /// Always terminates the stream: `finish` after the report, or a single `error`
    /// record when any stage past document analysis fails.
    pub async fn run(&self, submission: &Message, sink: RecordSink) {
        let topic = submission.topic();
        let files = submission.files();
        info!("Starting research pipeline");
        info!("Topic: {}", topic);
        info!("Files: {}", files.len());

        match self.execute(&topic, &files, &sink).await {
            Ok(()) => {
                if sink.finish().await.is_ok() {
                    info!("Research pipeline complete");
                }
            }
            Err(PipelineError::Disconnected) => {
                info!("Client disconnected, abandoning research pipeline");
            }
            Err(e) => {
                error!("Error in research pipeline: {}", e);
                if let Err(PipelineError::Disconnected) = sink.fail(FAILURE_MESSAGE).await {
                    info!("Client disconnected before the failure could be reported");
                }
            }
        }
    }

    /// Run the pipeline on a background task, returning the records as they are produced
    pub fn spawn(self: Arc<Self>, submission: Message) -> ReceiverStream<StreamRecord> {
        let (sink, records) = RecordSink::channel();
        tokio::spawn(async move {
            self.run(&submission, sink).await;
        });
        records
    }

    async fn execute(&self, topic: &str, files: &[&FilePart], sink: &RecordSink) -> PipelineResult<()> {
        let document_insights = if files.is_empty() {
            info!("No files uploaded, skipping document analysis");
            String::new()
        } else {
            sink.status(StageStatus::AnalyzingDocuments(files.len())).await?;
            match self.analyze_documents(topic, files).await {
                Ok(insights) => {
                    sink.status(StageStatus::DocumentsAnalyzed(files.len())).await?;
                    info!("Document insights extracted ({} characters)", insights.len());
                    insights
                }
                Err(e) => {
                    warn!("Document analysis failed: {}", e);
                    sink.status(StageStatus::DocumentAnalysisDegraded).await?;
                    format!(
                        "Note: {} file(s) were uploaded but could not be fully analyzed. Error: {}",
                        files.len(),
                        e.cause()
                    )
                }
            }
        };

        sink.status(StageStatus::Researching).await?;
        let findings = self.research(topic, &document_insights).await?;
        sink.status(StageStatus::SourcesFound(findings.sources.len())).await?;
        info!("Research complete ({} characters)", findings.text.len());

        sink.status(StageStatus::Reviewing).await?;
        let critique = self.review(topic, &document_insights, &findings.text).await?;
        sink.status(StageStatus::ReviewComplete).await?;
        info!("Review complete ({} characters)", critique.len());

        sink.status(StageStatus::Synthesizing).await?;
        let mut report = self
            .synthesize(topic, &document_insights, &findings, &critique)
            .await?;

        while let Some(fragment) = report.next().await {
            let fragment = fragment.map_err(PipelineError::provider(Stage::Synthesis))?;
            sink.text_delta(fragment).await?;
        }
        info!("Synthesis streaming complete");

        Ok(())
    }

    async fn analyze_documents(&self, topic: &str, files: &[&FilePart]) -> PipelineResult<String> {
        let stage = Stage::DocumentAnalysis;
        let names = files.iter().map(|file| file.filename.as_str()).collect();
        let prompt = document_analysis_prompt(topic, names).map_err(PipelineError::prompt(stage))?;

        let attachments = files.iter().map(|file| Attachment::from(*file)).collect();
        let request = GenerateRequest::new(&self.prompts.document_analyzer, prompt)
            .with_attachments(attachments);

        let generation = self
            .provider
            .generate(&request)
            .await
            .map_err(PipelineError::provider(stage))?;
        Ok(generation.text)
    }

    async fn research(&self, topic: &str, document_insights: &str) -> PipelineResult<ResearchFindings> {
        let stage = Stage::Research;
        let prompt = research_prompt(topic, document_insights).map_err(PipelineError::prompt(stage))?;
        let request = GenerateRequest::new(&self.prompts.researcher, prompt).with_web_search();

        let generation = self
            .provider
            .generate(&request)
            .await
            .map_err(PipelineError::provider(stage))?;

        Ok(ResearchFindings {
            sources: extract_source_urls(generation.grounding.as_ref()),
            text: generation.text,
        })
    }

    async fn review(&self, topic: &str, document_insights: &str, findings: &str) -> PipelineResult<String> {
        let stage = Stage::Review;
        let prompt = review_prompt(topic, document_insights, findings)
            .map_err(PipelineError::prompt(stage))?;
        let request = GenerateRequest::new(&self.prompts.reviewer, prompt).with_web_search();

        let generation = self
            .provider
            .generate(&request)
            .await
            .map_err(PipelineError::provider(stage))?;
        Ok(generation.text)
    }

    async fn synthesize(
        &self,
        topic: &str,
        document_insights: &str,
        findings: &ResearchFindings,
        critique: &str,
    ) -> PipelineResult<TextStream> {
        let stage = Stage::Synthesis;
        let prompt = synthesis_prompt(
            topic,
            document_insights,
            &findings.text,
            critique,
            &findings.sources,
        )
        .map_err(PipelineError::prompt(stage))?;
        let request = GenerateRequest::new(&self.prompts.synthesizer, prompt).with_web_search();

        self.provider
            .stream(&request)
            .await
            .map_err(PipelineError::provider(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::Generation;
    use crate::providers::mock::MockProvider;

    #[test]
    fn test_status_messages() {
        assert_eq!(
            StageStatus::AnalyzingDocuments(2).message(),
            "📄 Document Analyzer: Analyzing 2 uploaded file(s)..."
        );
        assert_eq!(
            StageStatus::SourcesFound(0).message(),
            "✅ Researcher: Found 0 sources"
        );
    }

    #[tokio::test]
    async fn test_terminal_record_closes_the_channel() {
        let (sink, records) = RecordSink::channel();
        sink.status(StageStatus::Researching).await.unwrap();
        sink.finish().await.unwrap();

        let records: Vec<_> = records.collect().await;
        assert_eq!(
            records,
            vec![StageStatus::Researching.into(), StreamRecord::Finish]
        );
    }

    #[tokio::test]
    async fn test_failure_after_disconnect() {
        let (sink, records) = RecordSink::channel();
        drop(records);

        let result = sink.fail(FAILURE_MESSAGE).await;
        assert!(matches!(result, Err(PipelineError::Disconnected)));
    }

    #[tokio::test]
    async fn test_disconnected_client_stops_the_run() {
        let provider = Arc::new(
            MockProvider::new()
                .with_generation(Generation::text("findings"))
                .with_generation(Generation::text("critique"))
                .with_fragments(["report"]),
        );
        let pipeline = ResearchPipeline::new(provider.clone(), PromptSet::default());

        let (sink, records) = RecordSink::channel();
        drop(records);
        pipeline
            .run(&Message::user().with_text("topic"), sink)
            .await;

        assert!(provider.requests().is_empty());
    }
}
