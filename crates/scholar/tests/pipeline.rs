use futures::StreamExt;
use std::sync::Arc;

use scholar::display::{Reply, Transcript};
use scholar::models::message::{FilePart, Message, Role};
use scholar::pipeline::{PromptSet, RecordSink, ResearchPipeline, FAILURE_MESSAGE};
use scholar::protocol::{encode_record, StreamDecoder, StreamRecord};
use scholar::providers::base::{
    Generation, GroundingChunk, GroundingMetadata, GroundingSupport, WebSource,
};
use scholar::providers::mock::MockProvider;

const TOPIC: &str = "AI for climate modeling";

/// Metadata with one support entry citing every chunk in order
fn grounding(uris: &[&str]) -> GroundingMetadata {
    GroundingMetadata {
        web_search_queries: Some(vec![TOPIC.to_string()]),
        grounding_chunks: uris
            .iter()
            .map(|uri| GroundingChunk {
                web: Some(WebSource {
                    uri: Some(uri.to_string()),
                    title: None,
                }),
            })
            .collect(),
        grounding_supports: vec![GroundingSupport {
            grounding_chunk_indices: (0..uris.len()).collect(),
        }],
    }
}

async fn run(provider: Arc<MockProvider>, submission: Message) -> Vec<StreamRecord> {
    let pipeline = Arc::new(ResearchPipeline::new(provider, PromptSet::default()));
    pipeline.spawn(submission).collect().await
}

fn statuses(records: &[StreamRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|record| match record {
            StreamRecord::Status(content) => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_research_without_files() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(
                Generation::text("findings").with_grounding(grounding(&[
                    "https://a.example",
                    "https://b.example",
                    "https://a.example",
                ])),
            )
            .with_generation(Generation::text("critique"))
            .with_fragments(["# Report", "\n\nBody [1]"]),
    );

    let records = run(provider.clone(), Message::user().with_text(TOPIC)).await;

    assert_eq!(
        records,
        vec![
            StreamRecord::status("🔍 Researcher Agent: Searching for research papers and articles..."),
            StreamRecord::status("✅ Researcher: Found 2 sources"),
            StreamRecord::status("🧐 Reviewer Agent: Analyzing research quality and gaps..."),
            StreamRecord::status("✅ Reviewer: Analysis complete"),
            StreamRecord::status("🎨 Synthesizer Agent: Creating final report..."),
            StreamRecord::text_delta("# Report"),
            StreamRecord::text_delta("\n\nBody [1]"),
            StreamRecord::Finish,
        ]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|request| request.web_search));
    assert!(requests.iter().all(|request| request.attachments.is_empty()));
    assert!(requests[1].prompt.contains("Research findings:\nfindings"));
    assert!(requests[2].prompt.contains("[1] https://a.example\n[2] https://b.example"));
    assert!(requests[2].prompt.contains("Critical review:\ncritique"));
}

#[tokio::test]
async fn test_document_analysis_runs_first() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("## Document Summary"))
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_fragments(["report"]),
    );
    let submission = Message::user()
        .with_text(TOPIC)
        .with_file(FilePart::from_bytes("notes.txt", "text/plain", b"sea ice"))
        .with_file(FilePart::from_bytes("paper.pdf", "application/pdf", b"%PDF"));

    let records = run(provider.clone(), submission).await;

    assert_eq!(
        &statuses(&records)[..3],
        &[
            "📄 Document Analyzer: Analyzing 2 uploaded file(s)...",
            "✅ Document Analyzer: Extracted insights from 2 file(s)",
            "🔍 Researcher Agent: Searching for research papers and articles...",
        ]
    );
    assert_eq!(statuses(&records).len(), 7);
    assert_eq!(records.last(), Some(&StreamRecord::Finish));

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    assert!(!requests[0].web_search);
    assert_eq!(requests[0].attachments.len(), 2);
    assert_eq!(requests[0].attachments[1].media_type, "application/pdf");
    assert!(requests[0].prompt.contains("notes.txt, paper.pdf"));
    assert!(requests[1]
        .prompt
        .contains("Document insights from uploaded files:\n## Document Summary"));
}

#[tokio::test]
async fn test_document_analysis_failure_degrades() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation_error("unsupported file")
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_fragments(["report"]),
    );
    let submission = Message::user()
        .with_text(TOPIC)
        .with_file(FilePart::from_bytes("scan.tiff", "image/tiff", b"II*"));

    let records = run(provider.clone(), submission).await;

    assert_eq!(
        statuses(&records)[1],
        "⚠️ Document Analyzer: Could not analyze some files, continuing with web research..."
    );
    assert_eq!(records.last(), Some(&StreamRecord::Finish));
    assert!(!records.iter().any(|record| matches!(record, StreamRecord::Error(_))));

    let research = &provider.requests()[1];
    assert!(research.prompt.contains(
        "Note: 1 file(s) were uploaded but could not be fully analyzed. Error: unsupported file"
    ));
}

#[tokio::test]
async fn test_research_failure_emits_one_error() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation_error("quota exceeded")
            .with_fragments(["never sent"]),
    );

    let records = run(provider.clone(), Message::user().with_text(TOPIC)).await;

    assert_eq!(
        records,
        vec![
            StreamRecord::status("🔍 Researcher Agent: Searching for research papers and articles..."),
            StreamRecord::error(FAILURE_MESSAGE),
        ]
    );
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_review_failure_emits_one_error() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings"))
            .with_generation_error("overloaded"),
    );

    let records = run(provider, Message::user().with_text(TOPIC)).await;

    assert_eq!(statuses(&records).len(), 3);
    assert_eq!(records.last(), Some(&StreamRecord::error(FAILURE_MESSAGE)));
    assert!(!records.contains(&StreamRecord::Finish));
}

#[tokio::test]
async fn test_synthesis_failure_mid_stream() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_broken_fragments(["# Report", " partial"], "connection reset"),
    );

    let records = run(provider, Message::user().with_text(TOPIC)).await;

    assert_eq!(
        &records[5..],
        &[
            StreamRecord::text_delta("# Report"),
            StreamRecord::text_delta(" partial"),
            StreamRecord::error(FAILURE_MESSAGE),
        ]
    );
}

#[tokio::test]
async fn test_synthesis_stream_refused() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_stream_error("model not found"),
    );

    let records = run(provider, Message::user().with_text(TOPIC)).await;

    assert_eq!(statuses(&records).len(), 5);
    assert_eq!(records.last(), Some(&StreamRecord::error(FAILURE_MESSAGE)));
    assert_eq!(records.iter().filter(|r| r.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_no_sources_without_search_queries() {
    let mut metadata = grounding(&["https://a.example"]);
    metadata.web_search_queries = None;
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings").with_grounding(metadata))
            .with_generation(Generation::text("critique"))
            .with_fragments(["report"]),
    );

    let records = run(provider.clone(), Message::user().with_text(TOPIC)).await;

    assert_eq!(statuses(&records)[1], "✅ Researcher: Found 0 sources");
    assert!(!provider.requests()[2].prompt.contains("Available sources"));
}

#[tokio::test]
async fn test_client_disconnect_mid_report() {
    let fragments: Vec<String> = (0..1000).map(|i| format!("fragment {} ", i)).collect();
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_fragments(fragments),
    );
    let pipeline = ResearchPipeline::new(provider, PromptSet::default());

    let (sink, mut records) = RecordSink::channel();
    let run = tokio::spawn(async move {
        pipeline.run(&Message::user().with_text(TOPIC), sink).await;
    });

    let mut seen = Vec::new();
    while let Some(record) = records.next().await {
        let delta = matches!(record, StreamRecord::TextDelta(_));
        seen.push(record);
        if delta {
            break;
        }
    }
    drop(records);

    // More fragments than the channel holds, so the run must notice the closed receiver
    tokio::time::timeout(std::time::Duration::from_secs(5), run)
        .await
        .expect("run stops after the client goes away")
        .unwrap();
    assert_eq!(statuses(&seen).len(), 5);
}

#[tokio::test]
async fn test_transcript_from_encoded_stream() {
    let provider = Arc::new(
        MockProvider::new()
            .with_generation(Generation::text("findings"))
            .with_generation(Generation::text("critique"))
            .with_fragments(["# Über", "sicht ✓", "\n\nDone"]),
    );

    let records = run(provider, Message::user().with_text(TOPIC)).await;
    let body: Vec<u8> = records
        .iter()
        .flat_map(|record| encode_record(record).into_bytes())
        .collect();

    let mut decoder = StreamDecoder::new();
    let mut transcript = Transcript::new();
    let mut reply = Reply::new();
    transcript.push_user(Message::user().with_text(TOPIC));
    for chunk in body.chunks(7) {
        for record in decoder.push(chunk) {
            transcript.apply(&mut reply, record);
        }
    }
    assert_eq!(decoder.finish(), None);

    assert_eq!(transcript.statuses().count(), 0);
    assert_eq!(transcript.entries().len(), 2);
    let answer = transcript.last_assistant().unwrap();
    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(answer.text(), "# Übersicht ✓\n\nDone");
}
