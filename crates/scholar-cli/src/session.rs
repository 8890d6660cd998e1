use anyhow::Result;
use bat::WrappingMode;
use futures::StreamExt;
use scholar::display::{Reply, Transcript, TRANSPORT_FAILURE_NOTICE};
use scholar::models::message::Message;
use scholar::protocol::{decode_stream, StreamRecord};
use serde_json::json;

const INITIAL_STATUS: &str = "Initializing research agents...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn bat_theme(self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

/// One submission to the research server and the display state it produces
pub struct Session {
    endpoint: String,
    client: reqwest::Client,
    transcript: Transcript,
}

impl Session {
    pub fn new(server: &str) -> Self {
        Self {
            endpoint: format!("{}/api/chat", server.trim_end_matches('/')),
            client: reqwest::Client::new(),
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Send the message and fold the response stream into the transcript
    ///
    /// `on_status` sees each progress notice as it arrives. Transport failures end up
    /// in the transcript as a failure notice rather than as an error.
    pub async fn submit<F>(&mut self, message: Message, mut on_status: F)
    where
        F: FnMut(&str),
    {
        self.transcript.push_user(message.clone());
        let mut reply = Reply::new();

        let response = match self.post(message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Request to {} failed: {}", self.endpoint, e);
                self.transcript.fail(TRANSPORT_FAILURE_NOTICE);
                return;
            }
        };

        let records = decode_stream(response.bytes_stream());
        futures::pin_mut!(records);

        let mut terminated = false;
        while let Some(record) = records.next().await {
            match record {
                Ok(record) => {
                    if let StreamRecord::Status(content) = &record {
                        on_status(content);
                    }
                    terminated |= record.is_terminal();
                    self.transcript.apply(&mut reply, record);
                }
                Err(e) => {
                    tracing::error!("Response stream broke: {}", e);
                    self.transcript.fail(TRANSPORT_FAILURE_NOTICE);
                    return;
                }
            }
        }

        if !terminated {
            tracing::error!("Response stream from {} ended without a terminal record", self.endpoint);
            self.transcript.fail(TRANSPORT_FAILURE_NOTICE);
        }
    }

    async fn post(&self, message: Message) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&self.endpoint)
            .json(&json!({ "messages": [message] }))
            .send()
            .await?
            .error_for_status()
    }
}

/// Submit the message with a spinner showing progress, then print the report
pub async fn run(server: &str, message: Message, theme: Theme) -> Result<()> {
    let mut session = Session::new(server);

    let spin = cliclack::spinner();
    spin.start(INITIAL_STATUS);
    session
        .submit(message, |status| spin.set_message(status))
        .await;
    spin.stop("");

    if let Some(answer) = session.transcript().last_assistant() {
        render(&answer.text(), theme)?;
    }
    Ok(())
}

fn render(content: &str, theme: Theme) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme.bat_theme())
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .map_err(|e| anyhow::anyhow!("Failed to render report: {}", e))?;
    println!();
    Ok(())
}
