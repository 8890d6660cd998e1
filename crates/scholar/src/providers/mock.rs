use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::base::{GenerateRequest, Generation, Provider, TextStream};

enum StreamScript {
    Fragments(Vec<Result<String, String>>),
    Fail(String),
}

/// A provider that replays pre-configured answers, for tests
///
/// `generate` answers are consumed in order and an empty answer is returned once they
/// run out. Every request is recorded so tests can inspect the prompts they produced.
#[derive(Default)]
pub struct MockProvider {
    generations: Mutex<VecDeque<Result<Generation, String>>>,
    stream: Mutex<Option<StreamScript>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `generate` answer
    pub fn with_generation(self, generation: Generation) -> Self {
        lock(&self.generations).push_back(Ok(generation));
        self
    }

    /// Queue a failing `generate` call
    pub fn with_generation_error<S: Into<String>>(self, message: S) -> Self {
        lock(&self.generations).push_back(Err(message.into()));
        self
    }

    /// Fragments the `stream` call yields
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(|f| Ok(f.into())).collect();
        *lock(&self.stream) = Some(StreamScript::Fragments(fragments));
        self
    }

    /// Fragments followed by an error in the middle of the stream
    pub fn with_broken_fragments<I, S>(self, fragments: I, message: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fragments: Vec<_> = fragments.into_iter().map(|f| Ok(f.into())).collect();
        fragments.push(Err(message.to_string()));
        *lock(&self.stream) = Some(StreamScript::Fragments(fragments));
        self
    }

    /// Make the `stream` call itself fail
    pub fn with_stream_error<S: Into<String>>(self, message: S) -> Self {
        *lock(&self.stream) = Some(StreamScript::Fail(message.into()));
        self
    }

    /// Every request received so far, in call order
    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation> {
        lock(&self.requests).push(request.clone());
        match lock(&self.generations).pop_front() {
            Some(Ok(generation)) => Ok(generation),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Generation::default()),
        }
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream> {
        lock(&self.requests).push(request.clone());
        match lock(&self.stream).take() {
            Some(StreamScript::Fragments(fragments)) => Ok(stream::iter(
                fragments
                    .into_iter()
                    .map(|fragment| fragment.map_err(|message| anyhow!(message))),
            )
            .boxed()),
            Some(StreamScript::Fail(message)) => Err(anyhow!(message)),
            None => Ok(stream::empty().boxed()),
        }
    }
}
