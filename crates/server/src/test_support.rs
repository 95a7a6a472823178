use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zeroclick_agent::speech::{AudioInput, SpeechError, Transcriber, Transcription};
use zeroclick_agent::test_support::ScriptedLlm;
use zeroclick_agent::{CrmExtractor, LlmClient, QueryAgent};
use zeroclick_db::CrmRepositories;

use crate::api::AppState;
use crate::ingest::Ingestor;

/// Returns one canned transcript and remembers the language of each upload.
pub struct FixedTranscriber {
    result: Result<String, String>,
    languages: Mutex<Vec<Option<String>>>,
}

impl FixedTranscriber {
    pub fn new(result: Result<String, String>) -> Self {
        Self { result, languages: Mutex::new(Vec::new()) }
    }

    pub fn languages(&self) -> Vec<Option<String>> {
        self.languages.lock().expect("languages lock").clone()
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, audio: AudioInput) -> Result<Transcription, SpeechError> {
        self.languages.lock().expect("languages lock").push(audio.language);
        match &self.result {
            Ok(text) => Ok(Transcription {
                text: text.clone(),
                language: "en".to_string(),
                segments: Vec::new(),
            }),
            Err(message) => Err(SpeechError::Network(message.clone())),
        }
    }
}

/// In-memory state whose extractor and query agent share one script.
pub fn state_with(answers: &[&str], transcript: Result<String, String>) -> AppState {
    state_with_transcriber(answers, Arc::new(FixedTranscriber::new(transcript)))
}

pub fn state_with_transcriber(answers: &[&str], transcriber: Arc<FixedTranscriber>) -> AppState {
    let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::replying(answers));
    let repositories = CrmRepositories::in_memory();
    AppState {
        ingestor: Ingestor::new(CrmExtractor::new(llm.clone()), repositories.clone()),
        query_agent: QueryAgent::new(llm),
        transcriber,
        repositories,
    }
}
