use reqwest::blocking::Client;

use crate::core::ProphoraError;

pub mod cache;

pub use cache::SpeechCache;

/// Seam over the external synthesis collaborator so tests and scheduled jobs
/// can run without the network.
pub trait SpeechSynthesizer {
    /// Returns raw mp3 bytes for `text`, or a fatal error if the service
    /// produced no payload.
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProphoraError>;
}

/// The unofficial Google Translate TTS endpoint, fixed to one locale and mp3
/// output for the whole run. No retries: an unresponsive service stalls the
/// run rather than risking a partially-applied retry.
pub struct GoogleTranslateTts {
    client: Client,
    locale: String,
}

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

impl GoogleTranslateTts {
    pub fn new(locale: &str) -> Self {
        GoogleTranslateTts { client: Client::new(), locale: locale.to_string() }
    }
}

impl SpeechSynthesizer for GoogleTranslateTts {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProphoraError> {
        let response = self
            .client
            .get(TTS_ENDPOINT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.locale.as_str()),
                ("q", text),
            ])
            .send()?
            .error_for_status()?;

        let bytes = response.bytes()?.to_vec();
        if bytes.is_empty() {
            return Err(ProphoraError::Synthesis(text.to_string()));
        }
        Ok(bytes)
    }
}
