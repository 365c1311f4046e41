//! Text-to-speech and single-shot speech recognition.
//!
//! [`Speech`] wraps a platform [`SpeechBackend`] and owns the rules the
//! backends should not have to know about: a new utterance always cancels the
//! previous one, only one recognition runs at a time, and a missing
//! recognition capability is reported once and then ignored.

use crate::error::{PolyglotError, Result};
use crate::language::Language;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn supports_synthesis(&self) -> bool;

    fn supports_recognition(&self) -> bool;

    /// Stops whatever utterance is currently playing, if any.
    fn cancel(&self);

    fn utter(&self, text: &str, locale: &str) -> anyhow::Result<()>;

    /// Listens until one final transcript is available. `None` means nothing
    /// was recognized.
    async fn recognize(&self, locale: &str) -> anyhow::Result<Option<String>>;
}

/// A backend for platforms without any speech support.
pub struct NoSpeech;

#[async_trait]
impl SpeechBackend for NoSpeech {
    fn supports_synthesis(&self) -> bool {
        false
    }

    fn supports_recognition(&self) -> bool {
        false
    }

    fn cancel(&self) {}

    fn utter(&self, _text: &str, _locale: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn recognize(&self, _locale: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

pub struct Speech<B> {
    backend: B,
    listening: AtomicBool,
    warned: AtomicBool,
}

struct ListeningGuard<'a>(&'a AtomicBool);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<B: SpeechBackend> Speech<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            listening: AtomicBool::new(false),
            warned: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Speaks `text` in the language's locale, interrupting any earlier
    /// utterance. Does nothing when synthesis is unavailable.
    pub fn speak(&self, language: Language, text: &str) {
        if !self.backend.supports_synthesis() {
            return;
        }
        self.backend.cancel();
        if let Err(e) = self.backend.utter(text, language.locale()) {
            tracing::warn!("speech synthesis failed: {e:#}");
        }
    }

    /// Runs one recognition and returns its transcript.
    ///
    /// Without recognition support the first call fails with
    /// `UnsupportedCapability` and later calls quietly return `None`.
    pub async fn listen(&self, language: Language) -> Result<Option<String>> {
        if !self.backend.supports_recognition() {
            if self.warned.swap(true, Ordering::AcqRel) {
                return Ok(None);
            }
            tracing::warn!("speech recognition is not supported on this platform");
            return Err(PolyglotError::UnsupportedCapability("speech recognition"));
        }
        if self
            .listening
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PolyglotError::RecognitionInProgress);
        }
        let _guard = ListeningGuard(&self.listening);

        match self.backend.recognize(language.locale()).await {
            Ok(transcript) => Ok(transcript.filter(|t| !t.trim().is_empty())),
            Err(e) => {
                tracing::warn!("speech recognition failed: {e:#}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[test]
    fn speaking_cancels_the_previous_utterance_first() {
        let mut backend = MockSpeechBackend::new();
        let mut seq = Sequence::new();
        backend.expect_supports_synthesis().return_const(true);
        backend
            .expect_cancel()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        backend
            .expect_utter()
            .withf(|text, locale| text == "Hallo" && locale == "de-DE")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        Speech::new(backend).speak(Language::German, "Hallo");
    }

    #[test]
    fn speaking_without_synthesis_is_a_no_op() {
        let mut backend = MockSpeechBackend::new();
        backend.expect_supports_synthesis().return_const(false);
        backend.expect_cancel().never();
        backend.expect_utter().never();

        Speech::new(backend).speak(Language::Korean, "안녕하세요");
    }

    #[tokio::test]
    async fn missing_recognition_is_reported_once() {
        let speech = Speech::new(NoSpeech);

        let err = speech.listen(Language::Finnish).await.unwrap_err();
        assert!(matches!(err, PolyglotError::UnsupportedCapability(_)));
        assert_eq!(speech.listen(Language::Finnish).await.unwrap(), None);
    }

    #[tokio::test]
    async fn recognition_errors_yield_no_transcript() {
        let mut backend = MockSpeechBackend::new();
        backend.expect_supports_recognition().return_const(true);
        backend
            .expect_recognize()
            .withf(|locale| locale == "sv-SE")
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("no-speech")));

        let speech = Speech::new(backend);
        assert_eq!(speech.listen(Language::Swedish).await.unwrap(), None);
        assert!(!speech.is_listening());
    }

    struct PendingBackend {
        rx: Mutex<Option<oneshot::Receiver<String>>>,
    }

    #[async_trait]
    impl SpeechBackend for PendingBackend {
        fn supports_synthesis(&self) -> bool {
            false
        }
        fn supports_recognition(&self) -> bool {
            true
        }
        fn cancel(&self) {}
        fn utter(&self, _text: &str, _locale: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn recognize(&self, _locale: &str) -> anyhow::Result<Option<String>> {
            let rx = self.rx.lock().unwrap().take();
            match rx {
                Some(rx) => Ok(rx.await.ok()),
                None => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn second_listen_while_active_is_rejected() {
        let (tx, rx) = oneshot::channel();
        let speech = Speech::new(PendingBackend {
            rx: Mutex::new(Some(rx)),
        });

        let (first, second, ()) = tokio::join!(
            speech.listen(Language::Japanese),
            speech.listen(Language::Japanese),
            async {
                tx.send("こんにちは".to_string()).unwrap();
            },
        );
        assert_eq!(first.unwrap().as_deref(), Some("こんにちは"));
        assert!(matches!(second, Err(PolyglotError::RecognitionInProgress)));
        assert!(!speech.is_listening());
    }
}
