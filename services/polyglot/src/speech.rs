use async_trait::async_trait;
use polyglot_core::speech::SpeechBackend;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use tokio::sync::oneshot;

/// Speaks by running an external program (e.g. a small wrapper around
/// `espeak-ng` or `say`) as `<program> <locale> <text>`. The terminal has no
/// microphone input, so recognition is unsupported.
///
/// Each utterance is watched by its own task, which reaps the child when it
/// exits or kills it when cancelled.
pub struct CommandSpeech {
    program: Option<String>,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSpeech {
    pub fn new(program: Option<String>) -> Self {
        Self {
            program,
            current: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .map(|c| c.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SpeechBackend for CommandSpeech {
    fn supports_synthesis(&self) -> bool {
        self.program.is_some()
    }

    fn supports_recognition(&self) -> bool {
        false
    }

    fn cancel(&self) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(stop) = current.take() {
            // Already finished is fine.
            let _ = stop.send(());
        }
    }

    fn utter(&self, text: &str, locale: &str) -> anyhow::Result<()> {
        let Some(program) = &self.program else {
            return Ok(());
        };
        let runtime = tokio::runtime::Handle::try_current()?;
        let mut child = Command::new(program)
            .arg(locale)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let (stop_tx, stop_rx) = oneshot::channel();
        runtime.spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => tracing::debug!(%status, "speech command finished"),
                    Err(e) => tracing::warn!("speech command could not be awaited: {e}"),
                },
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::debug!("speech command already gone: {e}");
                    }
                }
            }
        });

        let mut current = self
            .current
            .lock()
            .map_err(|_| anyhow::anyhow!("speech state poisoned"))?;
        *current = Some(stop_tx);
        Ok(())
    }

    async fn recognize(&self, _locale: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
