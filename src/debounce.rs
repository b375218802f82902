use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Temporizador que se reinicia con cada valor nuevo.
///
/// Sólo el último valor empujado antes de que venza `delay` llega a `settled`.
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            tx,
            rx,
            pending: None,
        }
    }

    /// Requiere un runtime de tokio activo
    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Espera al próximo valor que sobrevivió al intervalo
    pub async fn settled(&mut self) -> Option<T> {
        if self.pending.is_none() {
            return self.rx.try_recv().ok();
        }
        let value = self.rx.recv().await;
        self.pending = None;
        value
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
