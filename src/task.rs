use std::sync::mpsc;

use crate::error::AppError;

/// Runs blocking work on its own thread; the UI loop polls for the result.
pub struct BackgroundTask<T> {
    receiver: Option<mpsc::Receiver<Result<T, AppError>>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn<F>(task: F) -> Self
    where
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = task();
            let _ = tx.send(result);
        });
        Self { receiver: Some(rx) }
    }

    pub fn try_take(&mut self) -> Option<Result<T, AppError>> {
        let Some(rx) = self.receiver.as_ref() else {
            return None;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(AppError::Message(
                    "Background task channel disconnected".to_string(),
                )))
            }
        }
    }
}

#[cfg(test)]
impl<T: Send + 'static> BackgroundTask<T> {
    /// Blocks until the worker reports back.
    pub fn wait(mut self) -> Result<T, AppError> {
        let rx = self
            .receiver
            .take()
            .ok_or_else(|| AppError::Message("Task already consumed".to_string()))?;
        rx.recv()
            .map_err(|_| AppError::Message("Background task channel disconnected".to_string()))?
    }
}
