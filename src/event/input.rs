use super::Event;
use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Forward terminal input to the main loop until cancelled
pub async fn listen(tx: mpsc::Sender<Event>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Input listener cancelled");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(50)) => {
                // Non-blocking poll, the sleep above already paces us
                if !event::poll(Duration::ZERO).unwrap_or(false) {
                    continue;
                }
                let forwarded = match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
                    Ok(CrosstermEvent::Resize(..)) => Some(Event::Resize),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read terminal event");
                        None
                    }
                };
                if let Some(event) = forwarded {
                    if tx.send(event).await.is_err() {
                        // Channel closed, exit
                        break;
                    }
                }
            }
        }
    }
}
