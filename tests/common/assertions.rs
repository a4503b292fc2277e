//! Event collection helpers and custom assertions

use playlist_dl::{Event, LogLevel};
use tokio::sync::broadcast;

/// Drain every event currently buffered in `events`
pub fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => out.push(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                panic!("test subscriber lagged by {} events", n)
            }
            Err(_) => break,
        }
    }
    out
}

/// `(current, total)` pairs in emission order
pub fn progress_of(events: &[Event]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { current, total } => Some((*current, *total)),
            _ => None,
        })
        .collect()
}

/// Log messages at `level`, in emission order
pub fn logs_at(events: &[Event], level: LogLevel) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Log { message, level: l } if *l == level => Some(message.clone()),
            _ => None,
        })
        .collect()
}

/// Assert progress went `(0, total), (1, total), ... (end, total)` with no gaps
pub fn assert_progress_steps(events: &[Event], total: usize, end: usize) {
    let expected: Vec<(usize, usize)> = (0..=end).map(|i| (i, total)).collect();
    assert_eq!(progress_of(events), expected, "progress sequence");
}
