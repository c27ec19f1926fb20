use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{
    deck::{Card, Slot},
    player::PlayerId,
};

/// Everything the engine tells a frontend. Fire-and-forget: the engine never
/// waits on the sink and never reads anything back from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UiEvent {
    PlaceCard(Card, Slot),
    RemoveCard(Slot),
    PlaceToken(PlayerId, Slot),
    RemoveToken(PlayerId, Slot),
    Score(PlayerId, u32),
    /// Remaining freeze in milliseconds, 0 once the player thaws.
    Freeze(PlayerId, u64),
    /// Milliseconds left in the round; the flag asks for urgent styling.
    Countdown(u64, bool),
    Winner(Vec<PlayerId>),
}

pub trait UiSink: Send + Sync {
    fn post(&self, event: UiEvent);
}

/// Sink that drops everything. Handy for headless runs.
pub struct NullUi;

impl UiSink for NullUi {
    fn post(&self, _event: UiEvent) {}
}

/// Sink that keeps every event in order, for inspection in tests.
#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> RecordingUi {
        RecordingUi::default()
    }

    pub fn snapshot(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl UiSink for RecordingUi {
    fn post(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}
