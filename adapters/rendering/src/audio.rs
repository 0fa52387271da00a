//! Audio cue gating.
//!
//! Platforms refuse to start audio before the player interacts, so cues stay
//! muted until the first gesture unlocks the gate. Unlocking happens once per
//! session and cannot be undone.

use midnight_drive_core::{CollisionKind, Event};

use crate::FrameInput;

/// One-shot sound requested by a simulation event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    /// The car hit an obstacle.
    Crash {
        /// Category of the obstacle.
        kind: CollisionKind,
    },
    /// The pursuer appeared.
    PursuerAppeared,
    /// The pursuer caught the car.
    PursuerHit,
    /// Night fell.
    NightAmbience,
    /// Day broke.
    DayAmbience,
    /// Rain started.
    RainStart,
    /// Rain stopped.
    RainStop,
}

impl AudioCue {
    /// Cue raised by `event`, if it is audible.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        match *event {
            Event::VehicleCollided { kind } => Some(Self::Crash { kind }),
            Event::PursuerSpawned { .. } => Some(Self::PursuerAppeared),
            Event::PursuerStruck { .. } => Some(Self::PursuerHit),
            Event::NightFell => Some(Self::NightAmbience),
            Event::DayBroke => Some(Self::DayAmbience),
            Event::RainStarted => Some(Self::RainStart),
            Event::RainStopped => Some(Self::RainStop),
            Event::TimeAdvanced { .. }
            | Event::SignalPhaseChanged { .. }
            | Event::PursuerDespawned => None,
        }
    }
}

/// Lifecycle of the audio output: locked until the first player gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioGate {
    unlocked: bool,
}

impl AudioGate {
    /// Creates a locked gate.
    #[must_use]
    pub const fn new() -> Self {
        Self { unlocked: false }
    }

    /// Reports whether cues are currently audible.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Observes a frame of input and returns `true` on the frame that unlocks
    /// the gate.
    pub fn observe(&mut self, input: &FrameInput) -> bool {
        if self.unlocked || !input.any_gesture {
            return false;
        }
        self.unlocked = true;
        true
    }

    /// Cues for `events`; empty while the gate is locked.
    #[must_use]
    pub fn admit(&self, events: &[Event]) -> Vec<AudioCue> {
        if !self.unlocked {
            return Vec::new();
        }
        events.iter().filter_map(AudioCue::from_event).collect()
    }
}
