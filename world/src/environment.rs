//! Day/night, weather and traffic-signal state.

use std::time::Duration;

use glam::Vec3;
use midnight_drive_core::{Event, SignalIntensities, SignalPhase, SIGNAL_CYCLE_SECONDS};

/// Road wetness reported while rain is falling.
pub const RAIN_WETNESS: f32 = 0.85;

/// Global environment flags and the signal clock.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    is_night: bool,
    is_raining: bool,
    signal_clock: f32,
}

impl Environment {
    /// Reports whether night is active.
    #[must_use]
    pub const fn is_night(&self) -> bool {
        self.is_night
    }

    /// Reports whether rain is falling.
    #[must_use]
    pub const fn is_raining(&self) -> bool {
        self.is_raining
    }

    /// Signal clock wrapped into `[0, SIGNAL_CYCLE_SECONDS)`.
    #[must_use]
    pub const fn signal_clock(&self) -> f32 {
        self.signal_clock
    }

    /// Phase currently shown by every signal in the city.
    #[must_use]
    pub fn signal_phase(&self) -> SignalPhase {
        SignalPhase::at(self.signal_clock)
    }

    pub(crate) fn set_night(&mut self, enabled: bool, out_events: &mut Vec<Event>) {
        if self.is_night == enabled {
            return;
        }
        self.is_night = enabled;
        out_events.push(if enabled {
            Event::NightFell
        } else {
            Event::DayBroke
        });
    }

    pub(crate) fn set_raining(&mut self, enabled: bool, out_events: &mut Vec<Event>) {
        if self.is_raining == enabled {
            return;
        }
        self.is_raining = enabled;
        out_events.push(if enabled {
            Event::RainStarted
        } else {
            Event::RainStopped
        });
    }

    pub(crate) fn advance(&mut self, elapsed: Duration, out_events: &mut Vec<Event>) {
        let before = self.signal_phase();
        self.signal_clock =
            (self.signal_clock + elapsed.as_secs_f32()).rem_euclid(SIGNAL_CYCLE_SECONDS);
        out_events.push(Event::TimeAdvanced { elapsed });

        let after = self.signal_phase();
        if after != before {
            out_events.push(Event::SignalPhaseChanged { phase: after });
        }
    }
}

/// Shared render-facing state written once per frame from the environment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceState {
    /// Lens intensities shared by every signal head.
    pub signals: SignalIntensities,
    /// Road-surface wetness in `[0, 1]`.
    pub road_wetness: f32,
}

impl SurfaceState {
    pub(crate) fn from_environment(environment: &Environment) -> Self {
        Self {
            signals: SignalIntensities::for_phase(environment.signal_phase()),
            road_wetness: if environment.is_raining() {
                RAIN_WETNESS
            } else {
                0.0
            },
        }
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::from_environment(&Environment::default())
    }
}

/// Lighting and fog parameters derived purely from the environment flags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    /// Hemisphere fill intensity.
    pub ambient: f32,
    /// Directional sun or moon intensity.
    pub sun: f32,
    /// Street-lamp and window emission intensity.
    pub lamps: f32,
    /// Fog colour as linear RGB.
    pub fog_color: Vec3,
    /// Exponential fog density.
    pub fog_density: f32,
    /// Sky clear colour as linear RGB.
    pub sky_color: Vec3,
}

impl Lighting {
    /// Derives lighting for the provided flags.
    #[must_use]
    pub fn from_flags(is_night: bool, is_raining: bool) -> Self {
        let mut lighting = if is_night {
            Self {
                ambient: 0.18,
                sun: 0.08,
                lamps: 1.0,
                fog_color: Vec3::new(0.03, 0.04, 0.09),
                fog_density: 0.006,
                sky_color: Vec3::new(0.02, 0.02, 0.06),
            }
        } else {
            Self {
                ambient: 0.6,
                sun: 1.0,
                lamps: 0.0,
                fog_color: Vec3::new(0.72, 0.8, 0.9),
                fog_density: 0.0025,
                sky_color: Vec3::new(0.53, 0.75, 0.92),
            }
        };

        if is_raining {
            let overcast = Vec3::splat(if is_night { 0.06 } else { 0.45 });
            lighting.ambient *= 0.7;
            lighting.sun *= 0.4;
            lighting.fog_color = lighting.fog_color.lerp(overcast, 0.6);
            lighting.sky_color = lighting.sky_color.lerp(overcast, 0.6);
            lighting.fog_density += 0.006;
        }

        lighting
    }
}
