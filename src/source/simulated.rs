//! Simulated rowing monitor and heart-rate strap.
//!
//! Both simulators produce physically plausible, monotonically increasing counters with
//! a little random noise. A fixed seed makes a run reproducible.

use std::f64::consts::PI;
use std::time::Duration;

use futures::Stream;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SimulationConfig;
use crate::measurement::{AutoDragFactor, BleServiceFlag, HeartRateSample, LogLevel, RawFrame};

const HANDLE_FORCE_SAMPLES: usize = 16;
const DRIVE_FRACTION: f64 = 0.35;
// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// A rowing monitor that completes one stroke per frame.
#[derive(Debug)]
pub struct SimulatedRower {
    rng: StdRng,
    interval: Duration,
    frame: RawFrame,
    calories: f64,
}

impl SimulatedRower {
    /// New simulator emitting one frame per `interval`.
    pub fn new(interval: Duration, seed: Option<u64>) -> Self {
        let frame = RawFrame {
            battery_level: 100,
            drag_factor: 110.0,
            flywheel_inertia: 0.101,
            magic_number: 2.8,
            auto_drag_factor: AutoDragFactor::On,
            ble_service_flag: BleServiceFlag::FtmsService,
            log_level: LogLevel::Info,
            ..Default::default()
        };
        Self {
            rng: rng_from(seed),
            interval,
            frame,
            calories: 0.0,
        }
    }

    /// Simulator configured from the `[simulation]` section.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.frame_interval, config.seed)
    }

    /// Advance the device by one stroke and return the resulting frame.
    pub fn next_frame(&mut self) -> RawFrame {
        let rate: f64 = self.rng.gen_range(22.0..30.0);
        let speed: f64 = self.rng.gen_range(3.6..4.6);
        let period_us = (60.0 / rate * 1e6).round() as u64;
        let drive_us = (period_us as f64 * DRIVE_FRACTION).round() as u64;
        let peak: f64 = self.rng.gen_range(350.0..520.0);
        let power = self.frame.magic_number * speed.powi(3);

        let frame = &mut self.frame;
        frame.stroke_count += 1;
        frame.stroke_time += period_us;
        frame.rev_time += period_us;
        frame.elapsed_time += period_us;
        frame.distance += speed * (period_us as f64 / 1e6) * 100.0;
        frame.drive_duration = drive_us;
        frame.recovery_duration = period_us - drive_us;
        frame.avg_stroke_power = power;
        frame.handle_forces = (0..HANDLE_FORCE_SAMPLES)
            .map(|i| {
                let phase = (i as f64 + 0.5) / HANDLE_FORCE_SAMPLES as f64;
                peak * (PI * phase).sin()
            })
            .collect();

        // Mechanical work to metabolic kcal, assuming roughly 25% efficiency.
        self.calories += power * (period_us as f64 / 1e6) * 4.0 / 4184.0;
        frame.total_calories = self.calories.floor();
        if frame.stroke_count % 200 == 0 {
            frame.battery_level = frame.battery_level.saturating_sub(1);
        }

        frame.clone()
    }

    /// Turn the simulator into a paced stream; the first frame is emitted immediately.
    pub fn into_stream(self) -> impl Stream<Item = RawFrame> + Send + 'static {
        let mut ticker = interval(self.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        futures::stream::unfold((self, ticker), |(mut rower, mut ticker)| async move {
            ticker.tick().await;
            let frame = rower.next_frame();
            Some((frame, (rower, ticker)))
        })
    }
}

/// A chest strap whose reading wanders around a working heart rate.
#[derive(Debug)]
pub struct SimulatedHeartRate {
    rng: StdRng,
    interval: Duration,
    bpm: f64,
    contact_loss_probability: f64,
}

impl SimulatedHeartRate {
    /// New strap emitting one reading per `interval`.
    pub fn new(interval: Duration, seed: Option<u64>) -> Self {
        Self {
            // Offset the seed so the strap does not mirror the rower's noise.
            rng: rng_from(seed.map(|s| s.wrapping_add(1))),
            interval,
            bpm: 120.0,
            contact_loss_probability: 0.05,
        }
    }

    /// Strap configured from the `[simulation]` section.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.heart_rate_interval, config.seed)
    }

    /// Override how often a reading is flagged as lacking skin contact.
    pub fn with_contact_loss_probability(mut self, probability: f64) -> Self {
        self.contact_loss_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Next reading.
    pub fn next_sample(&mut self) -> HeartRateSample {
        self.bpm = (self.bpm + self.rng.gen_range(-3.0..3.5)).clamp(60.0, 190.0);
        let bpm = self.bpm.round() as u16;
        if self.rng.gen_bool(self.contact_loss_probability) {
            HeartRateSample::without_contact(bpm)
        } else {
            HeartRateSample::new(bpm)
        }
    }

    /// Turn the strap into a paced stream.
    pub fn into_stream(self) -> impl Stream<Item = HeartRateSample> + Send + 'static {
        let mut ticker = interval(self.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        futures::stream::unfold((self, ticker), |(mut strap, mut ticker)| async move {
            ticker.tick().await;
            let sample = strap.next_sample();
            Some((sample, (strap, ticker)))
        })
    }
}
