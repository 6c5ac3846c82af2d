//! Deterministic plant simulation backend.
//!
//! A coarse first-order thermal model: the heat-pump loop picks up a
//! constant load and sheds heat in proportion to commanded fan voltage.
//! Good enough to watch the engine stage towers up and down in a dry run;
//! no randomness, so two runs with equal arguments produce equal logs.

use ctp_common::io::{IoError, PlantIo};
use ctp_common::{OutputSnapshot, RawSnapshot, Stamp};

/// Simulated three-tower plant.
pub struct SimPlant {
    hp_supply: f64,
    tower_supply: f64,
    outdoor: f64,
    last_output: OutputSnapshot,
    tick: u64,
}

impl SimPlant {
    /// New plant at the given outdoor temperature, loop idling warm.
    pub fn new(outdoor: f64) -> Self {
        SimPlant {
            hp_supply: 92.0,
            tower_supply: 78.0,
            outdoor,
            last_output: OutputSnapshot::default(),
            tick: 0,
        }
    }

    /// Advance the thermal model by one cycle.
    fn advance(&mut self) {
        let cooling: f64 = self
            .last_output
            .towers
            .iter()
            .map(|t| if t.vfd_enable { t.fan_speed } else { 0.0 })
            .sum();

        // Constant compressor load versus fan-proportional rejection.
        self.hp_supply += 0.55 - 0.16 * cooling;
        self.hp_supply = self.hp_supply.clamp(68.0, 112.0);

        // Tower loop tracks the HP loop with an offset.
        self.tower_supply += (self.hp_supply - 12.0 - self.tower_supply) * 0.2;
        self.tower_supply = self.tower_supply.clamp(55.0, 105.0);

        self.tick += 1;
    }

    /// Pump current: a running pump draws a nominal ~22 A.
    fn pump_current(&self, i: usize) -> f64 {
        if self.last_output.pumps[i] {
            22.0 + i as f64 * 0.5
        } else {
            0.0
        }
    }

    /// Fan leg current scales with commanded voltage.
    fn fan_current(&self, i: usize) -> f64 {
        let t = &self.last_output.towers[i];
        if t.vfd_enable {
            6.0 * t.fan_speed
        } else {
            0.0
        }
    }

    /// Benign vibration with a small deterministic wobble.
    fn vibration(&self, i: usize) -> f64 {
        1.4 + 0.05 * ((self.tick + i as u64) % 10) as f64
    }
}

impl PlantIo for SimPlant {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn read(&mut self) -> Result<RawSnapshot, IoError> {
        self.advance();
        let snap = RawSnapshot::from_pairs(
            Stamp::now(),
            [
                ("CH1".to_string(), format!("{:.2}", self.tower_supply)),
                ("CH2".to_string(), format!("{:.2}", self.tower_supply + 9.0)),
                ("CH9".to_string(), format!("{:.2}", self.hp_supply - 4.0)),
                ("CH10".to_string(), format!("{:.2}", self.hp_supply)),
                ("outdoorTemp".to_string(), format!("{:.2}", self.outdoor)),
                ("CH8".to_string(), format!("{:.2}", self.pump_current(0))),
                ("CH5".to_string(), format!("{:.2}", self.pump_current(1))),
                ("CH6".to_string(), format!("{:.2}", self.pump_current(2))),
                ("AI1".to_string(), format!("{:.2}", self.fan_current(0))),
                ("AI2".to_string(), format!("{:.2}", self.fan_current(0))),
                ("AI3".to_string(), format!("{:.2}", self.fan_current(1))),
                ("AI4".to_string(), format!("{:.2}", self.fan_current(1))),
                ("AI5".to_string(), format!("{:.2}", self.fan_current(2))),
                ("AI6".to_string(), format!("{:.2}", self.fan_current(2))),
                ("WTV801_1".to_string(), format!("{:.2}", self.vibration(0))),
                ("WTV801_2".to_string(), format!("{:.2}", self.vibration(1))),
                ("WTV801_3".to_string(), format!("{:.2}", self.vibration(2))),
            ],
        );
        Ok(snap)
    }

    fn apply(&mut self, output: &OutputSnapshot) -> Result<(), IoError> {
        self.last_output = output.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctp_common::{TowerOutput, ValveCmd};

    #[test]
    fn loop_heats_without_cooling() {
        let mut sim = SimPlant::new(80.0);
        let first = sim.read().unwrap();
        for _ in 0..50 {
            sim.read().unwrap();
        }
        let later = sim.read().unwrap();
        let t0: f64 = first.get("CH10").unwrap().parse().unwrap();
        let t1: f64 = later.get("CH10").unwrap().parse().unwrap();
        assert!(t1 > t0);
    }

    #[test]
    fn three_fans_pull_the_loop_down() {
        let mut sim = SimPlant::new(80.0);
        let mut out = OutputSnapshot::default();
        for t in out.towers.iter_mut() {
            *t = TowerOutput {
                vfd_enable: true,
                fan_speed: 4.8,
                valve: ValveCmd::Open,
                heater_enable: false,
            };
        }
        sim.apply(&out).unwrap();
        let first = sim.read().unwrap();
        for _ in 0..100 {
            sim.read().unwrap();
        }
        let later = sim.read().unwrap();
        let t0: f64 = first.get("CH10").unwrap().parse().unwrap();
        let t1: f64 = later.get("CH10").unwrap().parse().unwrap();
        assert!(t1 < t0);
    }

    #[test]
    fn pump_current_follows_enable() {
        let mut sim = SimPlant::new(80.0);
        let snap = sim.read().unwrap();
        assert_eq!(snap.get("CH8"), Some("0.00"));

        let mut out = OutputSnapshot::default();
        out.pumps[0] = true;
        sim.apply(&out).unwrap();
        let snap = sim.read().unwrap();
        assert_eq!(snap.get("CH8"), Some("22.00"));
    }
}
