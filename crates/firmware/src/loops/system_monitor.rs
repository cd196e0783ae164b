//! Analog system monitor: sample the die temperature and supply rails once
//! per period and print two of them.

use control_core::fatal::FatalReason;
use embedded_hal::delay::DelayNs;
use platform::adc::{raw_to_temperature, raw_to_voltage, AdcChannel, SequenceChannels, SequencerMode, SystemMonitor};
use platform::console::Console;

use super::{line, ControlLoop, Progress};

/// System monitor loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemMonitorConfig {
    /// Sampling period
    pub period_ms: u32,
    /// VP/VN gain applied after the divisor
    pub vp_vn_gain: f32,
    /// VP/VN divisor
    pub vp_vn_divisor: f32,
}

impl Default for SystemMonitorConfig {
    fn default() -> Self {
        // The VP/VN input on the Zedboard reads high by this ratio.
        Self {
            period_ms: 1_000,
            vp_vn_gain: 0.64,
            vp_vn_divisor: 1.88,
        }
    }
}

impl SystemMonitorConfig {
    /// Apply the VP/VN calibration to a converted reading.
    #[allow(clippy::arithmetic_side_effects)] // Safety: float ops, a zero divisor yields inf, not a trap
    pub fn calibrate_vp_vn(&self, volts: f32) -> f32 {
        volts / self.vp_vn_divisor * self.vp_vn_gain
    }
}

/// One converted sample of every channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    /// Die temperature, degrees Celsius
    pub temperature_c: f32,
    /// PL internal supply, volts
    pub vcc_int: f32,
    /// PL auxiliary supply, volts
    pub vcc_aux: f32,
    /// PL block RAM supply, volts
    pub v_bram: f32,
    /// PS internal supply, volts
    pub vcc_p_int: f32,
    /// PS auxiliary supply, volts
    pub vcc_p_aux: f32,
    /// PS DDR I/O supply, volts
    pub vcc_p_ddr: f32,
    /// Calibrated VP/VN input, volts
    pub vp_vn: f32,
}

/// Every channel the loop converts.
pub const MONITORED: SequenceChannels = SequenceChannels::all();

/// Periodic supply printout.
pub struct SystemMonitorLoop<M, D, W> {
    monitor: M,
    delay: D,
    console: W,
    config: SystemMonitorConfig,
    latest: Readings,
}

impl<M, D, W> SystemMonitorLoop<M, D, W>
where
    M: SystemMonitor,
    D: DelayNs,
    W: Console,
{
    /// Enable every channel (sequencer in safe mode), disable the alarms,
    /// start the continuous sequence.
    pub fn init(
        mut monitor: M,
        delay: D,
        console: W,
        config: SystemMonitorConfig,
    ) -> Result<Self, FatalReason> {
        monitor.set_sequencer_mode(SequencerMode::Safe);
        monitor.set_channel_enables(MONITORED)?;
        monitor.set_alarm_enables(0);
        monitor.set_sequencer_mode(SequencerMode::ContinuousPass);
        #[cfg(feature = "defmt")]
        defmt::info!("system monitor sequencing {} channels", MONITORED.bits().count_ones());

        Ok(Self {
            monitor,
            delay,
            console,
            config,
            latest: Readings::default(),
        })
    }

    /// Convert the latest result of every channel.
    pub fn sample(&mut self) -> Readings {
        let temperature_c = raw_to_temperature(self.monitor.read_raw(AdcChannel::Temperature));
        let mut volts = |channel| raw_to_voltage(self.monitor.read_raw(channel));
        Readings {
            temperature_c,
            vcc_int: volts(AdcChannel::VccInt),
            vcc_aux: volts(AdcChannel::VccAux),
            v_bram: volts(AdcChannel::VBram),
            vcc_p_int: volts(AdcChannel::VccPInt),
            vcc_p_aux: volts(AdcChannel::VccPAux),
            vcc_p_ddr: volts(AdcChannel::VccPDdr),
            vp_vn: self.config.calibrate_vp_vn(volts(AdcChannel::VpVn)),
        }
    }

    /// Readings from the last pass.
    pub fn latest(&self) -> Readings {
        self.latest
    }

    /// The monitor driver.
    pub fn monitor(&self) -> &M {
        &self.monitor
    }
}

impl<M, D, W> ControlLoop for SystemMonitorLoop<M, D, W>
where
    M: SystemMonitor,
    D: DelayNs,
    W: Console,
{
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        let readings = self.sample();
        self.latest = readings;
        self.console
            .write_line(&line::<32>(format_args!("VCC INT: {:.6}", readings.vcc_int)));
        self.console
            .write_line(&line::<32>(format_args!("VP-VN: {:.6}", readings.vp_vn)));
        self.console.write_line("");
        #[cfg(feature = "emulator")]
        tracing::debug!(
            temperature_c = readings.temperature_c,
            vcc_aux = readings.vcc_aux,
            "system monitor sample"
        );
        self.delay.delay_ms(self.config.period_ms);
        Ok(Progress::Acted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{MockConsole, MockDelay, MockSystemMonitor};

    #[test]
    fn init_enables_every_channel_in_safe_mode() {
        let lp = SystemMonitorLoop::init(
            MockSystemMonitor::new(),
            MockDelay::new(),
            MockConsole::new(),
            SystemMonitorConfig::default(),
        )
        .unwrap();
        assert_eq!(lp.monitor().enabled(), SequenceChannels::all());
        assert_eq!(lp.monitor().alarms(), 0);
        assert_eq!(lp.monitor().mode(), SequencerMode::ContinuousPass);
    }

    #[test]
    fn prints_vccint_and_calibrated_vpvn_each_second() {
        let console = MockConsole::new();
        let delay = MockDelay::new();
        let adc = MockSystemMonitor::new()
            .with_raw(AdcChannel::VccInt, 0x5550)
            .with_raw(AdcChannel::VpVn, 0x8000)
            .with_raw(AdcChannel::Temperature, 0x9C00);
        let mut lp = SystemMonitorLoop::init(
            adc,
            delay.clone(),
            console.clone(),
            SystemMonitorConfig::default(),
        )
        .unwrap();

        assert_eq!(lp.poll().unwrap(), Progress::Acted);
        assert_eq!(
            console.lines(),
            vec!["VCC INT: 0.999756", "VP-VN: 0.510638", ""]
        );
        assert_eq!(delay.total_ns(), 1_000_000_000);
        assert_eq!(lp.monitor().reads(), 8);
        let t = lp.latest().temperature_c;
        assert!((t - (2496.0 * 503.975 / 4096.0 - 273.15)).abs() < 1e-3);
    }

    #[test]
    fn calibration_is_configurable() {
        let config = SystemMonitorConfig {
            vp_vn_gain: 1.0,
            vp_vn_divisor: 1.0,
            ..SystemMonitorConfig::default()
        };
        assert_eq!(config.calibrate_vp_vn(0.75), 0.75);
    }
}
