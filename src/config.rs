//! Baseband runtime configuration
//!
//! The configuration is passed to [`Scheduler::new`](crate::sch::Scheduler::new), validated once
//! and read-only afterwards.

use crate::error::Error;

/// Number of protocols which can be registered in the baseband
pub const BB_PROT_NUM: usize = 4;

/// Number of BODs which can be pending at the same time
pub const MAX_BODS: usize = 16;

/// Highest sleep clock accuracy accepted in the configuration
const MAX_CLK_PPM: u16 = 1000;

/// Runtime configuration of the baseband
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtCfg {
    /// Accuracy of the baseband clock in ppm
    pub clk_ppm: u16,
    /// Time needed by the radio to settle before an operation starts
    pub rf_setup_delay_us: u16,
    /// Longest allowed scan period
    pub max_scan_period_ms: u16,
    /// Time needed by the scheduler to hand a BOD to its protocol before the BOD is due
    pub sch_setup_delay_us: u16,
}

impl RtCfg {
    /// Checks if all values are in range
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::config::RtCfg;
    /// use bb_sched::error::Error;
    ///
    /// assert_eq!(RtCfg::default().validate(), Ok(()));
    ///
    /// let cfg = RtCfg {
    ///     sch_setup_delay_us: 0,
    ///     ..RtCfg::default()
    /// };
    /// assert_eq!(cfg.validate(), Err(Error::InvalidConfig));
    /// ```
    pub fn validate(&self) -> Result<(), Error> {
        if self.clk_ppm > MAX_CLK_PPM
            || self.rf_setup_delay_us == 0
            || self.max_scan_period_ms == 0
            || self.sch_setup_delay_us == 0
        {
            return Err(Error::InvalidConfig);
        }

        Ok(())
    }
}

impl Default for RtCfg {
    fn default() -> Self {
        Self {
            clk_ppm: 20,
            rf_setup_delay_us: 150,
            max_scan_period_ms: 10000,
            sch_setup_delay_us: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_accuracy_out_of_range() {
        let cfg = RtCfg {
            clk_ppm: MAX_CLK_PPM + 1,
            ..RtCfg::default()
        };
        assert_eq!(cfg.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_zero_delays_rejected() {
        let cfg = RtCfg {
            rf_setup_delay_us: 0,
            ..RtCfg::default()
        };
        assert_eq!(cfg.validate(), Err(Error::InvalidConfig));

        let cfg = RtCfg {
            max_scan_period_ms: 0,
            ..RtCfg::default()
        };
        assert_eq!(cfg.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_highest_accuracy_accepted() {
        let cfg = RtCfg {
            clk_ppm: MAX_CLK_PPM,
            ..RtCfg::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }
}
