//! Fault injection for the mock digitizer.
//!
//! Enables deterministic accessor failures for resilience testing. Every
//! accessor call on a [`MockDigitizer`](crate::MockDigitizer) is checked
//! against the configured [`FaultScenario`]s before it touches any register.

use std::collections::HashMap;

use digi_core::{DeviceError, DeviceErrorKind, DeviceResult};

/// A way for accessor calls to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultScenario {
    /// Every call to `accessor` fails with a communication error
    Fail {
        /// Targeted accessor
        accessor: &'static str,
    },
    /// Calls to `accessor` succeed `count` times, then fail
    FailAfterN {
        /// Targeted accessor
        accessor: &'static str,
        /// Successful calls before the first failure
        count: u32,
    },
    /// Every call to `accessor` times out
    Timeout {
        /// Targeted accessor
        accessor: &'static str,
    },
    /// The first call to any accessor loses the link; all later calls fail
    CommunicationLoss,
}

/// Fault injection configuration for one mock digitizer.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    scenarios: Vec<FaultScenario>,
    call_counts: HashMap<&'static str, u32>,
    link_lost: bool,
}

impl FaultPlan {
    /// Plan with no faults
    pub fn none() -> Self {
        Self::default()
    }

    /// Plan with a single scenario
    pub fn scenario(scenario: FaultScenario) -> Self {
        Self::scenarios(vec![scenario])
    }

    /// Plan with multiple scenarios
    pub fn scenarios(scenarios: Vec<FaultScenario>) -> Self {
        Self {
            scenarios,
            ..Default::default()
        }
    }

    /// Shorthand for [`FaultScenario::Fail`]
    pub fn failing(accessor: &'static str) -> Self {
        Self::scenario(FaultScenario::Fail { accessor })
    }

    /// Add a scenario to the plan
    pub fn with(mut self, scenario: FaultScenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Check whether a call to `accessor` should fail.
    pub fn check(&mut self, accessor: &'static str) -> DeviceResult<()> {
        if self.link_lost {
            return Err(DeviceError::communication(accessor, "Communication lost"));
        }

        let calls = self.call_counts.entry(accessor).or_insert(0);
        *calls += 1;
        let calls = *calls;

        for scenario in &self.scenarios {
            match scenario {
                FaultScenario::Fail { accessor: target } if *target == accessor => {
                    return Err(DeviceError::communication(accessor, "Injected failure"));
                }
                FaultScenario::FailAfterN {
                    accessor: target,
                    count,
                } if *target == accessor && calls > *count => {
                    return Err(DeviceError::new(
                        accessor,
                        DeviceErrorKind::Hardware,
                        format!("Injected failure after {} calls", count),
                    ));
                }
                FaultScenario::Timeout { accessor: target } if *target == accessor => {
                    return Err(DeviceError::new(
                        accessor,
                        DeviceErrorKind::Timeout,
                        format!("Call to '{}' timed out", accessor),
                    ));
                }
                FaultScenario::CommunicationLoss => {
                    self.link_lost = true;
                    return Err(DeviceError::communication(accessor, "Communication lost"));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Clear call counters and restore a lost link.
    pub fn reset(&mut self) {
        self.call_counts.clear();
        self.link_lost = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_faults() {
        let mut plan = FaultPlan::none();
        for _ in 0..10 {
            assert!(plan.check("GetRecordLength").is_ok());
        }
    }

    #[test]
    fn test_fail_targets_one_accessor() {
        let mut plan = FaultPlan::failing("SetRecordLength");
        let err = plan.check("SetRecordLength").unwrap_err();
        assert_eq!(err.accessor, "SetRecordLength");
        assert_eq!(err.kind, DeviceErrorKind::Communication);
        assert!(plan.check("GetRecordLength").is_ok());
    }

    #[test]
    fn test_fail_after_n() {
        let mut plan = FaultPlan::scenario(FaultScenario::FailAfterN {
            accessor: "GetIOLevel",
            count: 2,
        });
        assert!(plan.check("GetIOLevel").is_ok());
        assert!(plan.check("GetIOLevel").is_ok());
        assert!(plan.check("GetIOLevel").is_err());

        plan.reset();
        assert!(plan.check("GetIOLevel").is_ok());
    }

    #[test]
    fn test_timeout_kind() {
        let mut plan = FaultPlan::none().with(FaultScenario::Timeout {
            accessor: "SetAcquisitionMode",
        });
        let err = plan.check("SetAcquisitionMode").unwrap_err();
        assert_eq!(err.kind, DeviceErrorKind::Timeout);
    }

    #[test]
    fn test_communication_loss_is_sticky() {
        let mut plan = FaultPlan::scenario(FaultScenario::CommunicationLoss);
        assert!(plan.check("GetRecordLength").is_err());
        assert!(plan.check("GetIOLevel").is_err());

        plan.reset();
        // The scenario is still configured and trips again on the next call
        assert!(plan.check("GetIOLevel").is_err());
    }
}
