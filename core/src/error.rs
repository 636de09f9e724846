//! Error taxonomy for the measurement loop.

/// Faults a loop iteration can run into.
///
/// Every variant maps to one stage of the cycle and every one is
/// recoverable at iteration granularity: the affected stage is skipped for
/// the current cycle and the loop carries on. Nothing here aborts the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor bus transaction failed or returned out-of-range data.
    SensorUnavailable,
    /// The bus transaction to the display failed.
    DisplayUnavailable,
    /// The network link could not be brought up within the retry budget.
    LinkUnavailable,
    /// The metrics endpoint rejected or never acknowledged a write.
    ReportWriteFailed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SensorUnavailable => write!(f, "sensor unavailable"),
            Error::DisplayUnavailable => write!(f, "display unavailable"),
            Error::LinkUnavailable => write!(f, "network link unavailable"),
            Error::ReportWriteFailed => write!(f, "report write failed"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_names_the_failing_stage() {
        assert_eq!(format!("{}", Error::SensorUnavailable), "sensor unavailable");
        assert_eq!(format!("{}", Error::DisplayUnavailable), "display unavailable");
        assert_eq!(format!("{}", Error::LinkUnavailable), "network link unavailable");
        assert_eq!(format!("{}", Error::ReportWriteFailed), "report write failed");
    }
}
