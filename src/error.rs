use crate::Sequence;

/// Errors raised while building a network or running a study.
///
/// Configuration errors are detected before any numerical work starts.
/// Numerical errors abort the solve that hit them. Non-convergence of the
/// Newton iteration is not an error, see [`crate::PowerFlowSolution`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network has no slack bus")]
    NoSlackBus,

    #[error("more than one slack bus: {0:?}")]
    DuplicateSlackBus(Vec<String>),

    #[error("duplicate bus name '{0}'")]
    DuplicateBus(String),

    #[error("bus '{bus}' referenced by '{component}' does not exist")]
    UnknownBus { bus: String, component: String },

    #[error("PV bus '{0}' has no generator attached")]
    PvBusWithoutGenerator(String),

    #[error("bus '{bus}' is disconnected in the {sequence} network (zero self-admittance)")]
    DisconnectedBus { bus: String, sequence: Sequence },

    #[error("unsupported fault type '{0}'")]
    UnknownFaultType(String),

    #[error("{0} matrix is singular")]
    SingularMatrix(&'static str),

    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl Error {
    /// True for errors caused by the network description or study request
    /// rather than by the numerics.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Error::SingularMatrix(_) | Error::DimensionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
