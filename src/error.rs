//! Error types for the post-processing routines.

/// Routines of the pressure-level engine that can fail to bracket a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    /// Geopotential height on pressure levels
    Height,
    /// Linear-in-sigma interpolation
    Intlin,
    /// Log-in-sigma interpolation
    Intlog,
}

impl std::fmt::Display for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Routine::Height => "height",
            Routine::Intlin => "intlin",
            Routine::Intlog => "intlog",
        };
        f.write_str(name)
    }
}

/// Possible post-processing errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PostError {
    /// The inputs don't have the expected shape(s)
    InconsistentInputs,
    /// The sigma table is too short, unordered, or out of range
    InvalidSigma,
    /// Grid extents, spacing, or top pressure are not usable
    InvalidGrid,
    /// A pressure level could not be placed in any interpolation regime
    UnresolvableBracket {
        /// The routine that failed
        routine: Routine,
        /// The offending target pressure
        level: f32,
    },
    /// An array is not contiguous when it was assumed to be
    NotContiguous,
}

impl std::fmt::Display for PostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostError::InconsistentInputs => {
                write!(f, "inputs have the wrong shape for the grid")
            }
            PostError::InvalidSigma => {
                write!(f, "sigma levels must be strictly increasing within [0, 1]")
            }
            PostError::InvalidGrid => write!(f, "grid dimensions or spacing are invalid"),
            PostError::UnresolvableBracket { routine, level } => {
                write!(f, "no pressure bracket for level {level} in {routine}")
            }
            PostError::NotContiguous => write!(f, "array slice not contiguous in memory"),
        }
    }
}

impl std::error::Error for PostError {}

/// Convenience alias for results carrying a [`PostError`].
pub type Result<T> = std::result::Result<T, PostError>;
