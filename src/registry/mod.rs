// Session registry adapter
// Answers "which sessions does this user have" from the external session store
// and evicts sessions by deleting them there

pub mod control;
pub mod information;
pub mod principal;
#[allow(clippy::module_inception)]
pub mod registry;

pub use control::{ConcurrentSessionControl, ControlConfig, ControlError};
pub use information::SessionInformation;
pub use principal::{DisplayPrincipal, Principal, UserDetails};
pub use registry::{RepositorySessionRegistry, SessionRegistry};

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested capability is not available from the session store
    Unsupported(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}
