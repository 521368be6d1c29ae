// Principal name derivation
//
// The name returned here must match the value the session store indexed the
// session under (see `StoredSession::principal_name`), otherwise lookups
// silently come back empty.

use crate::session::Authentication;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated identity that can name itself
pub trait Principal: Send + Sync {
    /// Name used as the session store's principal index value
    fn display_name(&self) -> String;
}

/// User account details of a logged-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserDetails {
    pub username: String,
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl UserDetails {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            authorities: Vec::new(),
        }
    }
}

impl Principal for UserDetails {
    fn display_name(&self) -> String {
        self.username.clone()
    }
}

impl Principal for Authentication {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Principal for str {
    fn display_name(&self) -> String {
        self.to_string()
    }
}

impl Principal for String {
    fn display_name(&self) -> String {
        self.clone()
    }
}

/// Adapts any `Display` identity by using its string representation
#[derive(Debug, Clone)]
pub struct DisplayPrincipal<T>(pub T);

impl<T: fmt::Display + Send + Sync> Principal for DisplayPrincipal<T> {
    fn display_name(&self) -> String {
        self.0.to_string()
    }
}
