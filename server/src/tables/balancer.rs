use serde::{Deserialize, Serialize};

/// A sticky-session policy group (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balancer {
    pub name: String,
    pub sticky_session: bool,
    pub sticky_session_cookie: String,
    pub sticky_session_path: String,
    pub sticky_session_remove: bool,
    pub sticky_session_force: bool,
    pub timeout: u32,
    pub max_attempts: u32,
}

impl Balancer {
    /// The defaults CONFIG falls back to when a brand-new balancer needs
    /// to be created (spec §4.3).
    pub fn new_default(name: String) -> Self {
        Self {
            name,
            sticky_session: true,
            sticky_session_cookie: "JSESSIONID".to_string(),
            sticky_session_path: "jsessionid".to_string(),
            sticky_session_remove: false,
            sticky_session_force: true,
            timeout: 0,
            max_attempts: 1,
        }
    }
}
