//! Compile-time registry of FDSN event service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`enabled_services`].

use serde::Deserialize;

/// An FDSN event service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct EventService {
    /// Unique identifier (e.g., `"ingv"`, `"usgs"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be selected without naming it explicitly.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order; the lowest enabled priority is the default service.
    pub priority: u32,
    /// `fdsnws/event/1/query` endpoint.
    pub base_url: String,
    /// Optional `limit` query parameter sent with every request.
    #[serde(default)]
    pub limit: Option<u64>,
}

const fn default_true() -> bool {
    true
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("ingv", include_str!("../services/ingv.toml")),
    ("usgs", include_str!("../services/usgs.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all event service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<EventService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse event service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<EventService> {
    let mut services: Vec<EventService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Looks up a service by ID, including disabled ones.
#[must_use]
pub fn find_service(id: &str) -> Option<EventService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// Returns the highest-priority enabled service.
#[must_use]
pub fn default_service() -> Option<EventService> {
    enabled_services().into_iter().next()
}
