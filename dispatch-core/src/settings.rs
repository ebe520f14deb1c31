//! Lease manager timing settings.
//!
//! Plain numeric settings consumed (not owned) by the core. The API crate
//! loads them from the environment; tests construct them directly.

// ============================================================================
// LEASE SETTINGS
// ============================================================================

/// Timing knobs for the lease protocol and token issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseSettings {
    /// How long a granted lease holds off competing acquirers. Must exceed
    /// the worst-case delivery pipeline latency so a slow-but-successful
    /// send is never preempted.
    pub lease_duration_secs: i64,

    /// Mandatory waiting period after a failed delivery before another
    /// attempt is permitted. Long enough to avoid a retry storm, short
    /// enough that a transient outage doesn't suppress a legitimate lead.
    pub error_cooldown_secs: i64,

    /// Store-level retention for lease records. Far beyond the lease and
    /// cooldown windows so history stays inspectable for a while.
    pub record_retention_secs: i64,

    /// Validity window for issued "text customer" link tokens.
    pub token_ttl_secs: i64,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            lease_duration_secs: 120,          // 2 minutes
            error_cooldown_secs: 300,          // 5 minutes
            record_retention_secs: 2_592_000,  // 30 days
            token_ttl_secs: 604_800,           // 7 days
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_are_ordered() {
        let settings = LeaseSettings::default();
        assert!(settings.lease_duration_secs < settings.error_cooldown_secs);
        assert!(settings.error_cooldown_secs < settings.record_retention_secs);
        assert!(settings.token_ttl_secs < settings.record_retention_secs);
    }
}
