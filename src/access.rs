use serde::Serialize;
use thiserror::Error;

use crate::models::{Profile, Role, Tier};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no profile found for {0}; run `lessons seed` or create one first")]
    UnknownUser(String),

    #[error("{feature} requires the {required} plan (current plan: {current})")]
    TierRequired {
        feature: &'static str,
        required: &'static str,
        current: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub can_export: bool,
    pub can_use_ai: bool,
    pub advanced_analytics: bool,
    /// Informational only; no command is gated on it.
    pub custom_dashboards: bool,
}

impl FeatureFlags {
    pub fn for_profile(role: Role, tier: Tier) -> Self {
        if role == Role::Admin {
            return Self::all();
        }

        match tier {
            Tier::Free => Self {
                can_export: false,
                can_use_ai: false,
                advanced_analytics: false,
                custom_dashboards: false,
            },
            Tier::Pro => Self {
                can_export: true,
                can_use_ai: false,
                advanced_analytics: true,
                custom_dashboards: false,
            },
            Tier::Enterprise => Self::all(),
        }
    }

    fn all() -> Self {
        Self {
            can_export: true,
            can_use_ai: true,
            advanced_analytics: true,
            custom_dashboards: true,
        }
    }
}

/// The signed-in user, passed explicitly to every command that needs it.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile: Profile,
    pub features: FeatureFlags,
}

impl Session {
    pub fn new(profile: Profile) -> Self {
        let features = FeatureFlags::for_profile(profile.role, profile.tier);
        Self { profile, features }
    }

    pub fn require_export(&self) -> Result<(), AccessError> {
        self.require(self.features.can_export, "export", Tier::Pro)
    }

    pub fn require_ai(&self) -> Result<(), AccessError> {
        self.require(self.features.can_use_ai, "insights", Tier::Enterprise)
    }

    fn require(&self, allowed: bool, feature: &'static str, tier: Tier) -> Result<(), AccessError> {
        if allowed {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.profile.email,
                tier = self.profile.tier.as_str(),
                feature,
                "feature gated by subscription tier"
            );
            Err(AccessError::TierRequired {
                feature,
                required: tier.as_str(),
                current: self.profile.tier.as_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn profile(role: Role, tier: Tier) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            full_name: "Sam Rivera".to_string(),
            role,
            tier,
        }
    }

    #[test]
    fn free_tier_has_no_premium_features() {
        let flags = FeatureFlags::for_profile(Role::User, Tier::Free);
        assert!(!flags.can_export);
        assert!(!flags.can_use_ai);
        assert!(!flags.advanced_analytics);
        assert!(!flags.custom_dashboards);
    }

    #[test]
    fn pro_tier_exports_but_no_ai() {
        let flags = FeatureFlags::for_profile(Role::User, Tier::Pro);
        assert!(flags.can_export);
        assert!(flags.advanced_analytics);
        assert!(!flags.can_use_ai);
        assert!(!flags.custom_dashboards);
    }

    #[test]
    fn enterprise_and_admin_get_everything() {
        let all = FeatureFlags::all();
        assert_eq!(FeatureFlags::for_profile(Role::User, Tier::Enterprise), all);
        assert_eq!(FeatureFlags::for_profile(Role::Admin, Tier::Free), all);
    }

    #[test]
    fn session_gates_report_tier_requirements() {
        let session = Session::new(profile(Role::User, Tier::Free));
        let err = session.require_export().unwrap_err();
        assert_eq!(
            err.to_string(),
            "export requires the pro plan (current plan: free)"
        );

        let session = Session::new(profile(Role::User, Tier::Pro));
        assert!(session.require_export().is_ok());
        assert!(session.require_ai().is_err());
    }
}
