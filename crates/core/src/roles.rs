//! Well-known role name constants.
//!
//! These are the values carried in the `role` claim of an access token.

pub const ROLE_JOURNALIST: &str = "journalist";
pub const ROLE_TRAINER: &str = "trainer";
pub const ROLE_GUEST_EDITOR: &str = "guest_editor";

/// Roles allowed to moderate a newslab (override locks, trigger sweeps).
pub const MODERATOR_ROLES: &[&str] = &[ROLE_TRAINER, ROLE_GUEST_EDITOR];

/// Returns `true` if the role may moderate stories it does not own.
pub fn is_moderator(role: &str) -> bool {
    MODERATOR_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderator_roles() {
        assert!(is_moderator("trainer"));
        assert!(is_moderator("guest_editor"));
        assert!(!is_moderator("journalist"));
        assert!(!is_moderator("Trainer"));
    }
}
