use shiptrack_core::UserId;

/// Out-of-band message for a user (normally delivered by email).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EmailConfirmation {
        to: String,
        user_id: UserId,
        token: String,
    },
    PasswordReset {
        to: String,
        token: String,
    },
}

/// Delivery port for [`Notification`]s.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Writes notifications to the log instead of sending mail. Tokens are never
/// logged; only the recipient and the kind of message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::EmailConfirmation { .. } => "email_confirmation",
            Notification::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::EmailConfirmation { to, .. } | Notification::PasswordReset { to, .. } => to,
        }
    }
}

impl Notifier for TracingNotifier {
    fn send(&self, notification: Notification) {
        tracing::info!(
            to = %notification.recipient(),
            kind = notification.kind(),
            "notification queued"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_expose_recipient_and_kind_only() {
        let reset = Notification::PasswordReset {
            to: "ops@example.com".to_string(),
            token: "secret-token".to_string(),
        };
        assert_eq!(reset.recipient(), "ops@example.com");
        assert_eq!(reset.kind(), "password_reset");

        let confirm = Notification::EmailConfirmation {
            to: "new@example.com".to_string(),
            user_id: UserId::new(),
            token: "secret-token".to_string(),
        };
        assert_eq!(confirm.recipient(), "new@example.com");
        assert_eq!(confirm.kind(), "email_confirmation");
    }
}
