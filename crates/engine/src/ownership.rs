//! Ownership gate for cancellation requests.
//!
//! An appointment is deletable by its registered user (`X-User-Id` header
//! matching `user_id`) or, for anonymous bookings, by whoever presents the
//! owner token handed out at creation (`X-Owner-Token`). Comparisons are
//! exact string matches; tokens are opaque.

use barbe_common::error::AppError;
use barbe_common::types::Appointment;

/// Why a delete request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDenied {
    /// Row is user-owned but no requester identity was presented.
    MissingIdentity,
    /// Row is anonymous but no owner token was presented.
    MissingToken,
    /// Presented identity or token does not match.
    Forbidden,
    /// Row carries neither a user id nor an owner token; nobody can prove
    /// ownership, so nobody may delete it through this surface.
    NoOwnerData,
}

impl From<DeleteDenied> for AppError {
    fn from(denied: DeleteDenied) -> Self {
        match denied {
            DeleteDenied::MissingIdentity => {
                AppError::Auth("missing X-User-Id header".to_string())
            }
            DeleteDenied::MissingToken => {
                AppError::Auth("missing X-Owner-Token header".to_string())
            }
            DeleteDenied::Forbidden => {
                AppError::Forbidden("not the owner of this appointment".to_string())
            }
            DeleteDenied::NoOwnerData => {
                AppError::Forbidden("appointment has no owner data".to_string())
            }
        }
    }
}

/// Evaluate the cancellation decision table.
pub fn authorize_delete(
    appointment: &Appointment,
    user_header: Option<&str>,
    token_header: Option<&str>,
) -> Result<(), DeleteDenied> {
    if let Some(user_id) = appointment.user_id.as_deref() {
        return match user_header {
            None => Err(DeleteDenied::MissingIdentity),
            Some(requester) if requester != user_id => Err(DeleteDenied::Forbidden),
            Some(_) => Ok(()),
        };
    }

    if let Some(owner_token) = appointment.owner_token.as_deref() {
        return match token_header {
            None => Err(DeleteDenied::MissingToken),
            Some(token) if token != owner_token => Err(DeleteDenied::Forbidden),
            Some(_) => Ok(()),
        };
    }

    Err(DeleteDenied::NoOwnerData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbe_common::types::flexible_time;

    fn make_appointment(user_id: Option<&str>, owner_token: Option<&str>) -> Appointment {
        Appointment {
            id: 1,
            name: "Ana".to_string(),
            service: "Corte".to_string(),
            date: "2024-06-01".parse().unwrap(),
            time: flexible_time::parse("09:00").unwrap(),
            user_id: user_id.map(str::to_string),
            owner_token: owner_token.map(str::to_string),
            notification_sent: false,
            created_at: None,
        }
    }

    #[test]
    fn test_user_owned_requires_identity() {
        let appt = make_appointment(Some("u1"), None);
        assert_eq!(
            authorize_delete(&appt, None, None),
            Err(DeleteDenied::MissingIdentity)
        );
        // A token header does not substitute for identity on a user-owned row.
        assert_eq!(
            authorize_delete(&appt, None, Some("whatever")),
            Err(DeleteDenied::MissingIdentity)
        );
    }

    #[test]
    fn test_user_owned_mismatch_is_forbidden() {
        let appt = make_appointment(Some("u1"), None);
        assert_eq!(
            authorize_delete(&appt, Some("u2"), None),
            Err(DeleteDenied::Forbidden)
        );
    }

    #[test]
    fn test_user_owned_match_allows() {
        let appt = make_appointment(Some("u1"), None);
        assert_eq!(authorize_delete(&appt, Some("u1"), None), Ok(()));
    }

    #[test]
    fn test_anonymous_requires_token() {
        let appt = make_appointment(None, Some("abc"));
        assert_eq!(
            authorize_delete(&appt, None, None),
            Err(DeleteDenied::MissingToken)
        );
    }

    #[test]
    fn test_anonymous_token_mismatch_is_forbidden() {
        let appt = make_appointment(None, Some("abc"));
        assert_eq!(
            authorize_delete(&appt, None, Some("abd")),
            Err(DeleteDenied::Forbidden)
        );
    }

    #[test]
    fn test_anonymous_token_match_allows() {
        let appt = make_appointment(None, Some("abc"));
        assert_eq!(authorize_delete(&appt, None, Some("abc")), Ok(()));
    }

    #[test]
    fn test_no_owner_data_denies_everyone() {
        let appt = make_appointment(None, None);
        assert_eq!(
            authorize_delete(&appt, Some("u1"), Some("abc")),
            Err(DeleteDenied::NoOwnerData)
        );
        assert_eq!(
            authorize_delete(&appt, None, None),
            Err(DeleteDenied::NoOwnerData)
        );
    }

    #[test]
    fn test_user_id_takes_precedence_over_token() {
        // Both present on the row: the user-id path decides.
        let appt = make_appointment(Some("u1"), Some("abc"));
        assert_eq!(authorize_delete(&appt, Some("u1"), None), Ok(()));
        assert_eq!(
            authorize_delete(&appt, None, Some("abc")),
            Err(DeleteDenied::MissingIdentity)
        );
    }
}
