//! Order email and owner resolution for new orders.
//!
//! Precedence for the order email is: email on the order request, then the
//! email in the token, then the email already stored for the user. A subject
//! the store has never seen becomes a new user, created with the token email
//! (or the order email when the token has none or it does not parse).

use storekeep_core::{Email, EmailError, UserId};

use crate::models::{Claims, NewUser, User};

/// Failures resolving the order email.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailResolutionError {
    #[error("Either an email address or a valid user token is required")]
    EmailRequired,
    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Outcome of resolving who an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailResolution {
    /// Email to store on the order.
    pub email: Email,
    /// Owner; `None` for guest checkouts.
    pub user_id: Option<UserId>,
    /// User to create with the order.
    pub new_user: Option<NewUser>,
}

/// Resolve the order email and owner.
///
/// `existing_user` is the stored user for `claims.sub`, if any. Blank
/// strings count as absent.
///
/// # Errors
///
/// Returns [`EmailResolutionError::EmailRequired`] when no email is
/// available, and [`EmailResolutionError::InvalidEmail`] when the chosen
/// email does not parse.
pub fn resolve_order_email(
    claims: Option<&Claims>,
    existing_user: Option<&User>,
    order_email: Option<&str>,
) -> Result<EmailResolution, EmailResolutionError> {
    let order_email = non_blank(order_email);

    let Some(claims) = claims else {
        let email = order_email.ok_or(EmailResolutionError::EmailRequired)?;
        return Ok(EmailResolution {
            email: Email::parse(email)?,
            user_id: None,
            new_user: None,
        });
    };

    let user_id = claims.user_id();

    if let Some(user) = existing_user {
        let email = order_email
            .or_else(|| claims.email())
            .unwrap_or_else(|| user.email.as_str());
        return Ok(EmailResolution {
            email: Email::parse(email)?,
            user_id: Some(user_id),
            new_user: None,
        });
    }

    let email = order_email
        .or_else(|| claims.email())
        .ok_or(EmailResolutionError::EmailRequired)?;
    let email = Email::parse(email)?;
    // A token email that does not parse falls back to the order email.
    let user_email = claims
        .email()
        .and_then(|e| Email::parse(e).ok())
        .unwrap_or_else(|| email.clone());

    Ok(EmailResolution {
        email,
        user_id: Some(user_id.clone()),
        new_user: Some(NewUser {
            id: user_id,
            email: user_email,
        }),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
