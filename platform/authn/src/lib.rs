//! Identity plumbing injected into the HTTP layer.
//!
//! Nothing in here is process-global: the server builds one [`JwtIssuer`]
//! and one [`Mailer`] at startup and hands them to handlers through the
//! application state as trait objects.

mod mail;
mod token;

use thiserror::Error;

pub use mail::{
    LogMailer, MailSettings, Mailer, MemoryMailer, OutgoingMail, SmtpMailer, build_mailer,
};
pub use token::{ConfirmationCodes, JwtIssuer, TokenIssuer, TokenSettings};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthnError {
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    TokenExpired,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("invalid mailbox {0}")]
    InvalidMailbox(String),
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}
