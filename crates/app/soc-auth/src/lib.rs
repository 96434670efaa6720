//! Popup authorization handshake for third-party account linking.
//!
//! The popup side ([`HandshakeCoordinator`]) reads the provider redirect,
//! exchanges the grant with the backend and posts the outcome to its opener
//! before closing. The opener side ([`OpenerListener`]) accepts that outcome
//! only from the application origin.
//!
//! A redirect carrying `code` and `state` normally triggers exactly one
//! exchange request. When no bearer token is available the request is not
//! sent at all: the opener receives a `FACEBOOK_AUTH_ERROR` asking the user
//! to sign in, and the popup closes as usual.

mod client;
mod error;
mod opener;
mod popup;
mod token;

pub use client::*;
pub use error::*;
pub use opener::*;
pub use popup::*;
pub use token::*;
