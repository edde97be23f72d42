//! Remote console sessions for game servers.
//!
//! Every call to [`RconClient::send`] is one complete session: connect,
//! authenticate with the shared secret, send one command, read one reply,
//! disconnect. Nothing is pooled or kept between calls.

#![doc(html_root_url = "https://docs.rs/banward-rcon/0.3.0")]

mod error;
pub mod session;

pub use error::{RconError, RconResult};
pub use session::{auth_digest, RconClient, SessionConfig};
