mod dispatch;
mod ledger;
mod rcon;
mod server;

pub use dispatch::*;
pub use ledger::*;
pub use rcon::*;
pub use server::*;
