// ABOUTME: Command module aggregator for the caravel CLI.
// ABOUTME: Re-exports one handler per subcommand.

mod connection;
mod deploy;
mod releases;
mod rollback;
mod setup;
mod status;

pub use deploy::{DeployArgs, deploy};
pub use releases::{prune, releases};
pub use rollback::rollback;
pub use setup::setup;
pub use status::status;
