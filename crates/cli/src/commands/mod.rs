//! Top level subcommands

pub(crate) mod check;
pub(crate) mod command;
pub(crate) mod units;
pub(super) mod util;
pub(crate) mod validate;
