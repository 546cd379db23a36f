pub(super) mod common;

mod access;
mod routing;
