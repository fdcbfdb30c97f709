//! Driving the Inoculator web UI: login, triggering jobs and reading their status.

pub mod selectors;
mod session;

pub use session::InoculatorSession;
