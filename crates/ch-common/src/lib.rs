//! Shared runtime plumbing for ClubHub services.

pub mod logging;
