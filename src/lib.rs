//! Typed client for GitLab group cluster endpoints.
//!
//! - [`gitlab`] - API client and the group cluster resource
//! - [`config`] - Persistent settings for the command-line front end

pub mod config;
pub mod gitlab;
