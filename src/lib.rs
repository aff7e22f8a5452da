pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod install;
pub mod ipc;
pub mod naming;
pub mod profile;
pub mod repo_url;
pub mod scan;
pub mod toc;
pub mod update;
