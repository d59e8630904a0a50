//! `AppEEARS` adapter: token session, catalog and task operations, bundle downloads.

mod client;
mod config;
mod download;
mod session;

pub use client::AppeearsClient;
pub use config::AppeearsConfig;
pub use download::task_download_folder;
