pub mod download;

pub use download::{find_resume_point, DownloadConfig, Downloader, ResumeScan, DEFAULT_HOST};
