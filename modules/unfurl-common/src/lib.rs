pub mod config;
pub mod error;
pub mod record;
pub mod urls;

pub use config::Config;
pub use error::UnfurlError;
pub use record::PostRecord;
pub use urls::{clean_url, extract_domain, parse_video_id};
