pub mod client;
pub mod error;
pub mod types;

pub use client::WebDriverClient;
pub use error::WebDriverError;
pub use types::{Browser, ElementRef, Locator};
