pub mod cache;
pub mod config;
pub mod exception;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod scripting;
pub mod storage;

pub use cache::DeliveryCache;
pub use config::Config;
pub use exception::Exception;
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion, ResponseType};
pub use request::Request;
pub use resolver::HtmlExtension;
pub use response::{FileDelivery, Response};
pub use scripting::{ScriptHost, TemplateRenderer};
pub use storage::{StorageGroupLookup, StorageGroups};
