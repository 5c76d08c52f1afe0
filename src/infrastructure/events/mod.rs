//! Events - 后台上传事件观察者

mod upload_reporter;

pub use upload_reporter::{MemoryPromotingReporter, TracingUploadReporter};
