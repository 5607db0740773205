pub mod mailer;
pub mod message;
pub mod pipeline;

pub use mailer::{Mailer, SmtpMailer};
pub use message::{compose, OutboundEmail};
pub use pipeline::{load_blocking, NotificationPipeline, NotifySummary, PipelineFailure, PipelineStage};
