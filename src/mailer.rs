//! Outbound email seam.
//!
//! Delivery itself is an external collaborator; the service only needs a
//! place to hand a message to. The default implementation records the mail
//! through tracing, which is enough for development and tests.

use async_trait::async_trait;

/// Something that can deliver a notification email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()>;
}

/// Mailer that logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            from = %from,
            to = %to.join(", "),
            subject = %subject,
            body_len = body.len(),
            "Outbound mail"
        );
        Ok(())
    }
}
