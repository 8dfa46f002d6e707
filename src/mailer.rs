use axum::async_trait;
use tracing::info;

/// Outbound mail seam. Delivery itself is out of scope; handlers only need
/// "send a verification link" and "send a reset link", fired in a background
/// task so no request waits on a mail server.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, username: &str, link: &str)
        -> anyhow::Result<()>;
    async fn send_password_reset(&self, email: &str, username: &str, link: &str)
        -> anyhow::Result<()>;
}

/// Default mailer: logs the link instead of delivering it. Enough for local
/// runs and tests; a real transport implements the same trait.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(
        &self,
        email: &str,
        username: &str,
        link: &str,
    ) -> anyhow::Result<()> {
        info!(%email, %username, %link, "verification mail");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        username: &str,
        link: &str,
    ) -> anyhow::Result<()> {
        info!(%email, %username, %link, "password reset mail");
        Ok(())
    }
}
