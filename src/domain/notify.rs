use {
    super::{error::PipelineError, receipt::NewReceipt},
    std::{future::Future, pin::Pin},
};

/// Outbound payment alert. Best-effort by contract: callers log failures and
/// keep going — a down notification channel never unwinds committed work.
pub trait Notifier: Send + Sync {
    fn notify_payment(
        &self,
        receipt: &NewReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send + '_>>;
}

/// Used when no notification channel is configured, and in tests.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify_payment(
        &self,
        _receipt: &NewReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
