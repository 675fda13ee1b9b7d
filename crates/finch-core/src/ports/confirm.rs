//! Confirmation port - destructive actions ask before proceeding.

use async_trait::async_trait;

/// Asks the user a yes/no question.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed-answer confirmer for non-interactive callers.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
