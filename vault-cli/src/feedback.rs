//! Terminal feedback for sync stories.

use vault_core::Feedback;

/// Prints toasts and messages to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFeedback;

impl Feedback for ConsoleFeedback {
    fn show_toast(&self, text: &str) {
        println!("{}", text);
    }

    fn show_message(&self, text: &str) {
        println!();
        println!("  {}", text);
        println!();
    }

    fn background_toast(&self, text: &str) {
        tracing::info!(%text, "background feedback");
    }
}
