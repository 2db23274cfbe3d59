// ABOUTME: Operator confirmation before a deploy touches anything.
// ABOUTME: Terminal prompts go through dialoguer; `--yes` swaps in `AssumeYes`.

/// Asks a yes/no question. A decline cancels the deploy.
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Answers yes without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> bool {
        tracing::debug!("{} (assumed yes)", question);
        true
    }
}

/// Prompts on the terminal, defaulting to no.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        // No terminal means nobody said yes.
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
