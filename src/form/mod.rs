//! Input state behind the tip form: amount and message.

pub mod amount;
pub mod message;

pub use amount::{default_presets, AmountSelector, PresetAmount};
pub use message::MessageEditor;

/// Everything the user has typed or picked for the next tip.
#[derive(Debug, Clone, Default)]
pub struct TipForm {
    pub amount: AmountSelector,
    pub message: MessageEditor,
}

impl TipForm {
    pub fn new(amount: AmountSelector) -> Self {
        Self {
            amount,
            message: MessageEditor::default(),
        }
    }

    pub fn clear(&mut self) {
        self.amount.reset();
        self.message.clear();
    }
}
