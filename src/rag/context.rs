//! Context assembly from conversation history and retrieved posts

use crate::models::UserInteraction;

/// Assembler for building the augmented prompt sent to the language model.
///
/// Pure: the same query, history and retrieved contents always produce the
/// same prompt.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build the augmented prompt.
    ///
    /// Three sections in fixed order: the raw query, the user's recent
    /// interactions (newest first, as retrieved), and the retrieved post
    /// contents. Empty inputs render as empty blocks without reordering
    /// the remaining sections.
    #[must_use]
    pub fn assemble(
        &self,
        query: &str,
        recent_interactions: &[UserInteraction],
        retrieved_contents: &[String],
    ) -> String {
        let history = recent_interactions
            .iter()
            .map(|i| {
                format!(
                    "User asked: \"{}\", AI responded: \"{}\"",
                    i.query, i.response
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let retrieved = retrieved_contents.join("\n");

        format!(
            "User Query: {query}\n\nPrevious Interactions:\n{history}\n\nCommunity Discussions:\n{retrieved}"
        )
    }
}
