//! Prompt templates keyed by request kind.

use crate::RequestKind;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// System text and user prefix for one request kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct PromptTemplate {
    /// System message sent ahead of the user prompt
    system_text: String,
    /// Text prepended to the user's prompt
    user_prefix_text: String,
}

impl PromptTemplate {
    /// Create a template.
    pub fn new(system_text: impl Into<String>, user_prefix_text: impl Into<String>) -> Self {
        Self {
            system_text: system_text.into(),
            user_prefix_text: user_prefix_text.into(),
        }
    }
}

/// The `{system, user}` pair handed to the upstream client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message
    pub system: String,
    /// User message (prefix + prompt)
    pub user: String,
}

/// Static mapping from [`RequestKind`] to [`PromptTemplate`].
///
/// Built once at startup and never mutated while serving.
///
/// # Examples
///
/// ```
/// use tributary_core::{PromptLibrary, RequestKind};
///
/// let library = PromptLibrary::default();
/// let rendered = library.render(RequestKind::Headline, "Cold brew coffee kit").unwrap();
/// assert!(rendered.user.ends_with("Cold brew coffee kit"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<RequestKind, PromptTemplate>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let templates = RequestKind::iter()
            .map(|kind| (kind, builtin_template(kind)))
            .collect();
        Self { templates }
    }
}

impl PromptLibrary {
    /// Replace the template for one kind.
    pub fn with_template(mut self, kind: RequestKind, template: PromptTemplate) -> Self {
        self.templates.insert(kind, template);
        self
    }

    /// Look up the template for a kind.
    pub fn template(&self, kind: RequestKind) -> Option<&PromptTemplate> {
        self.templates.get(&kind)
    }

    /// Render the system and user messages for a prompt.
    pub fn render(&self, kind: RequestKind, prompt: &str) -> Option<RenderedPrompt> {
        self.template(kind).map(|template| RenderedPrompt {
            system: template.system_text.clone(),
            user: format!("{}{}", template.user_prefix_text, prompt),
        })
    }
}

const COPYWRITER: &str = "You are an expert direct-response copywriter who writes \
clear, persuasive, compliant marketing copy. Never invent testimonials, guarantees \
or statistics that the user did not provide.";

fn builtin_template(kind: RequestKind) -> PromptTemplate {
    let (task, prefix) = match kind {
        RequestKind::MainVsl => (
            "Write a complete video sales letter script with hook, story, offer and call to action.",
            "Write the main VSL script for this offer:\n\n",
        ),
        RequestKind::UpsellVsl => (
            "Write a short upsell video script that follows a completed purchase.",
            "Write the upsell VSL script for this offer:\n\n",
        ),
        RequestKind::DownsellVsl => (
            "Write a short downsell video script for buyers who declined the upsell.",
            "Write the downsell VSL script for this offer:\n\n",
        ),
        RequestKind::SalesPage => (
            "Write long-form sales page copy with headline, sub-headline, body sections and FAQ.",
            "Write the sales page for this offer:\n\n",
        ),
        RequestKind::Headline => (
            "Write ten distinct headline options, one per line.",
            "Write headlines for this offer:\n\n",
        ),
        RequestKind::EmailSequence => (
            "Write a five-email follow-up sequence with subject lines.",
            "Write the email sequence for this offer:\n\n",
        ),
        RequestKind::AdCopy => (
            "Write three paid social ad variations with primary text and headline.",
            "Write ad copy for this offer:\n\n",
        ),
        RequestKind::OrderBump => (
            "Write a one-paragraph checkout order bump offer.",
            "Write the order bump for this offer:\n\n",
        ),
        RequestKind::ThankYouPage => (
            "Write thank-you page copy that confirms the purchase and sets expectations.",
            "Write the thank-you page for this offer:\n\n",
        ),
    };
    PromptTemplate::new(format!("{COPYWRITER} {task}"), prefix)
}
