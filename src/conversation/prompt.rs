//! Prompt templates
//!
//! Templates use `{name}` placeholders; literal braces are written doubled
//! (`{{` and `}}`). User-controlled text (the system context, every question)
//! is passed through [`escape`] so a brace typed by the user can never be
//! read as a placeholder.

use crate::provider::{ChatMessage, Role};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template placeholder '{0}'")]
    UnknownPlaceholder(String),

    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),

    #[error("unmatched '}}' at byte {0}")]
    UnmatchedBrace(usize),
}

/// Neutralise template control characters
///
/// ```
/// use vaultmind::conversation::prompt::escape;
///
/// assert_eq!(escape("fn main() {}"), "fn main() {{}}");
/// ```
pub fn escape(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Template whose rendering is exactly `text`
    pub fn literal(text: &str) -> Self {
        Self::new(escape(text))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute placeholders and collapse doubled braces
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        let src = &self.source;
        let mut out = String::with_capacity(src.len());
        let mut rest = src.char_indices().peekable();

        while let Some((pos, c)) = rest.next() {
            match c {
                '{' if matches!(rest.peek(), Some((_, '{'))) => {
                    rest.next();
                    out.push('{');
                }
                '{' => {
                    let start = pos + 1;
                    let end = src[start..]
                        .find('}')
                        .map(|i| start + i)
                        .ok_or(TemplateError::Unclosed(pos))?;
                    let name = src[start..end].trim();
                    let value = vars
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
                    out.push_str(value);
                    while rest.peek().is_some_and(|(i, _)| *i <= end) {
                        rest.next();
                    }
                }
                '}' if matches!(rest.peek(), Some((_, '}'))) => {
                    rest.next();
                    out.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedBrace(pos)),
                c => out.push(c),
            }
        }
        Ok(out)
    }
}

/// Build the message list for one question
///
/// Layout is `[system, history..., user]`; the system message is left out
/// when the context renders empty.
pub fn build_messages(
    system: &PromptTemplate,
    history: Vec<ChatMessage>,
    question: &PromptTemplate,
) -> Result<Vec<ChatMessage>, TemplateError> {
    let system = system.render(&[])?;
    let question = question.render(&[])?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system.trim().is_empty() {
        messages.push(ChatMessage::new(Role::System, system));
    }
    messages.extend(history);
    messages.push(ChatMessage::new(Role::User, question));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_round_trips_braces() {
        let text = "match x { Some(v) => v, None => {} } and }{ too";
        assert_eq!(PromptTemplate::literal(text).render(&[]).unwrap(), text);
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let template = PromptTemplate::new("Note: {title}\n\n{ body }");
        let rendered = template
            .render(&[("title", "Groceries"), ("body", "eggs {2}")])
            .unwrap();
        // Substituted values are not re-scanned
        assert_eq!(rendered, "Note: Groceries\n\neggs {2}");
    }

    #[test]
    fn test_escaped_user_text_cannot_inject_placeholders() {
        let question = "what is {secret}?";
        let rendered = PromptTemplate::literal(question)
            .render(&[("secret", "leaked")])
            .unwrap();
        assert_eq!(rendered, question);
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(
            PromptTemplate::new("hi {name}").render(&[]),
            Err(TemplateError::UnknownPlaceholder("name".to_string()))
        );
        assert_eq!(
            PromptTemplate::new("hi {name").render(&[]),
            Err(TemplateError::Unclosed(3))
        );
        assert_eq!(
            PromptTemplate::new("a } b").render(&[]),
            Err(TemplateError::UnmatchedBrace(2))
        );
    }

    #[test]
    fn test_build_messages_layout() {
        let history = vec![
            ChatMessage::new(Role::User, "earlier"),
            ChatMessage::new(Role::Assistant, "reply"),
        ];
        let messages = build_messages(
            &PromptTemplate::literal("Be brief {always}"),
            history,
            &PromptTemplate::literal("now?"),
        )
        .unwrap();

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[0].content, "Be brief {always}");
        assert_eq!(messages[3].content, "now?");
    }

    #[test]
    fn test_empty_context_has_no_system_message() {
        let messages = build_messages(
            &PromptTemplate::literal(""),
            Vec::new(),
            &PromptTemplate::literal("q"),
        )
        .unwrap();
        assert_eq!(messages, vec![ChatMessage::new(Role::User, "q")]);
    }
}
