//! Prompt templates rendered against a context node.
//!
//! Templates use handlebars syntax. The data a template sees is
//! [`Content::template_data`]: every property reachable from the node
//! (`{{language}}`, `{{location.latitude}}`), the root value as `{{value}}`,
//! `{{role}}`, `{{name}}` and the previous turn as `{{predecessor.value}}`.
//! Output is not HTML-escaped.

use context_store::Content;
use handlebars::{no_escape, Handlebars, RenderError};

use crate::error::KernelError;

/// A parsed prompt template.
pub struct PromptTemplate {
    name: String,
    source: String,
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Parse a template. Syntax errors are reported here, not at render time.
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self, KernelError> {
        let name = name.into();
        let source = source.into();

        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry
            .register_template_string(&name, &source)
            .map_err(|err| KernelError::TemplateInvalid {
                name: name.clone(),
                source: Box::new(err),
            })?;

        Ok(Self {
            name,
            source,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template with the content as data.
    pub fn render(&self, content: &Content) -> Result<String, RenderError> {
        self.registry.render(&self.name, &content.template_data())
    }
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_store::Role;

    #[test]
    fn test_render_properties() {
        let template = PromptTemplate::parse(
            "joke",
            "WRITE EXACTLY ONE JOKE ABOUT THE TOPIC BELOW\n{{#if style}}{{style}}\n{{/if}}+++++\n{{value}}\n+++++",
        )
        .unwrap();

        let plain = template.render(&Content::from_value("dinosaurs")).unwrap();
        assert_eq!(plain, "WRITE EXACTLY ONE JOKE ABOUT THE TOPIC BELOW\n+++++\ndinosaurs\n+++++");

        let styled = template
            .render(&Content::from_value("dinosaurs").with("style", "as a short story"))
            .unwrap();
        assert!(styled.contains("as a short story\n+++++"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let template = PromptTemplate::parse("raw", "{{value}}").unwrap();
        let rendered = template.render(&Content::from_value("<b>\"quoted\" & more</b>")).unwrap();
        assert_eq!(rendered, "<b>\"quoted\" & more</b>");
    }

    #[test]
    fn test_render_nested_and_inherited() {
        let template = PromptTemplate::parse(
            "weather",
            "{{botName}} reports {{weather.description}} after: {{predecessor.value}}",
        )
        .unwrap();

        let first = Content::from_value("How is the weather?")
            .with_role(Role::User)
            .with("botName", "Ida");
        let content = Content::new()
            .with("weather.description", "light rain")
            .with_predecessor(first);

        assert_eq!(
            template.render(&content).unwrap(),
            "Ida reports light rain after: How is the weather?"
        );
    }

    #[test]
    fn test_missing_values_render_empty() {
        let template = PromptTemplate::parse("sparse", "[{{missing.path}}]").unwrap();
        assert_eq!(template.render(&Content::new()).unwrap(), "[]");
    }

    #[test]
    fn test_invalid_template() {
        let err = PromptTemplate::parse("broken", "{{#if value}}unclosed").unwrap_err();
        assert!(matches!(err, KernelError::TemplateInvalid { name, .. } if name == "broken"));
    }

    #[test]
    fn test_render_failure() {
        let template = PromptTemplate::parse("helper", "{{shout value}}").unwrap();
        assert!(template.render(&Content::from_value("hi")).is_err());
    }
}
