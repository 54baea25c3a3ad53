use tera::{Context, Tera};

const TEXT_PROMPT_TEMPLATE: &str = "\
{{ intro }}

{{ context_header }}
{{ transcript }}

{{ roles_note }}

{{ task }} {{ instruction }}";

const TRAILER_TEMPLATE: &str = "\n\n{{ roles_note }}\n\n{{ task }} {{ instruction }}";

const TEXT_PROMPT_NAME: &str = "text_prompt";
const TRAILER_NAME: &str = "trailer";

/// Tera-backed renderer for the fixed prompt frames. Localized pieces are
/// looked up per render so one instance serves any locale.
pub struct PromptTemplates {
    tera: Tera,
}

impl PromptTemplates {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEXT_PROMPT_NAME, TEXT_PROMPT_TEMPLATE)?;
        tera.add_raw_template(TRAILER_NAME, TRAILER_TEMPLATE)?;
        Ok(Self { tera })
    }

    fn frame(locale: &str, instruction: &str) -> Context {
        let mut ctx = Context::new();
        ctx.insert("roles_note", &t!("prompt.roles_note", locale = locale));
        ctx.insert("task", &t!("prompt.task", locale = locale));
        ctx.insert("instruction", instruction);
        ctx
    }

    /// Whole user prompt for the text-only path.
    pub fn render_text_prompt(
        &self,
        locale: &str,
        transcript: &str,
        instruction: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Self::frame(locale, instruction);
        ctx.insert("intro", &t!("prompt.intro", locale = locale));
        ctx.insert("context_header", &t!("prompt.context_header", locale = locale));
        ctx.insert("transcript", transcript);
        Ok(self.tera.render(TEXT_PROMPT_NAME, &ctx)?)
    }

    /// Closing part of a multimodal message.
    pub fn render_trailer(&self, locale: &str, instruction: &str) -> anyhow::Result<String> {
        let ctx = Self::frame(locale, instruction);
        Ok(self.tera.render(TRAILER_NAME, &ctx)?)
    }
}
