use super::llm::{AiError, LanguageModel};
use async_trait::async_trait;

/// Canned model for demo mode. Echoes any live context it is given so the
/// demo still reflects the fixture data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureModel;

#[async_trait]
impl LanguageModel for FixtureModel {
    async fn complete(&self, _system: &str, user: &str, _max_tokens: u32) -> Result<String, AiError> {
        let (context, question) = match user.strip_prefix("Live context:\n") {
            Some(rest) => match rest.split_once("\n\n") {
                Some((context, question)) => (Some(context), question),
                None => (None, rest),
            },
            None => (None, user),
        };
        let question = question.lines().next().unwrap_or_default().trim();

        let mut reply = format!("(demo) Here's a quick take on \"{}\".", question);
        if let Some(context) = context {
            reply.push_str(" Right now: ");
            reply.push_str(&context.lines().collect::<Vec<_>>().join(" "));
        }
        reply.push_str(
            " Space weather is driven by the Sun; the Kp index tracks how much Earth's \
             magnetic field is being disturbed, and satellites like the ISS are easiest \
             to spot shortly after sunset.",
        );
        Ok(reply)
    }
}
