pub mod fixture;
pub mod knowledge;
pub mod llm;

use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use knowledge::{Citation, KnowledgeBase, MAX_CITATIONS};
use llm::{AiError, LanguageModel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

const QUERY_MAX_TOKENS: u32 = 1000;
const EXPLAIN_MAX_TOKENS: u32 = 1500;
const NARRATIVE_MAX_TOKENS: u32 = 300;

const BASE_PROMPT: &str = "You are a space weather and satellite tracking expert. \
    You explain space phenomena clearly and accurately. \
    When live context is provided, incorporate it naturally into your response. ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationMode {
    #[default]
    Quick,
    Eli10,
    Stem,
    Scifi,
}

impl ExplanationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationMode::Quick => "quick",
            ExplanationMode::Eli10 => "eli10",
            ExplanationMode::Stem => "stem",
            ExplanationMode::Scifi => "scifi",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            ExplanationMode::Quick => {
                "Provide a concise, practical explanation in 5-8 lines. \
                 Focus on what matters to regular people."
            }
            ExplanationMode::Eli10 => {
                "Explain using simple language and metaphors a 10-year-old would understand. \
                 Be engaging and fun but accurate."
            }
            ExplanationMode::Stem => {
                "Provide a technical explanation with correct terminology. \
                 Include relevant numbers, formulas, and physics. Suitable for students/professionals."
            }
            ExplanationMode::Scifi => {
                "Explain with narrative flair and vivid imagery, like a science fiction story. \
                 Keep it accurate but make it exciting and immersive."
            }
        }
    }

    pub fn system_prompt(&self) -> String {
        format!("{}{}", BASE_PROMPT, self.instructions())
    }
}

impl fmt::Display for ExplanationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplanationMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(ExplanationMode::Quick),
            "eli10" => Ok(ExplanationMode::Eli10),
            "stem" => Ok(ExplanationMode::Stem),
            "scifi" => Ok(ExplanationMode::Scifi),
            other => Err(ServiceError::InvalidArgument(format!(
                "unknown explanation mode '{}', expected one of quick, eli10, stem, scifi",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AgentResponse {
    pub id: Uuid,
    pub query: String,
    pub mode: ExplanationMode,
    pub response: String,
    pub citations: Vec<Citation>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    /// True when the LLM was unavailable and fallback text was used.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExplanationResponse {
    pub query: String,
    pub mode: ExplanationMode,
    pub explanation: String,
    pub citations: Vec<Citation>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub degraded: bool,
}

pub struct AgentService {
    model: Arc<dyn LanguageModel>,
    knowledge: KnowledgeBase,
    timeout: Duration,
}

impl AgentService {
    pub fn new(model: Arc<dyn LanguageModel>, knowledge: KnowledgeBase, timeout: Duration) -> Self {
        Self {
            model,
            knowledge,
            timeout,
        }
    }

    pub async fn query(
        &self,
        text: &str,
        live_context: &[String],
        mode: ExplanationMode,
    ) -> ServiceResult<AgentResponse> {
        let text = non_empty(text)?;
        let user_message = if live_context.is_empty() {
            text.to_string()
        } else {
            format!("Live context:\n{}\n\n{}", live_context.join("\n"), text)
        };

        let response = self
            .complete(&mode.system_prompt(), &user_message, QUERY_MAX_TOKENS)
            .await?;

        Ok(AgentResponse {
            id: Uuid::new_v4(),
            query: text.to_string(),
            mode,
            response,
            citations: Vec::new(),
            confidence: if live_context.is_empty() { 0.75 } else { 0.85 },
            timestamp: Utc::now(),
            degraded: false,
        })
    }

    pub async fn explain(
        &self,
        text: &str,
        mode: ExplanationMode,
        include_citations: bool,
    ) -> ServiceResult<ExplanationResponse> {
        let text = non_empty(text)?;
        let articles = if include_citations {
            self.knowledge.search(text, MAX_CITATIONS)
        } else {
            Vec::new()
        };

        let mut user_message = text.to_string();
        if !articles.is_empty() {
            user_message.push_str("\n\nRelevant knowledge:\n");
            for article in &articles {
                user_message.push_str(&format!("- {}\n  Source: {}\n", article.content, article.source));
            }
        }

        let explanation = self
            .complete(&mode.system_prompt(), &user_message, EXPLAIN_MAX_TOKENS)
            .await?;
        let citations: Vec<Citation> = articles.into_iter().map(Citation::from_article).collect();

        Ok(ExplanationResponse {
            query: text.to_string(),
            mode,
            explanation,
            confidence: if citations.is_empty() { 0.6 } else { 0.9 },
            citations,
            timestamp: Utc::now(),
            degraded: false,
        })
    }

    /// Short plain-language narrative for the daily briefing.
    pub async fn narrate(&self, facts: &[String]) -> ServiceResult<String> {
        let user_message = format!(
            "Write a friendly two-sentence space briefing for today from these facts:\n{}",
            facts.join("\n")
        );
        self.complete(
            &ExplanationMode::Quick.system_prompt(),
            &user_message,
            NARRATIVE_MAX_TOKENS,
        )
        .await
    }

    pub fn fallback_response(
        &self,
        text: &str,
        live_context: &[String],
        mode: ExplanationMode,
    ) -> AgentResponse {
        let response = if live_context.is_empty() {
            "I'm currently unable to provide a detailed response. Please check the space weather \
             and satellite tracking dashboards for current information."
                .to_string()
        } else {
            format!(
                "Based on current conditions:\n{}\n\nRegarding your question about '{}': I'd need more \
                 specific data to give you a detailed answer. Please check the space weather dashboard \
                 for real-time information.",
                live_context.join("\n"),
                text
            )
        };

        AgentResponse {
            id: Uuid::new_v4(),
            query: text.to_string(),
            mode,
            response,
            citations: Vec::new(),
            confidence: 0.3,
            timestamp: Utc::now(),
            degraded: true,
        }
    }

    pub fn fallback_explanation(
        &self,
        text: &str,
        mode: ExplanationMode,
        include_citations: bool,
    ) -> ExplanationResponse {
        let best = self.knowledge.best_match(text);
        let explanation = match best {
            Some(article) => article.content.to_string(),
            None => "I don't have detailed information about this topic in my knowledge base. \
                     Please refer to NASA, NOAA, or ESA resources for authoritative information."
                .to_string(),
        };
        let citations = match best {
            Some(article) if include_citations => vec![Citation::from_article(article)],
            _ => Vec::new(),
        };

        ExplanationResponse {
            query: text.to_string(),
            mode,
            explanation,
            citations,
            confidence: if best.is_some() { 0.5 } else { 0.2 },
            timestamp: Utc::now(),
            degraded: true,
        }
    }

    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> ServiceResult<String> {
        let result = match tokio::time::timeout(self.timeout, self.model.complete(system, user, max_tokens)).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(self.timeout)),
        };

        result.map_err(|e| {
            tracing::warn!(error = %e, "LLM call failed");
            ServiceError::from(e)
        })
    }
}

fn non_empty(text: &str) -> ServiceResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidArgument("query must not be empty".to_string()));
    }
    Ok(trimmed)
}
