//! Static knowledge base used to ground explanations with citations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_CITATIONS: usize = 3;
pub const MIN_SCORE: f64 = 1.0;
const SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: &'static str,
    pub source: &'static str,
    pub content: &'static str,
    pub keywords: &'static [&'static str],
}

pub const ARTICLES: [Article; 4] = [
    Article {
        id: "kp_index",
        source: "NOAA Space Weather Prediction Center",
        content: "The Kp index is a geomagnetic activity index ranging from 0-9. \
                  It measures disturbances in Earth's magnetic field caused by solar activity. \
                  Values 0-4 are quiet, 5-6 are active/minor storm, 7-8 are moderate/strong storm, \
                  9 is severe storm. Higher Kp can affect GPS, radio, satellites, and cause auroras.",
        keywords: &["kp", "geomagnetic", "magnetic", "aurora", "storm"],
    },
    Article {
        id: "cme",
        source: "NASA Space Weather Guide",
        content: "A Coronal Mass Ejection (CME) is a massive burst of solar wind and magnetic fields \
                  rising above the solar corona or being released into space. CMEs can eject billions of \
                  tons of coronal material at speeds of 100-3000 km/s. Earth-directed CMEs can trigger \
                  geomagnetic storms, affecting satellites, communications, and power grids.",
        keywords: &["cme", "coronal", "mass ejection", "solar wind"],
    },
    Article {
        id: "solar_flare",
        source: "NASA Solar Dynamics Observatory",
        content: "Solar flares are intense bursts of radiation from the release of magnetic energy. \
                  They're classified by X-ray brightness: C (weak), M (medium), X (strong). \
                  Each class is 10x stronger than the previous. Flares can disrupt radio communications \
                  and navigation systems on the sunlit side of Earth.",
        keywords: &["flare", "solar flare", "x-class", "m-class", "x-ray", "radio blackout"],
    },
    Article {
        id: "leo",
        source: "ESA Space Environment Statistics",
        content: "Low Earth Orbit (LEO) is between 160-2000 km altitude. LEO satellites orbit Earth \
                  in ~90 minutes. Most human spaceflight occurs here (ISS at ~400km). LEO satellites \
                  experience more atmospheric drag and require periodic reboosts.",
        keywords: &["leo", "orbit", "altitude", "iss", "space station"],
    },
];

/// Relevance of an article to a query; higher is better.
pub trait Scorer: Send + Sync {
    fn score(&self, query: &str, article: &Article) -> f64;
}

/// Counts keyword substrings present in the lowercased query.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordScorer;

impl Scorer for KeywordScorer {
    fn score(&self, query: &str, article: &Article) -> f64 {
        let query = query.to_lowercase();
        article
            .keywords
            .iter()
            .filter(|keyword| query.contains(*keyword))
            .count() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Citation {
    pub source: String,
    pub snippet: String,
}

impl Citation {
    pub fn from_article(article: &Article) -> Self {
        let snippet = if article.content.chars().count() > SNIPPET_CHARS {
            let cut: String = article.content.chars().take(SNIPPET_CHARS).collect();
            format!("{}...", cut.trim_end())
        } else {
            article.content.to_string()
        };

        Self {
            source: article.source.to_string(),
            snippet,
        }
    }
}

pub struct KnowledgeBase {
    articles: Vec<Article>,
    scorer: Box<dyn Scorer>,
}

impl KnowledgeBase {
    pub fn new(articles: Vec<Article>, scorer: Box<dyn Scorer>) -> Self {
        Self { articles, scorer }
    }

    /// Articles scoring at least `MIN_SCORE`, best first, stable on ties.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Article> {
        let mut scored: Vec<(f64, &Article)> = self
            .articles
            .iter()
            .map(|article| (self.scorer.score(query, article), article))
            .filter(|(score, _)| *score >= MIN_SCORE)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, article)| article).collect()
    }

    pub fn best_match(&self, query: &str) -> Option<&Article> {
        self.search(query, 1).into_iter().next()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(ARTICLES.to_vec(), Box::new(KeywordScorer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthScorer;

    impl Scorer for LengthScorer {
        fn score(&self, _query: &str, article: &Article) -> f64 {
            article.content.len() as f64
        }
    }

    #[test]
    fn test_keyword_search_ranks_by_matches() {
        let kb = KnowledgeBase::default();
        let results = kb.search("How does a coronal mass ejection cause a geomagnetic storm?", 3);

        let ids: Vec<&str> = results.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["kp_index", "cme"]);
    }

    #[test]
    fn test_search_respects_limit_and_min_score() {
        let kb = KnowledgeBase::default();
        assert!(kb.search("what is a black hole", 3).is_empty());
        assert_eq!(kb.search("kp flare cme orbit", 3).len(), 3);
        assert!(kb.best_match("Explain the Kp index").is_some());
    }

    #[test]
    fn test_custom_scorer_is_used() {
        let kb = KnowledgeBase::new(ARTICLES.to_vec(), Box::new(LengthScorer));
        let results = kb.search("anything", 1);
        let longest = ARTICLES.iter().max_by_key(|a| a.content.len()).unwrap();
        assert_eq!(results[0].id, longest.id);
    }

    #[test]
    fn test_citation_snippet_is_truncated() {
        let citation = Citation::from_article(&ARTICLES[0]);
        assert_eq!(citation.source, "NOAA Space Weather Prediction Center");
        assert!(citation.snippet.ends_with("..."));
        assert!(citation.snippet.chars().count() <= SNIPPET_CHARS + 3);
    }
}
