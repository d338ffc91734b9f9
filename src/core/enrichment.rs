//! Per-row enrichment: prompt construction, response parsing with fallback,
//! the title length policy and heuristic keyword synthesis.

use crate::domain::model::{EnrichmentResult, ListingInput, ModelSuggestion, RowOutcome, TITLE_LIMIT};
use crate::domain::ports::{GenerationRequest, GenerationSettings, TextGenerator};
use crate::utils::error::EnrichmentFailure;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const SYSTEM_PROMPT: &str = "You are a skilled eBay SEO optimizer.";

pub const HEURISTIC_SUFFIXES: [&str; 4] = [" sale", " new", " used", " authentic"];

const ELLIPSIS: &str = "...";

// First `{` through last `}`, across newlines.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

pub fn build_prompt(input: &ListingInput) -> String {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"You are an expert eBay SEO copywriter.
1. Rewrite this title (≤ {limit} chars) for clarity and SEO.
2. Suggest 4–6 strong related keywords.

Product info:
Title: "{title}"
Brand: {brand}
Category: {category}
Seed keyword: {seed}

Respond in JSON:
{{
  "optimized_title": "string",
  "keywords": ["kw1","kw2","kw3"]
}}"#,
        limit = TITLE_LIMIT,
        title = input.title,
        brand = or_na(&input.brand),
        category = or_na(&input.category),
        seed = input.seed_keyword,
    )
}

pub fn build_request(input: &ListingInput, settings: &GenerationSettings) -> GenerationRequest {
    GenerationRequest {
        model: settings.model.clone(),
        system: SYSTEM_PROMPT.to_string(),
        prompt: build_prompt(input),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    }
}

/// The brace-delimited span of `text`, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

fn first_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

/// Interpret raw model output for a listing whose original title is
/// `original_title`.
pub fn parse_response(
    raw: &str,
    original_title: &str,
) -> Result<(ModelSuggestion, RowOutcome), EnrichmentFailure> {
    let content = raw.trim();

    let Some(json_text) = extract_json_object(content) else {
        return Ok((
            ModelSuggestion {
                optimized_title: first_chars(content, TITLE_LIMIT),
                keywords: Vec::new(),
            },
            RowOutcome::RawText,
        ));
    };

    let value: Value = serde_json::from_str(json_text)?;

    let optimized_title = value
        .get("optimized_title")
        .and_then(Value::as_str)
        .unwrap_or(original_title)
        .to_string();

    let keywords = value
        .get("keywords")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default();

    Ok((
        ModelSuggestion {
            optimized_title,
            keywords,
        },
        RowOutcome::Structured,
    ))
}

pub async fn request_suggestion<G: TextGenerator + ?Sized>(
    generator: &G,
    input: &ListingInput,
    settings: &GenerationSettings,
) -> Result<(ModelSuggestion, RowOutcome), EnrichmentFailure> {
    let request = build_request(input, settings);
    let raw = generator.generate(&request).await?;
    tracing::debug!("Model response: {}", raw);
    parse_response(&raw, &input.title)
}

/// `title` cut to 77 characters, trailing whitespace removed, plus `...`.
pub fn trim_title(title: &str) -> String {
    let keep = TITLE_LIMIT - ELLIPSIS.len();
    let head = first_chars(title, keep);
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Returns the policy-enforced title and whether it was over the limit.
pub fn apply_length_policy(title: String, auto_trim: bool) -> (String, bool) {
    if title.chars().count() <= TITLE_LIMIT {
        return (title, false);
    }
    if auto_trim {
        (trim_title(&title), true)
    } else {
        (title, true)
    }
}

pub fn heuristic_keywords(seed: &str) -> Vec<String> {
    HEURISTIC_SUFFIXES
        .iter()
        .map(|suffix| format!("{}{}", seed, suffix))
        .collect()
}

/// Run one listing through generation, fallback, length policy and keyword
/// merging. Never fails: errors degrade to the original title.
pub async fn enrich_listing<G: TextGenerator + ?Sized>(
    generator: &G,
    input: &ListingInput,
    settings: &GenerationSettings,
    auto_trim: bool,
) -> EnrichmentResult {
    let (suggestion, outcome) = match request_suggestion(generator, input, settings).await {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("⚠️ Keeping original title for '{}': {}", input.title, e);
            (
                ModelSuggestion {
                    optimized_title: input.title.clone(),
                    keywords: Vec::new(),
                },
                RowOutcome::Fallback {
                    reason: e.to_string(),
                },
            )
        }
    };

    let (optimized_title, too_long) = apply_length_policy(suggestion.optimized_title, auto_trim);
    if too_long {
        tracing::debug!(
            "Title over {} chars (auto-trim: {}): {}",
            TITLE_LIMIT,
            auto_trim,
            optimized_title
        );
    }

    let mut suggested_keywords = suggestion.keywords;
    suggested_keywords.extend(heuristic_keywords(&input.seed_keyword));

    EnrichmentResult {
        optimized_title,
        suggested_keywords,
        too_long,
        outcome,
    }
}
