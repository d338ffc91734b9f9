use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum optimized title length, in characters.
pub const TITLE_LIMIT: usize = 80;

pub const TITLE_COLUMN: &str = "Title";
pub const BRAND_COLUMN: &str = "Brand";
pub const CATEGORY_COLUMN: &str = "Category";
pub const SEED_KEYWORD_COLUMN: &str = "SeedKeyword";
pub const OPTIMIZED_TITLE_COLUMN: &str = "OptimizedTitle";
pub const SUGGESTED_KEYWORDS_COLUMN: &str = "SuggestedKeywords";

/// One row of the listing table, cells in header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<String>,
}

impl Record {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// The uploaded table: a header row plus records, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value, `None` when the column is absent or the row is short.
    pub fn cell<'a>(&self, record: &'a Record, name: &str) -> Option<&'a str> {
        self.column_index(name)
            .and_then(|idx| record.values.get(idx))
            .map(String::as_str)
    }

    /// Index of `name`, appending it as a new trailing column if missing.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        }
    }
}

/// The fields of a record the enrichment pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingInput {
    pub title: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub seed_keyword: String,
}

impl ListingInput {
    pub fn from_record(table: &Table, record: &Record) -> Self {
        let title = table
            .cell(record, TITLE_COLUMN)
            .unwrap_or_default()
            .to_string();
        let optional = |name: &str| {
            table
                .cell(record, name)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };

        let seed_keyword = optional(SEED_KEYWORD_COLUMN).unwrap_or_else(|| title.clone());

        Self {
            brand: optional(BRAND_COLUMN),
            category: optional(CATEGORY_COLUMN),
            title,
            seed_keyword,
        }
    }
}

/// What the model proposed for a row, before the length policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSuggestion {
    pub optimized_title: String,
    pub keywords: Vec<String>,
}

/// How a row's model suggestion was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A JSON object was found and parsed.
    Structured,
    /// No JSON object in the response; the raw text became the title.
    RawText,
    /// The call or the parse failed; original title kept.
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub optimized_title: String,
    pub suggested_keywords: Vec<String>,
    /// The title exceeded the limit before trimming.
    pub too_long: bool,
    pub outcome: RowOutcome,
}

impl EnrichmentResult {
    pub fn keywords_joined(&self) -> String {
        self.suggested_keywords.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub too_long_count: usize,
    pub auto_trim: bool,
    pub structured_rows: usize,
    pub raw_text_rows: usize,
    pub fallback_rows: usize,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(auto_trim: bool) -> Self {
        Self {
            total_rows: 0,
            too_long_count: 0,
            auto_trim,
            structured_rows: 0,
            raw_text_rows: 0,
            fallback_rows: 0,
            generated_at: Utc::now(),
        }
    }

    pub fn record(&mut self, result: &EnrichmentResult) {
        self.total_rows += 1;
        if result.too_long {
            self.too_long_count += 1;
        }
        match result.outcome {
            RowOutcome::Structured => self.structured_rows += 1,
            RowOutcome::RawText => self.raw_text_rows += 1,
            RowOutcome::Fallback { .. } => self.fallback_rows += 1,
        }
    }

    /// The end-of-run length warning, if any title was too long.
    pub fn length_message(&self) -> Option<String> {
        if self.too_long_count == 0 {
            return None;
        }
        Some(if self.auto_trim {
            format!("✂️ {} titles trimmed.", self.too_long_count)
        } else {
            format!("⚠️ {} titles exceed {} chars.", self.too_long_count, TITLE_LIMIT)
        })
    }
}

/// Output of the transform phase: the enriched table plus per-row results.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: Table,
    pub results: Vec<EnrichmentResult>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), vec![])
    }

    #[test]
    fn test_listing_input_defaults() {
        let t = table(&["Title", "Price"]);
        let record = Record::new(["Brass Desk Lamp", "12.00"]);
        let input = ListingInput::from_record(&t, &record);

        assert_eq!(input.title, "Brass Desk Lamp");
        assert_eq!(input.brand, None);
        assert_eq!(input.category, None);
        assert_eq!(input.seed_keyword, "Brass Desk Lamp");
    }

    #[test]
    fn test_listing_input_missing_title_is_empty() {
        let t = table(&["Brand"]);
        let input = ListingInput::from_record(&t, &Record::new(["Acme"]));
        assert_eq!(input.title, "");
        assert_eq!(input.brand.as_deref(), Some("Acme"));
        assert_eq!(input.seed_keyword, "");
    }

    #[test]
    fn test_blank_seed_keyword_falls_back_to_title() {
        let t = table(&["Title", "SeedKeyword"]);
        let input = ListingInput::from_record(&t, &Record::new(["Lamp", "  "]));
        assert_eq!(input.seed_keyword, "Lamp");

        let input = ListingInput::from_record(&t, &Record::new(["Lamp", "vintage lamp"]));
        assert_eq!(input.seed_keyword, "vintage lamp");
    }

    #[test]
    fn test_short_row_reads_as_absent() {
        let t = table(&["Title", "Brand", "Category"]);
        let input = ListingInput::from_record(&t, &Record::new(["Lamp"]));
        assert_eq!(input.category, None);
    }

    #[test]
    fn test_ensure_column_reuses_existing() {
        let mut t = table(&["Title", "OptimizedTitle"]);
        assert_eq!(t.ensure_column(OPTIMIZED_TITLE_COLUMN), 1);
        assert_eq!(t.ensure_column(SUGGESTED_KEYWORDS_COLUMN), 2);
        assert_eq!(t.headers.len(), 3);
    }

    #[test]
    fn test_length_message() {
        let mut summary = RunSummary::new(true);
        assert_eq!(summary.length_message(), None);

        summary.too_long_count = 2;
        assert_eq!(summary.length_message().unwrap(), "✂️ 2 titles trimmed.");

        summary.auto_trim = false;
        assert_eq!(
            summary.length_message().unwrap(),
            "⚠️ 2 titles exceed 80 chars."
        );
    }
}
