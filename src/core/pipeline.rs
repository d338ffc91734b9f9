use crate::core::enrichment::enrich_listing;
use crate::core::table_io::{delimiter_for, read_table, write_table};
use crate::core::{ConfigProvider, Pipeline, Storage, TextGenerator};
use crate::domain::model::{
    ListingInput, RunSummary, Table, TransformResult, OPTIMIZED_TITLE_COLUMN,
    SUGGESTED_KEYWORDS_COLUMN, TITLE_COLUMN,
};
use crate::utils::error::Result;
use std::path::Path;

pub const SUMMARY_FILENAME: &str = "run_summary.json";

/// Reads the listing table, enriches every row in order and writes the
/// enriched table back through `Storage`.
pub struct ListingPipeline<S: Storage, C: ConfigProvider, G: TextGenerator> {
    storage: S,
    config: C,
    generator: G,
}

impl<S: Storage, C: ConfigProvider, G: TextGenerator> ListingPipeline<S, C, G> {
    pub fn new(storage: S, config: C, generator: G) -> Self {
        Self {
            storage,
            config,
            generator,
        }
    }

    fn output_file(&self, filename: &str) -> String {
        Path::new(self.config.output_path())
            .join(filename)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, G: TextGenerator> Pipeline for ListingPipeline<S, C, G> {
    async fn extract(&self) -> Result<Table> {
        let input_path = self.config.input_path();
        tracing::info!("📤 Reading listings from: {}", input_path);

        let data = self.storage.read_file(input_path).await?;
        let table = read_table(&data, delimiter_for(input_path))?;

        if !table.has_column(TITLE_COLUMN) {
            tracing::warn!("No '{}' column found, titles will be empty", TITLE_COLUMN);
        }
        tracing::info!("✅ {} rows detected", table.len());
        Ok(table)
    }

    async fn transform(&self, table: Table) -> Result<TransformResult> {
        let auto_trim = self.config.auto_trim();
        let pacing = self.config.pacing();
        let settings = self.config.generation();
        let total = table.len();

        tracing::info!(
            "🚀 Optimizing {} titles (model: {}, auto-trim: {}, pacing: {:?})",
            total,
            settings.model,
            auto_trim,
            pacing.delay()
        );

        let mut summary = RunSummary::new(auto_trim);
        let mut results = Vec::with_capacity(total);

        for (index, record) in table.records.iter().enumerate() {
            let input = ListingInput::from_record(&table, record);
            let result = enrich_listing(&self.generator, &input, settings, auto_trim).await;

            tracing::info!(
                "[{}/{}] {} -> {}",
                index + 1,
                total,
                input.title,
                result.optimized_title
            );

            summary.record(&result);
            results.push(result);
            pacing.pause().await;
        }

        let mut table = table;
        let title_idx = table.ensure_column(OPTIMIZED_TITLE_COLUMN);
        let keywords_idx = table.ensure_column(SUGGESTED_KEYWORDS_COLUMN);
        let width = table.headers.len();

        for (record, result) in table.records.iter_mut().zip(&results) {
            if record.values.len() < width {
                record.values.resize(width, String::new());
            }
            record.values[title_idx] = result.optimized_title.clone();
            record.values[keywords_idx] = result.keywords_joined();
        }

        tracing::info!(
            "🎉 Optimization complete: {} structured, {} raw text, {} fallback",
            summary.structured_rows,
            summary.raw_text_rows,
            summary.fallback_rows
        );

        Ok(TransformResult {
            table,
            results,
            summary,
        })
    }

    async fn load(&self, result: &TransformResult) -> Result<String> {
        let filename = self.config.output_filename();
        let output_file = self.output_file(filename);

        // Output keeps the input's delimiter whatever the output file is called
        let data = write_table(&result.table, delimiter_for(self.config.input_path()))?;
        tracing::debug!("Writing {} bytes to {}", data.len(), output_file);
        self.storage.write_file(&output_file, &data).await?;

        if self.config.write_summary() {
            let summary_file = self.output_file(SUMMARY_FILENAME);
            let json = serde_json::to_string_pretty(&result.summary)?;
            self.storage.write_file(&summary_file, json.as_bytes()).await?;
            tracing::info!("🧾 Run summary saved to: {}", summary_file);
        }

        tracing::info!("📥 Optimized table saved to: {}", output_file);
        Ok(output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enrichment::heuristic_keywords;
    use crate::core::pacing::PacingPolicy;
    use crate::domain::model::{RowOutcome, TITLE_LIMIT};
    use crate::domain::ports::{GenerationRequest, GenerationSettings};
    use crate::utils::error::{EtlError, GenerationError};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, content: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), content.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|data| String::from_utf8_lossy(data).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        input_path: String,
        output_path: String,
        output_filename: String,
        auto_trim: bool,
        write_summary: bool,
        generation: GenerationSettings,
    }

    impl MockConfig {
        fn new(auto_trim: bool) -> Self {
            Self {
                input_path: "listings.csv".to_string(),
                output_path: "out".to_string(),
                output_filename: "optimized.csv".to_string(),
                auto_trim,
                write_summary: false,
                generation: GenerationSettings::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            &self.input_path
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_filename(&self) -> &str {
            &self.output_filename
        }

        fn auto_trim(&self) -> bool {
            self.auto_trim
        }

        fn pacing(&self) -> PacingPolicy {
            PacingPolicy::Disabled
        }

        fn generation(&self) -> &GenerationSettings {
            &self.generation
        }

        fn write_summary(&self) -> bool {
            self.write_summary
        }
    }

    /// Replays scripted responses in order; `None` simulates a failed call.
    struct ScriptedGenerator {
        responses: std::sync::Mutex<VecDeque<Option<String>>>,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Option<&str>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                prompts: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> std::result::Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            match self.responses.lock().unwrap().pop_front().flatten() {
                Some(text) => Ok(text),
                None => Err(GenerationError::EmptyContent),
            }
        }
    }

    const INPUT: &str = "\
Title,Brand,Category,SeedKeyword,Price
Old brass lamp,Acme,Home,vintage lamp,12
Watch,,,,99
Chair,Ikea,Furniture,office chair,40
";

    fn pipeline(
        responses: Vec<Option<&str>>,
        auto_trim: bool,
    ) -> ListingPipeline<MockStorage, MockConfig, Arc<ScriptedGenerator>> {
        ListingPipeline::new(
            MockStorage::with_file("listings.csv", INPUT),
            MockConfig::new(auto_trim),
            Arc::new(ScriptedGenerator::new(responses)),
        )
    }

    #[tokio::test]
    async fn test_extract_reads_all_rows() {
        let pipeline = pipeline(vec![], true);
        let table = pipeline.extract().await.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.headers,
            vec!["Title", "Brand", "Category", "SeedKeyword", "Price"]
        );
    }

    #[tokio::test]
    async fn test_extract_missing_input_fails() {
        let pipeline = ListingPipeline::new(
            MockStorage::with_file("other.csv", INPUT),
            MockConfig::new(true),
            Arc::new(ScriptedGenerator::new(vec![])),
        );
        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_rejects_row_wider_than_header() {
        let pipeline = ListingPipeline::new(
            MockStorage::with_file("listings.csv", "Title\nLamp,EXTRA_CELL\n"),
            MockConfig::new(true),
            Arc::new(ScriptedGenerator::new(vec![None])),
        );

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ValidationError { .. }));
        assert_ne!(err.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_transform_preserves_order_and_appends_columns() {
        let pipeline = pipeline(
            vec![
                Some(r#"{"optimized_title": "Vintage Brass Lamp", "keywords": ["brass lamp"]}"#),
                Some(r#"Sure! {"optimized_title": "Luxury Watch", "keywords": ["watch"]}"#),
                Some(r#"{"optimized_title": "Ergonomic Office Chair", "keywords": []}"#),
            ],
            true,
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();

        assert_eq!(result.results.len(), 3);
        assert_eq!(result.table.headers.len(), 7);
        assert_eq!(result.table.headers[5], "OptimizedTitle");
        assert_eq!(result.table.headers[6], "SuggestedKeywords");

        let titles: Vec<&str> = result
            .table
            .records
            .iter()
            .map(|r| r.values[5].as_str())
            .collect();
        assert_eq!(
            titles,
            vec!["Vintage Brass Lamp", "Luxury Watch", "Ergonomic Office Chair"]
        );

        // Untouched pass-through column
        assert_eq!(result.table.records[1].values[4], "99");
        assert_eq!(
            result.table.records[0].values[6],
            "brass lamp, vintage lamp sale, vintage lamp new, vintage lamp used, vintage lamp authentic"
        );
        // Blank SeedKeyword defaults to the title
        assert_eq!(
            result.table.records[1].values[6],
            "watch, Watch sale, Watch new, Watch used, Watch authentic"
        );
        assert_eq!(result.summary.structured_rows, 3);
    }

    #[tokio::test]
    async fn test_transform_prompts_follow_row_order() {
        let generator = Arc::new(ScriptedGenerator::new(vec![None, None, None]));
        let pipeline = ListingPipeline::new(
            MockStorage::with_file("listings.csv", INPUT),
            MockConfig::new(true),
            generator.clone(),
        );

        let table = pipeline.extract().await.unwrap();
        pipeline.transform(table).await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("Old brass lamp"));
        assert!(prompts[1].contains(r#"Title: "Watch""#));
        assert!(prompts[2].contains("Brand: Ikea"));
    }

    #[tokio::test]
    async fn test_failed_row_degrades_and_run_continues() {
        let pipeline = pipeline(
            vec![
                Some(r#"{"optimized_title": "Lamp", "keywords": []}"#),
                None,
                Some("{not json}"),
            ],
            true,
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();

        assert_eq!(result.results[1].optimized_title, "Watch");
        assert_eq!(result.results[1].suggested_keywords, heuristic_keywords("Watch"));
        assert_eq!(result.results[2].optimized_title, "Chair");
        assert_eq!(
            result.results[2].suggested_keywords,
            heuristic_keywords("office chair")
        );
        assert!(matches!(
            result.results[2].outcome,
            RowOutcome::Fallback { .. }
        ));
        assert_eq!(result.summary.fallback_rows, 2);
    }

    #[tokio::test]
    async fn test_too_long_titles_counted_with_and_without_trim() {
        let long = format!(r#"{{"optimized_title": "{}"}}"#, "Great Lamp ".repeat(10));
        let prose = "x".repeat(200);
        let responses = || vec![Some(long.as_str()), Some(prose.as_str()), None];

        let trimmed = pipeline(responses(), true);
        let table = trimmed.extract().await.unwrap();
        let result = trimmed.transform(table).await.unwrap();

        // Raw prose is cut to 80 before the policy, so only the JSON title counts
        assert_eq!(result.summary.too_long_count, 1);
        for record in &result.table.records {
            assert!(record.values[5].chars().count() <= TITLE_LIMIT);
        }
        assert!(result.results[0].optimized_title.ends_with("..."));

        let untrimmed = pipeline(responses(), false);
        let table = untrimmed.extract().await.unwrap();
        let result = untrimmed.transform(table).await.unwrap();

        assert_eq!(result.summary.too_long_count, 1);
        assert_eq!(
            result.results[0].optimized_title,
            "Great Lamp ".repeat(10)
        );
        assert_eq!(
            result.summary.length_message().unwrap(),
            "⚠️ 1 titles exceed 80 chars."
        );
    }

    #[tokio::test]
    async fn test_existing_output_columns_are_overwritten() {
        let input = "Title,OptimizedTitle\nLamp,stale\n";
        let pipeline = ListingPipeline::new(
            MockStorage::with_file("listings.csv", input),
            MockConfig::new(true),
            Arc::new(ScriptedGenerator::new(vec![Some(
                r#"{"optimized_title": "Fresh Lamp"}"#,
            )])),
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();

        assert_eq!(
            result.table.headers,
            vec!["Title", "OptimizedTitle", "SuggestedKeywords"]
        );
        assert_eq!(result.table.records[0].values[1], "Fresh Lamp");
    }

    #[tokio::test]
    async fn test_load_writes_table_and_summary() {
        let storage = MockStorage::with_file("listings.csv", "Title\nLamp\n");
        let mut config = MockConfig::new(true);
        config.write_summary = true;
        let pipeline = ListingPipeline::new(
            storage.clone(),
            config,
            Arc::new(ScriptedGenerator::new(vec![Some(
                r#"{"optimized_title": "Brass Lamp", "keywords": ["lamp"]}"#,
            )])),
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();

        let expected_path = Path::new("out").join("optimized.csv");
        assert_eq!(output_path, expected_path.to_string_lossy());

        let csv = storage.get_file(&output_path).await.unwrap();
        assert_eq!(
            csv,
            "Title,OptimizedTitle,SuggestedKeywords\n\
             Lamp,Brass Lamp,\"lamp, Lamp sale, Lamp new, Lamp used, Lamp authentic\"\n"
        );

        let summary_path = Path::new("out").join(SUMMARY_FILENAME);
        let summary = storage
            .get_file(&summary_path.to_string_lossy())
            .await
            .unwrap();
        let summary: RunSummary = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.too_long_count, 0);
    }

    #[tokio::test]
    async fn test_load_keeps_input_delimiter_for_csv_filename() {
        let storage = MockStorage::with_file("in.tsv", "Title\tBrand\nLamp\tAcme\n");
        let mut config = MockConfig::new(true);
        config.input_path = "in.tsv".to_string();
        let pipeline = ListingPipeline::new(
            storage.clone(),
            config,
            Arc::new(ScriptedGenerator::new(vec![Some(
                r#"{"optimized_title": "Brass Lamp", "keywords": ["lamp"]}"#,
            )])),
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();

        assert!(output_path.ends_with("optimized.csv"));
        assert_eq!(
            storage.get_file(&output_path).await.unwrap(),
            "Title\tBrand\tOptimizedTitle\tSuggestedKeywords\n\
             Lamp\tAcme\tBrass Lamp\tlamp, Lamp sale, Lamp new, Lamp used, Lamp authentic\n"
        );
    }

    #[tokio::test]
    async fn test_empty_table_produces_header_only_output() {
        let storage = MockStorage::with_file("listings.csv", "Title,Brand\n");
        let pipeline = ListingPipeline::new(
            storage.clone(),
            MockConfig::new(true),
            Arc::new(ScriptedGenerator::new(vec![])),
        );

        let table = pipeline.extract().await.unwrap();
        let result = pipeline.transform(table).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();

        assert_eq!(result.summary.total_rows, 0);
        assert_eq!(
            storage.get_file(&output_path).await.unwrap(),
            "Title,Brand,OptimizedTitle,SuggestedKeywords\n"
        );
    }
}
