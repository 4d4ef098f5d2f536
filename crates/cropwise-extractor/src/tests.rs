//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        ExtractionAdapter, Extractor, ExtractorConfig, ExtractorError, Orchestrator,
        ProviderAdapter, ProviderStrategy,
    };
    use cropwise_domain::{ErrorKind, ExtractionRunId};
    use cropwise_llm::{LlmError, MockProvider};

    fn extractor(providers: &[&MockProvider], config: ExtractorConfig) -> Extractor {
        let pool: Vec<Box<dyn ProviderAdapter>> = providers
            .iter()
            .map(|p| Box::new(ExtractionAdapter::new((*p).clone())) as Box<dyn ProviderAdapter>)
            .collect();
        Extractor::new(Orchestrator::new(pool, config.strategy), config).unwrap()
    }

    fn small_chunks() -> ExtractorConfig {
        ExtractorConfig {
            max_chunk_tokens: 10,
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_config_strategy_and_token_cap_are_applied() {
        let claude = MockProvider::new(r#"{"crops": [{"name": "Rice"}]}"#).with_name("claude");
        let ollama = MockProvider::new(r#"{"crops": [{"name": "Rice"}]}"#).with_name("ollama");
        let pool: Vec<Box<dyn ProviderAdapter>> = vec![
            Box::new(ExtractionAdapter::new(claude.clone())),
            Box::new(ExtractionAdapter::new(ollama.clone())),
        ];
        let config = ExtractorConfig {
            strategy: ProviderStrategy::CostPriority,
            max_output_tokens: 7,
            ..small_chunks()
        };
        let mut extractor =
            Extractor::new(Orchestrator::new(pool, ProviderStrategy::Failover), config).unwrap();
        assert_eq!(extractor.status().strategy, ProviderStrategy::CostPriority);

        let extraction = extractor.extract_document("rice.txt", "Rice grows in paddies.").unwrap();
        assert!(extraction.result.success);
        assert_eq!(extraction.result.provider, "ollama");
        assert_eq!(ollama.last_max_tokens(), Some(7));
        assert_eq!(claude.call_count(), 0);
    }

    #[test]
    fn test_full_extraction_flow() {
        let mut llm = MockProvider::new(r#"{"crops": []}"#);
        llm.add_response(
            "Rice grows",
            r#"{"crops": [{"name": "Rice", "soil_requirements": {"ph_range": "6-7"}}]}"#,
        );
        llm.add_response(
            "Paddy rice",
            r#"{"crops": [{"name": "rice", "aliases": ["paddy"], "soil_requirements": {"ph_range": "5.5-6.5", "drainage": "poor"}}]}"#,
        );

        let mut extractor = extractor(&[&llm], small_chunks());
        let text = "Rice grows best at pH 6 to 7.\n\nPaddy rice tolerates poor drainage.";
        let extraction = extractor.extract_document("rice-guide.pdf", text).unwrap();

        assert_eq!(extraction.total_chunks, 2);
        assert!(extraction.result.success);
        assert_eq!(extraction.result.provider, "mock");
        assert_eq!(extraction.result.total_chunks_processed, 2);

        let entities = extraction.entities();
        assert_eq!(entities.len(), 1);
        let rice = &entities[0];
        assert_eq!(rice.key(), "rice");
        assert_eq!(rice.soil_requirements.ph_range.as_deref(), Some("6-7"));
        assert_eq!(rice.soil_requirements.drainage.as_deref(), Some("poor"));
        assert_eq!(rice.aliases, vec!["paddy"]);
        assert_eq!(rice.provenance.chunk_ids, vec![0, 1]);
        assert_eq!(rice.provenance.source_documents, vec!["rice-guide.pdf"]);
        assert_eq!(rice.provenance.extraction_runs, vec![extraction.run_id.clone()]);
        assert!(ExtractionRunId::from_string(&extraction.run_id).is_ok());
    }

    #[test]
    fn test_failover_between_documents() {
        let p1 = MockProvider::failing(LlmError::RateLimitExceeded("overloaded".into()))
            .with_name("claude");
        let p2 = MockProvider::new(r#"{"crops": [{"name": "Sorghum"}]}"#).with_name("gemini");
        let mut extractor = extractor(&[&p1, &p2], ExtractorConfig::default());

        let first = extractor
            .extract_document("a.txt", "Sorghum tolerates drought.")
            .unwrap();
        assert!(first.result.success);
        assert_eq!(first.result.provider, "gemini");

        let second = extractor
            .extract_document("b.txt", "Sorghum needs little water.")
            .unwrap();
        assert!(second.result.success);
        assert_eq!(p1.call_count(), 1);
        assert_eq!(p2.call_count(), 2);
        assert_eq!(extractor.status().total_providers, 1);
    }

    #[test]
    fn test_repaired_output_is_used() {
        let llm = MockProvider::new(
            "Here you go:\n```json\n{\"crops\": [{\"name\": \"Maize\", \"farming_practices\": [\"ridging\"",
        );
        let mut extractor = extractor(&[&llm], ExtractorConfig::default());
        let extraction = extractor
            .extract_document("maize.txt", "Maize is planted on ridges.")
            .unwrap();
        assert!(extraction.result.success);
        assert_eq!(extraction.entities()[0].farming_practices, vec!["ridging"]);
    }

    #[test]
    fn test_unparseable_output_fails_as_data() {
        let llm = MockProvider::new("Sorry, I cannot help with that.");
        let mut extractor = extractor(&[&llm], ExtractorConfig::default());
        let extraction = extractor
            .extract_document("x.txt", "Cassava grows in poor soils.")
            .unwrap();
        assert!(!extraction.result.success);
        assert_eq!(extraction.result.provider, "multiple");
        assert_eq!(extraction.result.error_kind, Some(ErrorKind::MalformedOutput));
        assert!(extraction.entities().is_empty());
    }

    #[test]
    fn test_no_providers() {
        let offline = MockProvider::default().with_available(false);
        let mut extractor = extractor(&[&offline], ExtractorConfig::default());
        let extraction = extractor.extract_document("x.txt", "Beans fix nitrogen.").unwrap();
        assert_eq!(extraction.result.provider, "none");
        assert_eq!(extraction.result.error_kind, Some(ErrorKind::Configuration));
        assert_eq!(offline.call_count(), 0);
    }

    #[test]
    fn test_extraction_respects_text_length_limit() {
        let llm = MockProvider::default();
        let config = ExtractorConfig {
            max_text_length: 100,
            max_chunk_tokens: 10,
            ..ExtractorConfig::default()
        };
        let mut extractor = extractor(&[&llm], config);
        let result = extractor.extract_document("big.txt", &"a".repeat(101));
        assert_eq!(result.unwrap_err(), ExtractorError::TextTooLong(101, 100));
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_empty_document() {
        let llm = MockProvider::default();
        let mut extractor = extractor(&[&llm], ExtractorConfig::default());
        let result = extractor.extract_document("blank.txt", " ** \n\n @@ ");
        assert_eq!(result.unwrap_err(), ExtractorError::EmptyDocument);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExtractorConfig {
            max_chunk_tokens: 0,
            ..ExtractorConfig::default()
        };
        let orchestrator = Orchestrator::new(Vec::new(), ProviderStrategy::Failover);
        assert!(matches!(
            Extractor::new(orchestrator, config),
            Err(ExtractorError::Config(_))
        ));
    }

    #[test]
    fn test_uncombined_results() {
        let llm = MockProvider::new(r#"{"crops": [{"name": "Teff"}]}"#);
        let config = ExtractorConfig {
            combine_results: false,
            ..small_chunks()
        };
        let mut extractor = extractor(&[&llm], config);
        let extraction = extractor
            .extract_document("teff.txt", "Teff is a small grain.\n\nTeff is gluten free.")
            .unwrap();
        let fragments = extraction.result.chunk_results.unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].chunk_id, 1);
        assert!(extraction.result.data.is_none());
    }

    #[test]
    fn test_segment_cleans_first() {
        let llm = MockProvider::default();
        let extractor = extractor(&[&llm], small_chunks());
        let chunks = extractor.segment("Okra *** needs\t\twarmth.\r\n\r\n\r\nPlant okra after the last frost.");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Okra needs warmth.");
    }
}
