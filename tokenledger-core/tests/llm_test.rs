use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokenledger_core::models::metrics::{SUCCESSFUL_REQUESTS, TOTAL_COST, TOTAL_TOKENS};
use tokenledger_core::{
    invoke_counted, AccountingConfig, AccountingSession, Completion, CompletionRequest,
    DynLanguageModel, InvocationContext, LanguageModel, LedgerError, LedgerResult,
    LlmClientFactory, LlmConfig, LlmDefaults, LlmPolicy, MemoryJournal, ModelPricing,
    PricingTable, ProviderClass, TokenUsage,
};

struct MockModel {
    provider: ProviderClass,
    model_name: String,
    usage: TokenUsage,
    fail: bool,
    calls: AtomicUsize,
}

impl MockModel {
    fn new(provider: ProviderClass, model_name: &str, usage: TokenUsage) -> Self {
        Self {
            provider,
            model_name: model_name.to_string(),
            usage,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(provider: ProviderClass, model_name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(provider, model_name, TokenUsage::default())
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn provider(&self) -> ProviderClass {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, request: &CompletionRequest) -> LedgerResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LedgerError::LlmRequestFailed {
                provider: self.provider.to_string(),
                message: "rate limited".to_string(),
            });
        }
        let content = request
            .messages
            .last()
            .map(|m| format!("echo: {}", m.content))
            .unwrap_or_default();
        Ok(Completion {
            content,
            usage: self.usage,
        })
    }
}

struct MockPolicy {
    provider: ProviderClass,
    release_fails: bool,
    released: Arc<AtomicUsize>,
    seen_configs: Mutex<Vec<LlmConfig>>,
}

impl MockPolicy {
    fn new(provider: ProviderClass) -> Self {
        Self {
            provider,
            release_fails: false,
            released: Arc::new(AtomicUsize::new(0)),
            seen_configs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmPolicy for MockPolicy {
    fn provider(&self) -> ProviderClass {
        self.provider
    }

    fn create_model(&self, config: &LlmConfig, model_name: &str) -> LedgerResult<DynLanguageModel> {
        self.seen_configs.lock().unwrap().push(config.clone());
        Ok(Arc::new(MockModel::new(
            self.provider,
            model_name,
            TokenUsage::new(10, 5),
        )))
    }

    async fn release_resources(&self) -> LedgerResult<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.release_fails {
            return Err(LedgerError::LlmResourceRelease("client already closed".to_string()));
        }
        Ok(())
    }
}

mod factory_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_llm_resources() {
        let factory = LlmClientFactory::new();
        factory
            .register(Arc::new(MockPolicy::new(ProviderClass::OpenAi)))
            .await
            .unwrap();

        let config = LlmConfig::from_value(json!({
            "class": "OpenAI",
            "model": "gpt-4o",
            "temperature": 0.3,
        }))
        .unwrap();
        let resources = factory.create_llm_resources(&config).await.unwrap();

        assert_eq!(resources.model().provider(), ProviderClass::OpenAi);
        assert_eq!(resources.model().model_name(), "gpt-4o");
        assert!(resources.policy().is_some());
    }

    #[tokio::test]
    async fn test_unspecified_class() {
        let factory = LlmClientFactory::new();
        let config = LlmConfig::from_value(json!({"model_name": "gpt-4o"})).unwrap();

        let err = factory.create_llm_resources(&config).await.unwrap_err();
        assert!(matches!(err, LedgerError::LlmClassUnspecified { ref model } if model == "gpt-4o"));
    }

    #[tokio::test]
    async fn test_unrecognized_class() {
        let factory = LlmClientFactory::new();
        let config = LlmConfig::new("Llamafile", "tiny");

        let err = factory.create_llm_resources(&config).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[E3002] Class llamafile for model_name tiny is unrecognized"
        );
    }

    #[tokio::test]
    async fn test_known_class_without_policy() {
        let factory = LlmClientFactory::new();
        factory
            .register(Arc::new(MockPolicy::new(ProviderClass::OpenAi)))
            .await
            .unwrap();

        let err = factory
            .create_llm_resources(&LlmConfig::new("gemini", "gemini-1.5-pro"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::LlmPolicyNotRegistered(ref p) if p == "gemini"));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let factory = LlmClientFactory::new();
        factory
            .register(Arc::new(MockPolicy::new(ProviderClass::Anthropic)))
            .await
            .unwrap();

        let err = factory
            .register(Arc::new(MockPolicy::new(ProviderClass::Anthropic)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E3004");

        assert!(factory.is_registered(ProviderClass::Anthropic).await);
        assert!(factory.unregister(ProviderClass::Anthropic).await.is_some());
        assert!(factory.registered_providers().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_config_applies_defaults() {
        let defaults = LlmDefaults {
            class: "anthropic".to_string(),
            model_name: "claude-3-haiku".to_string(),
            ..LlmDefaults::default()
        };
        let factory = LlmClientFactory::new().with_defaults(defaults);
        let policy = Arc::new(MockPolicy::new(ProviderClass::Anthropic));
        factory.register(policy.clone()).await.unwrap();

        let config = factory.full_config(&LlmConfig::default());
        let resources = factory.create_llm_resources(&config).await.unwrap();

        assert_eq!(resources.model().model_name(), "claude-3-haiku");
        let seen = policy.seen_configs.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_release_failures_are_suppressed() {
        let released = Arc::new(AtomicUsize::new(0));
        let policy = MockPolicy {
            release_fails: true,
            released: released.clone(),
            ..MockPolicy::new(ProviderClass::Bedrock)
        };
        let factory = LlmClientFactory::new();
        factory.register(Arc::new(policy)).await.unwrap();

        let resources = factory
            .create_llm_resources(&LlmConfig::new("bedrock", "anthropic.claude-v2"))
            .await
            .unwrap();
        resources.release_resources().await;

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}

mod counting_tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_counted_records_usage() {
        let session = Arc::new(AccountingSession::with_defaults());
        let journal = Arc::new(MemoryJournal::new());
        let ctx = InvocationContext::new(session.clone()).with_sink(journal.clone());
        let model = MockModel::new(
            ProviderClass::OpenAi,
            "gpt-4o",
            TokenUsage::new(6, 4).with_cost(0.01),
        );

        let completion = ctx
            .count_tokens("frontman", |ctx| {
                let model = &model;
                async move {
                    invoke_counted(&ctx, model, &CompletionRequest::prompt("hello")).await
                }
            })
            .await
            .unwrap();

        assert_eq!(completion.content, "echo: hello");
        let cumulative = session.cumulative();
        assert_eq!(cumulative.get("openai", "gpt-4o", TOTAL_TOKENS), Some(10.0));
        assert_eq!(cumulative.get("openai", "gpt-4o", TOTAL_COST), Some(0.01));
        assert_eq!(
            cumulative.get("openai", "gpt-4o", SUCCESSFUL_REQUESTS),
            Some(1.0)
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invoke_counted_prices_unreported_cost() {
        let pricing = PricingTable::from_entries(vec![
            ModelPricing::new("claude-3-haiku", "anthropic").with_pricing(0.25, 1.25)
        ]);
        let session = Arc::new(AccountingSession::new(AccountingConfig::default(), pricing));
        let ctx = InvocationContext::new(session.clone());
        let model = MockModel::new(
            ProviderClass::Anthropic,
            "claude-3-haiku",
            TokenUsage::new(1000, 1000),
        );

        invoke_counted(&ctx, &model, &CompletionRequest::prompt("hi"))
            .await
            .unwrap();

        let cost = session
            .cumulative()
            .get("anthropic", "claude-3-haiku", TOTAL_COST)
            .unwrap();
        assert!((cost - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_request_records_nothing() {
        let session = Arc::new(AccountingSession::with_defaults());
        let ctx = InvocationContext::new(session.clone());
        let model = MockModel::failing(ProviderClass::Gemini, "gemini-1.5-pro");

        let err = invoke_counted(&ctx, &model, &CompletionRequest::prompt("hi"))
            .await
            .unwrap_err();

        assert!(err.is_llm_error());
        assert!(session.cumulative().is_empty());
    }
}
