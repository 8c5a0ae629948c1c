use crate::core::cancel::CancellationToken;
use crate::core::error::{GenerationError, Result};
use crate::core::model::{GenerationConfig, PanelLayout, StoryRecord};
use crate::services::diversity;
use crate::services::dispatch::{self, BackendDispatcher, RetryPolicy};
use crate::services::llm::LlmClient;
use crate::services::parser::{self, ParseOptions};
use crate::services::prompt::{self, PromptRequest};
use crate::services::request;
use crate::services::similarity::{SimilarityGuard, DEFAULT_MIN_SIGNATURE_LEN};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Result of one successful generation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub seed: u32,
    pub stories: Vec<StoryRecord>,
    /// One prompt document per story, same order.
    pub prompts: Vec<String>,
}

/// Clears the busy flag when the attempt ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| {
                GenerationError::InvalidConfiguration("generation already in progress".to_string())
            })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GenerationManager {
    llm: Box<dyn LlmClient>,
    dispatcher: BackendDispatcher,
    busy: AtomicBool,
    /// Character plan of the last accepted serial batch.
    last_characters: Mutex<Option<Vec<String>>>,
    /// Fired by `abort`. Replaced at the start of every attempt.
    attempt: Mutex<CancellationToken>,
}

impl GenerationManager {
    pub fn new(llm: Box<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            llm,
            dispatcher: BackendDispatcher::new(policy),
            busy: AtomicBool::new(false),
            last_characters: Mutex::new(None),
            attempt: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.dispatcher.policy()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Cancels the running attempt, whether it is waiting on the backend or
    /// between re-dispatches.
    pub fn abort(&self) {
        self.attempt.lock().unwrap_or_else(|e| e.into_inner()).cancel();
        self.dispatcher.abort_current();
    }

    pub async fn generate(
        &self,
        config: &GenerationConfig,
        token: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let seed: u32 = rand::random();
        self.generate_with_seed(config, seed, token).await
    }

    /// Runs one attempt with a fixed seed. All stories are returned or none.
    pub async fn generate_with_seed(
        &self,
        config: &GenerationConfig,
        seed: u32,
        token: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let attempt = CancellationToken::new();
        *self.attempt.lock().unwrap_or_else(|e| e.into_inner()) = attempt.clone();
        config.validate()?;

        let previous = if config.serial.is_some() {
            self.last_characters
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        } else {
            None
        };
        let plan = diversity::plan(config, seed, previous.as_deref());
        let characters = plan.characters();
        let system = request::system_prompt(&config.language);
        let prompt = request::build(config, &plan);
        info!(
            "Generating {} stories ({} panels, seed {})",
            plan.len(),
            config.panel_count(),
            seed
        );
        debug!("Request is {} chars", prompt.chars().count());

        let options = ParseOptions {
            panel_count: config.panel_count(),
            expected_count: Some(plan.len()),
            character_plan: &characters,
            first_episode: config.first_episode(),
        };
        let policy = self.dispatcher.policy().clone();
        let guard = SimilarityGuard::new(policy.duplicate_threshold, DEFAULT_MIN_SIGNATURE_LEN);

        let mut redispatches: u32 = 0;
        let stories = loop {
            if token.is_cancelled() || attempt.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            let raw = tokio::select! {
                biased;
                _ = attempt.cancelled() => return Err(GenerationError::Cancelled),
                res = self.dispatcher.dispatch(self.llm.as_ref(), &system, &prompt, token) => res?,
            };

            let accepted = parser::parse(&raw, &options).and_then(|mut stories| {
                if stories.len() > plan.len() {
                    debug!("Dropping {} surplus stories", stories.len() - plan.len());
                    stories.truncate(plan.len());
                }
                guard.check(&stories)?;
                Ok(stories)
            });

            match accepted {
                Ok(stories) => break stories,
                Err(e) if e.needs_redispatch() && redispatches < policy.parse_retries => {
                    let delay = policy.backoff(redispatches);
                    redispatches += 1;
                    warn!(
                        "Reply rejected ({}), re-dispatching {}/{} in {:?}",
                        e, redispatches, policy.parse_retries, delay
                    );
                    dispatch::wait_backoff(delay, token, &attempt).await?;
                }
                Err(e) => return Err(e),
            }
        };

        let prompts = synthesize_all(config, &stories, &HashMap::new());

        if config.serial.is_some() {
            *self.last_characters.lock().unwrap_or_else(|e| e.into_inner()) = Some(characters);
        }
        info!("Accepted {} stories", stories.len());

        Ok(GenerationOutcome {
            seed,
            stories,
            prompts,
        })
    }
}

/// Renders prompt documents for stories already held by the caller.
///
/// `outfits` maps a story index to its per-panel outfit overrides.
pub fn synthesize_all(
    config: &GenerationConfig,
    stories: &[StoryRecord],
    outfits: &HashMap<usize, Vec<String>>,
) -> Vec<String> {
    let style = config.effective_style();
    let theme = config.theme_label();
    let layout = PanelLayout::for_panels(config.panel_count());

    stories
        .iter()
        .enumerate()
        .map(|(i, story)| {
            prompt::synthesize(&PromptRequest {
                story,
                style: &style,
                theme: &theme,
                layout,
                language: &config.language,
                tier: config.tier,
                outfits: outfits.get(&i).map(Vec::as_slice),
                signature: config.signature.as_deref(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{SerialOptions, Style, ThemeCategory, ThemeMeta};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    // Mock LLM Client
    #[derive(Debug)]
    struct MockLlmClient {
        replies: Mutex<VecDeque<String>>,
        requests: Arc<Mutex<Vec<String>>>,
        call_count: Arc<Mutex<usize>>,
        delay: Duration,
    }

    impl MockLlmClient {
        fn new(replies: Vec<String>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
                call_count: Arc::new(Mutex::new(0)),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, _system: &str, prompt: &str) -> Result<String> {
            *self.call_count.lock().unwrap() += 1;
            self.requests.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.ok_or_else(|| GenerationError::BackendGeneric("no scripted reply".to_string()))
        }
    }

    fn config(count: usize) -> GenerationConfig {
        GenerationConfig {
            style: Some(Style {
                name: "도라에몽".to_string(),
                label: "Doraemon".to_string(),
                chars: vec!["Kim".to_string(), "Lee".to_string()],
                category: None,
            }),
            themes: vec![ThemeMeta::new("burnout", "번아웃", "무감각", ThemeCategory::Daily)],
            panel_count: Some(4),
            story_count: count,
            signature: Some("Jeremy".to_string()),
            ..Default::default()
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    const TOPICS: [&str; 4] = [
        "월요일 아침 알람을 다섯 번 끄고 지각한 직장인",
        "점심 메뉴를 삼십 분 고민하다 편의점 도시락",
        "주말 내내 누워만 있다가 일요일 밤 후회",
        "헬스장 등록만 하고 한 번도 안 간 석 달째",
    ];

    fn story(i: usize, character: &str) -> String {
        format!(
            r#"{{"title": "제목 {i} {topic}", "desc": "{topic}", "kick": "반전 {i}", "dialog": ["시작 {i}", "중간 {i}", "위기 {i}", "끝 {i}"], "narration": "여운 {i}", "summary": "요약 {topic}", "character": "{character}"}}"#,
            i = i,
            topic = TOPICS[i % TOPICS.len()],
            character = character
        )
    }

    fn batch(count: usize) -> String {
        let names = ["Kim", "Lee"];
        let items: Vec<String> = (0..count).map(|i| story(i, names[i % 2])).collect();
        format!("```json\n[{}]\n```", items.join(",\n"))
    }

    #[tokio::test]
    async fn test_generate_happy_path() {
        let llm = MockLlmClient::new(vec![batch(3)]);
        let requests = llm.requests.clone();
        let manager = GenerationManager::new(Box::new(llm), fast_policy());

        let outcome = manager
            .generate_with_seed(&config(3), 42, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.seed, 42);
        assert_eq!(outcome.stories.len(), 3);
        assert_eq!(outcome.prompts.len(), 3);
        assert!(outcome.stories.iter().all(|s| s.dialog.len() == 4));
        assert!(outcome.prompts[0].contains("제목 0"));
        assert!(outcome.prompts[2].contains("by Jeremy"));
        assert!(!manager.is_busy());

        let sent = requests.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("• 스토리1: Kim"));
        assert!(sent[0].contains("• 스토리2: Lee"));
        assert!(sent[0].contains("• 스토리3: Kim"));
    }

    #[tokio::test]
    async fn test_redispatches_after_incomplete_batch() {
        let llm = MockLlmClient::new(vec![batch(2), batch(3)]);
        let calls = llm.call_count.clone();
        let manager = GenerationManager::new(Box::new(llm), fast_policy());

        let outcome = manager
            .generate_with_seed(&config(3), 7, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.stories.len(), 3);
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_exhaust_parse_retries() {
        let dup = format!("[{}, {}]", story(0, "Kim"), story(0, "Lee"));
        let llm = MockLlmClient::new(vec![dup.clone(), dup]);
        let calls = llm.call_count.clone();
        let manager = GenerationManager::new(Box::new(llm), fast_policy());

        let err = manager
            .generate_with_seed(&config(2), 1, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::DuplicateDetected { first: 0, second: 1, .. }));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_without_retries_fails() {
        let llm = MockLlmClient::new(vec!["죄송하지만 도와드릴 수 없습니다.".to_string()]);
        let manager = GenerationManager::new(
            Box::new(llm),
            RetryPolicy {
                parse_retries: 0,
                ..fast_policy()
            },
        );
        let err = manager
            .generate_with_seed(&config(2), 1, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_rejected_before_dispatch() {
        let llm = MockLlmClient::new(vec![]);
        let calls = llm.call_count.clone();
        let manager = GenerationManager::new(Box::new(llm), fast_policy());

        let err = manager
            .generate(&GenerationConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfiguration(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_second_concurrent_generation_is_refused() {
        let mut llm = MockLlmClient::new(vec![batch(2)]);
        llm.delay = Duration::from_millis(200);
        let manager = Arc::new(GenerationManager::new(Box::new(llm), fast_policy()));

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .generate_with_seed(&config(2), 3, &CancellationToken::new())
                    .await
            })
        };
        sleep(Duration::from_millis(30)).await;

        let err = manager
            .generate_with_seed(&config(2), 3, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::InvalidConfiguration("generation already in progress".to_string())
        );
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_is_silent() {
        let mut llm = MockLlmClient::new(vec![batch(2)]);
        llm.delay = Duration::from_secs(5);
        let manager = GenerationManager::new(Box::new(llm), fast_policy());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = manager
            .generate_with_seed(&config(2), 3, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.user_message(), None);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_abort_during_redispatch_wait() {
        let llm = MockLlmClient::new(vec![batch(2), batch(3)]);
        let calls = llm.call_count.clone();
        let manager = Arc::new(GenerationManager::new(
            Box::new(llm),
            RetryPolicy {
                initial_backoff: Duration::from_millis(300),
                ..RetryPolicy::default()
            },
        ));
        {
            let manager = manager.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(100)).await;
                manager.abort();
            });
        }

        let err = manager
            .generate_with_seed(&config(3), 3, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_abort_before_generation_does_not_cancel_next_attempt() {
        let llm = MockLlmClient::new(vec![batch(2)]);
        let manager = GenerationManager::new(Box::new(llm), fast_policy());
        manager.abort();

        let outcome = manager
            .generate_with_seed(&config(2), 3, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.stories.len(), 2);
    }

    #[tokio::test]
    async fn test_serial_batches_continue_character_rotation() {
        let mut cfg = config(4);
        cfg.style.as_mut().unwrap().chars.push("Park".to_string());
        cfg.serial = Some(SerialOptions {
            episode_count: 2,
            start_episode: 3,
            previous_summary: String::new(),
        });

        let llm = MockLlmClient::new(vec![batch(2), batch(2)]);
        let requests = llm.requests.clone();
        let manager = GenerationManager::new(Box::new(llm), fast_policy());

        let first = manager
            .generate_with_seed(&cfg, 9, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.stories[0].episode, Some(3));
        assert_eq!(first.stories[1].episode, Some(4));

        manager
            .generate_with_seed(&cfg, 9, &CancellationToken::new())
            .await
            .unwrap();
        let sent = requests.lock().unwrap();
        assert!(sent[1].contains("• 스토리1: Park"));
        assert!(sent[1].contains("• 스토리2: Kim"));
    }

    #[test]
    fn test_synthesize_all_applies_outfits_per_story() {
        let cfg = config(2);
        let stories = parser::parse(
            &batch(2),
            &ParseOptions {
                panel_count: 4,
                expected_count: Some(2),
                character_plan: &[],
                first_episode: 1,
            },
        )
        .unwrap();
        let mut outfits = HashMap::new();
        outfits.insert(1, vec!["우비".to_string()]);

        let prompts = synthesize_all(&cfg, &stories, &outfits);
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("우비"));
        assert!(prompts[1].contains("👗 의상 (이 컷 전용): 우비"));
    }
}
