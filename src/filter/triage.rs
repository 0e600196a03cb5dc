//! Cheap local triage deciding whether a turn is worth sending to the extractor.
//!
//! A message is skipped when it is blank, made only of symbols (emoji and
//! the like), too short once punctuation is removed, or matches one of the
//! small-talk rules below. Rules are plain data: a category and an anchored
//! regex, checked in order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Messages at or below this many characters (punctuation removed) are skipped.
pub const MIN_CONTENT_CHARS: usize = 3;

/// Why a message was judged to be conversational noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageCategory {
    Empty,
    SymbolsOnly,
    TooShort,
    Greeting,
    Farewell,
    Acknowledgment,
}

/// One small-talk rule.
#[derive(Debug, Clone)]
pub struct TriageRule {
    pub category: TriageCategory,
    pub pattern: Regex,
}

impl TriageRule {
    /// Build a rule. Panics on an invalid pattern, so only use with literals.
    pub fn new(category: TriageCategory, pattern: &str) -> Self {
        Self {
            category,
            pattern: Regex::new(pattern).expect("invalid triage regex"),
        }
    }
}

// Trailing filler allowed after a small-talk phrase (punctuation, emoji, variation selectors).
const TAIL: &str = r"[\s\p{P}\p{S}\p{M}]*$";

static DEFAULT_RULES: LazyLock<Vec<TriageRule>> = LazyLock::new(|| {
    let rule = |category, body: &str| {
        TriageRule::new(category, &format!("(?i)^\\s*(?:{body}){TAIL}"))
    };
    vec![
        // English
        rule(
            TriageCategory::Greeting,
            r"(?:hi+|hello+|hey+|hiya|yo|sup|howdy|hey there|hi there|hello there|good (?:morning|afternoon|evening|night)|morning|evening|what'?s up|how are you(?: doing| today)?|how'?s it going)(?: (?:dear|babe|friend|buddy))?",
        ),
        rule(
            TriageCategory::Farewell,
            r"(?:bye+|bye bye|goodbye|good ?night|gn|night|see (?:you|ya)(?: later| tomorrow| soon)?|see you later|later|talk (?:to you )?later|ttyl|take care|gotta go|i have to go|going to (?:bed|sleep))",
        ),
        rule(
            TriageCategory::Acknowledgment,
            r"(?:ok(?:ay)?|k+|kk|sure|yes|yeah|yep|yup|no|nope|nah|fine|cool|nice|great|awesome|alright|got it|i see|sounds good|makes sense|thanks?(?: you)?(?: so much| a lot)?|thx|ty|lol+|haha+|hehe+|lmao|hmm+|oh+|ah+|wow|right|true|same|me too|you too)",
        ),
        // Chinese
        rule(
            TriageCategory::Greeting,
            r"(?:你好|您好|嗨|哈喽|哈囉|早上好|早安|早|中午好|下午好|晚上好|在吗|在嘛|在不在|你在吗)(?:呀|啊|哦|呢)?",
        ),
        rule(
            TriageCategory::Farewell,
            r"(?:再见|拜拜|拜|晚安|明天见|回头见|下次聊|我先走了|我去睡了|睡了)(?:呀|啊|哦|啦)?",
        ),
        rule(
            TriageCategory::Acknowledgment,
            r"(?:好的?|好吧|好呀|好啊|嗯+|哦+|噢+|啊+|行|可以|知道了|明白了?|了解|谢谢(?:你)?|多谢|对|是的|没错|哈哈+|呵呵+|嘻嘻+|好滴)",
        ),
        // Japanese
        rule(
            TriageCategory::Greeting,
            r"(?:こんにちは|こんばんは|おはよう(?:ございます)?|やあ|もしもし)",
        ),
        rule(
            TriageCategory::Farewell,
            r"(?:さようなら|またね|おやすみ(?:なさい)?|じゃあね|バイバイ)",
        ),
        rule(
            TriageCategory::Acknowledgment,
            r"(?:はい|うん|ええ|そうですね|そうだね|なるほど|ありがとう(?:ございます)?|了解(?:です)?|わかった|わかりました)",
        ),
        // Korean
        rule(
            TriageCategory::Greeting,
            r"(?:안녕(?:하세요)?|반가워(?:요)?|좋은 아침(?:이에요)?)",
        ),
        rule(
            TriageCategory::Farewell,
            r"(?:잘 ?자(?:요)?|안녕히 (?:가세요|계세요)|또 봐(?:요)?|바이)",
        ),
        rule(
            TriageCategory::Acknowledgment,
            r"(?:네|응|그래(?:요)?|알겠어(?:요)?|고마워(?:요)?|감사합니다|ㅋ+|ㅎ+)",
        ),
        // Spanish
        rule(
            TriageCategory::Greeting,
            r"(?:hola|buenos d[ií]as|buenas(?: tardes| noches)?|qu[eé] tal)",
        ),
        rule(
            TriageCategory::Farewell,
            r"(?:adi[oó]s|chao|chau|hasta (?:luego|ma[nñ]ana|pronto)|nos vemos)",
        ),
        rule(
            TriageCategory::Acknowledgment,
            r"(?:vale|gracias|s[ií]|claro|de acuerdo|jaja+|bueno|perfecto)",
        ),
    ]
});

/// Decides whether a user message should bypass fact extraction.
#[derive(Debug, Clone)]
pub struct TriageFilter {
    rules: Vec<TriageRule>,
    min_content_chars: usize,
}

impl Default for TriageFilter {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            min_content_chars: MIN_CONTENT_CHARS,
        }
    }
}

impl TriageFilter {
    /// Create a filter with the built-in small-talk rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extra rule, checked after the existing ones.
    pub fn with_rule(mut self, rule: TriageRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[TriageRule] {
        &self.rules
    }

    /// Return the reason a message is noise, or `None` if it should be analyzed.
    pub fn classify(&self, message: &str) -> Option<TriageCategory> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Some(TriageCategory::Empty);
        }

        if !trimmed.chars().any(char::is_alphanumeric) {
            return Some(TriageCategory::SymbolsOnly);
        }

        let content_chars = trimmed
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>();
        if content_chars.trim().chars().count() <= self.min_content_chars {
            return Some(TriageCategory::TooShort);
        }

        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(trimmed))
            .map(|rule| rule.category)
    }

    /// Whether the message is conversational noise not worth extracting from.
    pub fn should_skip(&self, message: &str) -> bool {
        self.classify(message).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_symbols() {
        let filter = TriageFilter::new();
        assert_eq!(filter.classify(""), Some(TriageCategory::Empty));
        assert_eq!(filter.classify("   \n\t"), Some(TriageCategory::Empty));
        assert_eq!(filter.classify("😂😂😂"), Some(TriageCategory::SymbolsOnly));
        assert_eq!(filter.classify("❤️ 🌹 ✨ !!!"), Some(TriageCategory::SymbolsOnly));
    }

    #[test]
    fn test_short_content() {
        let filter = TriageFilter::new();
        assert_eq!(filter.classify("hi"), Some(TriageCategory::TooShort));
        assert_eq!(filter.classify("ok!!!"), Some(TriageCategory::TooShort));
        assert_eq!(filter.classify("嗯嗯"), Some(TriageCategory::TooShort));
        assert!(filter.should_skip("lol."));
    }

    #[test]
    fn test_small_talk_rules() {
        let filter = TriageFilter::new();
        assert_eq!(filter.classify("Hello there!"), Some(TriageCategory::Greeting));
        assert_eq!(filter.classify("good morning ☀️"), Some(TriageCategory::Greeting));
        assert_eq!(filter.classify("See you tomorrow~"), Some(TriageCategory::Farewell));
        assert_eq!(filter.classify("thanks so much!"), Some(TriageCategory::Acknowledgment));
        assert_eq!(filter.classify("早上好呀"), Some(TriageCategory::Greeting));
        assert_eq!(filter.classify("我先走了啦！"), Some(TriageCategory::Farewell));
        assert_eq!(filter.classify("哈哈哈哈"), Some(TriageCategory::Acknowledgment));
        assert_eq!(filter.classify("おやすみなさい"), Some(TriageCategory::Farewell));
        assert_eq!(filter.classify("buenos días"), Some(TriageCategory::Greeting));
    }

    #[test]
    fn test_informative_messages_pass() {
        let filter = TriageFilter::new();
        assert!(!filter.should_skip("I just adopted a puppy named Biscuit"));
        assert!(!filter.should_skip("Hello, I started a new job at the hospital today"));
        assert!(!filter.should_skip("我下周要去上海出差"));
        assert!(!filter.should_skip("thanks, my sister is visiting next week"));
    }

    #[test]
    fn test_custom_rule() {
        let filter = TriageFilter::new().with_rule(TriageRule::new(
            TriageCategory::Acknowledgment,
            r"(?i)^\s*roger that\s*$",
        ));
        assert_eq!(filter.classify("Roger that"), Some(TriageCategory::Acknowledgment));
        assert_eq!(filter.rules().len(), DEFAULT_RULES.len() + 1);
    }
}
