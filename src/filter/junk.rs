//! Deny-list classifier for facts that must never be remembered.
//!
//! The extractor is asked not to propose transient or meta facts, but its
//! judgment is unreliable, so every candidate (new facts and update targets)
//! passes through this table before reaching the merger.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Kind of low-value content a rule rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunkCategory {
    /// Weather, temperatures, prices, rates, scores
    RealTimeData,
    /// News and current events
    News,
    /// Restated greetings and goodbyes
    Greeting,
    /// Statements about the assistant or the conversation itself
    MetaConversation,
}

impl fmt::Display for JunkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RealTimeData => write!(f, "real_time_data"),
            Self::News => write!(f, "news"),
            Self::Greeting => write!(f, "greeting"),
            Self::MetaConversation => write!(f, "meta_conversation"),
        }
    }
}

/// One deny pattern.
#[derive(Debug, Clone)]
pub struct JunkRule {
    pub category: JunkCategory,
    pub pattern: Regex,
}

impl JunkRule {
    /// Build a rule. Panics on an invalid pattern, so only use with literals.
    pub fn new(category: JunkCategory, pattern: &str) -> Self {
        Self {
            category,
            pattern: Regex::new(pattern).expect("invalid junk regex"),
        }
    }
}

static DEFAULT_RULES: LazyLock<Vec<JunkRule>> = LazyLock::new(|| {
    vec![
        // Readings, or weather words tied to the current moment
        JunkRule::new(
            JunkCategory::RealTimeData,
            r"(?i)(-?\d+(\.\d+)?\s*(°|℃|℉)|\b\d+(\.\d+)?\s*degrees?\s+(celsius|fahrenheit|outside|today|now)\b|\b(weather|temperature|forecast)\b.*\b(today|tonight|tomorrow|now|outside|this\s+(morning|afternoon|evening|week))\b|\b(today|tonight|outside)\b.*\b(weather|temperature)\b|\b(sunny|rainy|cloudy|raining|snowing|humid)\b.*\b(today|tonight|now|outside)\b)",
        ),
        JunkRule::new(
            JunkCategory::RealTimeData,
            r"(?i)(\b(stock|share|bitcoin|btc|ethereum|eth|gold|oil)\s+prices?\b|\bexchange\s+rate\b|\b(bitcoin|btc|ethereum|nasdaq|dow jones|s&p\s*500|the\s+stock\s+market)\b.*\b(is|was)\s+(at|up|down|trading)\b|\bcurrent(ly)?\s+(price|score)\b)",
        ),
        JunkRule::new(
            JunkCategory::RealTimeData,
            r"((今天|今日|现在|明天|今晚|外面).{0,8}(天气|气温|温度|下雨|下雪|降雨)|(天气|气温|温度).{0,6}(\d|零下|很热|很冷|很低|很高)|\d+\s*(度|摄氏度)|(股价|汇率|大盘|比特币).{0,6}(\d|涨|跌|多少)|(今天|现在).{0,6}(股市|股价|汇率|大盘)|(今日|今).{0,4}(天気|気温)|(오늘|지금).{0,4}(날씨|기온))",
        ),
        // Consuming or relaying news, not working in it
        JunkRule::new(
            JunkCategory::News,
            r"(?i)(\b(read|reading|saw|seen|heard|watched|watching|follows?|following)\s+(the\s+|some\s+)?(news|headlines?)\b|\bbreaking\s+news\b|\b(in|on|from)\s+the\s+news\b|\bnews\s+(about|that|says|said|reports?|reported)\b|\belection\s+results?\b|\bheadlines?\s+(today|say|said)\b)",
        ),
        JunkRule::new(
            JunkCategory::News,
            r"((看|刷|读|听)了?(新闻|热搜|头条)|今天的?(新闻|头条|热搜)|新闻(说|报道)|ニュース(で|を見|によると)|뉴스(에서|를 봤|에 따르면))",
        ),
        JunkRule::new(
            JunkCategory::Greeting,
            r"(?i)(\b(said|says|greeted( me| the ai| the assistant)?( with)?)\s+(hi|hello|hey|good\s*(morning|night|evening)|goodbye|bye)\b|\b(said|says)\s+(thanks|thank you)\b|\bgreeted\b|\bsaid goodbye\b|\bwished\s+(me|the (ai|assistant))\s+good\s*night\b)",
        ),
        JunkRule::new(
            JunkCategory::Greeting,
            r"(打招呼|问好|说了?你好|说了?早安|说了?晚安|说了?再见|道别)",
        ),
        // The assistant acting or being addressed
        JunkRule::new(
            JunkCategory::MetaConversation,
            r"(?i)(\b(the|this)\s+(ai|assistant|chatbot|bot)\s+(is|was|said|says|told|replied|answered|responded|asked|called|named)\b|\b(asked|told|thanked)\s+(the\s+)?(ai|assistant|chatbot|bot)\b|\b(talking|chatting|talked|chatted)\s+(to|with)\s+(the\s+)?(ai|assistant|chatbot|bot|you)\b|\bthis\s+(conversation|chat)\b|\bis\s+(using|testing)\s+(the\s+)?(app|chatbot|ai)\b)",
        ),
        JunkRule::new(
            JunkCategory::MetaConversation,
            r"((和|跟|与|同)(你|AI|ai|助手|机器人)(聊天|对话|说话|聊)|(问|告诉|谢谢|感谢)了?(AI|ai|助手|机器人)|(AI|助手|机器人)(说|回答|回复|告诉)|这(次|段)?(对话|聊天)|アシスタント(と話|に聞|が言)|어시스턴트(와|에게|가 말))",
        ),
    ]
});

/// Pattern-based junk detector.
#[derive(Debug, Clone)]
pub struct JunkClassifier {
    rules: Vec<JunkRule>,
}

impl Default for JunkClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl JunkClassifier {
    /// Create a classifier with the built-in deny rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with no rules (accepts everything).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a deny rule.
    pub fn with_rule(mut self, rule: JunkRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[JunkRule] {
        &self.rules
    }

    /// Category of the first matching rule, if any.
    pub fn classify(&self, fact: &str) -> Option<JunkCategory> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(fact))
            .map(|rule| rule.category)
    }

    pub fn is_junk(&self, fact: &str) -> bool {
        self.classify(fact).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_time_data() {
        let junk = JunkClassifier::new();
        assert_eq!(
            junk.classify("It is 23°C in Beijing today"),
            Some(JunkCategory::RealTimeData)
        );
        assert_eq!(
            junk.classify("The temperature outside is 75 degrees"),
            Some(JunkCategory::RealTimeData)
        );
        assert_eq!(junk.classify("今天北京气温很低"), Some(JunkCategory::RealTimeData));
        assert_eq!(
            junk.classify("Bitcoin price is at 60k"),
            Some(JunkCategory::RealTimeData)
        );
        assert_eq!(
            junk.classify("Weather is sunny today"),
            Some(JunkCategory::RealTimeData)
        );
        assert_eq!(junk.classify("今天股价涨了"), Some(JunkCategory::RealTimeData));
    }

    #[test]
    fn test_news_and_greetings() {
        let junk = JunkClassifier::new();
        assert_eq!(
            junk.classify("Read the news about the election"),
            Some(JunkCategory::News)
        );
        assert_eq!(junk.classify("User said hello"), Some(JunkCategory::Greeting));
        assert_eq!(junk.classify("用户跟我打招呼"), Some(JunkCategory::Greeting));
        assert_eq!(junk.classify("今天刷了热搜"), Some(JunkCategory::News));
    }

    #[test]
    fn test_meta_conversation() {
        let junk = JunkClassifier::new();
        assert_eq!(
            junk.classify("Asked the AI about its name"),
            Some(JunkCategory::MetaConversation)
        );
        assert_eq!(
            junk.classify("Enjoys chatting with the assistant"),
            Some(JunkCategory::MetaConversation)
        );
        assert_eq!(junk.classify("喜欢和AI聊天"), Some(JunkCategory::MetaConversation));
        assert_eq!(
            junk.classify("The assistant said it was tired"),
            Some(JunkCategory::MetaConversation)
        );
    }

    #[test]
    fn test_durable_facts_pass() {
        let junk = JunkClassifier::new();
        for fact in [
            "Has a golden retriever named Max",
            "Works as a nurse in Chengdu",
            "Birthday is March 3rd",
            "Prefers tea over coffee",
            "养了一只叫豆豆的猫",
            "Training for a marathon in May",
            "Works at an AI startup",
            "喜欢和朋友聊天",
            "Works as a news anchor",
            "Father is a weather forecaster",
            "在股票公司工作",
            "喜欢下雨天",
            "Has 2 degrees in physics",
            "是一名医生助手",
            "Builds chatbot products for banks",
        ] {
            assert!(!junk.is_junk(fact), "{fact} should not be junk");
        }
    }

    #[test]
    fn test_extensible() {
        let junk = JunkClassifier::empty();
        assert!(!junk.is_junk("Lottery numbers drawn tonight"));

        let junk = junk.with_rule(JunkRule::new(JunkCategory::News, r"(?i)\blottery\b"));
        assert_eq!(
            junk.classify("Lottery numbers drawn tonight"),
            Some(JunkCategory::News)
        );
    }
}
