//! Redaction criteria: label allow-list and text patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// 脱敏条件配置（未编译）
///
/// 两部分可以独立关闭：`None` 表示关闭，空列表同样不会命中任何行。
/// 默认全部关闭，即不脱敏任何内容。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CriteriaConfig {
    /// 需要脱敏的模型标签（精确匹配）
    pub labels: Option<Vec<String>>,
    /// 需要脱敏的文本正则
    pub patterns: Option<Vec<String>>,
}

impl CriteriaConfig {
    /// 编译为可用于匹配的条件
    ///
    /// 任何一个正则无效都会立即失败，不会产生部分编译的结果。
    pub fn compile(&self) -> Result<RedactionCriteria, RulesError> {
        let labels = self
            .labels
            .as_ref()
            .map(|labels| labels.iter().cloned().collect::<BTreeSet<_>>());

        let patterns = match &self.patterns {
            Some(patterns) => Some(
                patterns
                    .iter()
                    .map(|pattern| {
                        Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
                            pattern: pattern.clone(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        log::info!(
            "[Rules] 条件已编译: {} 个标签, {} 个正则",
            labels.as_ref().map_or(0, BTreeSet::len),
            patterns.as_ref().map_or(0, Vec::len)
        );

        Ok(RedactionCriteria { labels, patterns })
    }
}

/// 编译后的脱敏条件
#[derive(Debug, Clone, Default)]
pub struct RedactionCriteria {
    labels: Option<BTreeSet<String>>,
    patterns: Option<Vec<Regex>>,
}

impl RedactionCriteria {
    /// 不命中任何内容的条件
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.labels.as_ref().map_or(true, BTreeSet::is_empty)
            && self.patterns.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn matches_label(&self, label: &str) -> bool {
        self.labels
            .as_ref()
            .is_some_and(|labels| labels.contains(label))
    }

    /// 文本中任意位置出现匹配即命中（子串语义，`^`/`$` 可自行锚定）
    ///
    /// 调用方负责先去掉首尾空白。
    pub fn matches_text(&self, text: &str) -> bool {
        self.patterns
            .as_ref()
            .is_some_and(|patterns| patterns.iter().any(|re| re.is_match(text)))
    }

    /// 标签或文本任一命中
    pub fn matches(&self, label: &str, text: &str) -> bool {
        self.matches_label(label) || self.matches_text(text)
    }
}
