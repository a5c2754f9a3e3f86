//! 响应分类服务 - 业务能力层
//!
//! 纯函数：把结果区域里读到的文本映射成结论，不做任何 I/O。
//!
//! 页面只有两种互斥的结果面板：
//! - 否定面板：固定文案（如 "Not a Public Servant"）
//! - 肯定面板：自由文本，通常是 `<部门>: <单位>` 形式，可能带数字编码

use anyhow::Result;
use regex::Regex;

use crate::models::{Category, Identifier, Resolution};

/// 从结果区域读到的原始内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedResponse {
    /// 否定面板的文本（面板存在时为 Some）
    pub negative: Option<String>,
    /// 肯定面板的文本（面板存在时为 Some）
    pub positive: Option<String>,
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Resolved(Resolution),
    /// 两个面板都不存在，调用方按 ResponseNotFound 处理
    NoResultRegion,
}

/// 响应分类器
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    no_match_message: String,
    digits: Regex,
}

impl ResponseClassifier {
    pub fn new(no_match_message: impl Into<String>) -> Result<Self> {
        Ok(Self {
            no_match_message: no_match_message.into(),
            digits: Regex::new(r"\d+")?,
        })
    }

    pub fn classify(&self, identifier: &Identifier, response: &ExtractedResponse) -> Classification {
        if response.negative.is_some() {
            return Classification::Resolved(Resolution {
                category: Category::NoMatch,
                detail: format!("{} - {}", identifier, self.no_match_message),
            });
        }

        match &response.positive {
            Some(text) => Classification::Resolved(Resolution {
                category: Category::MatchFound,
                detail: self.normalize_sector(text),
            }),
            None => Classification::NoResultRegion,
        }
    }

    /// 提取"部门"标签
    ///
    /// 只保留前两个冒号分段，去掉所有数字，再去掉开头的连字符和空白。
    /// 仅数字编码不同的两个标签会被合并成同一个。
    pub fn normalize_sector(&self, text: &str) -> String {
        let text = text.trim();
        let head = match text.match_indices(':').nth(1) {
            Some((second_colon, _)) => &text[..second_colon],
            None => text,
        };

        let stripped = self.digits.replace_all(head, "");
        stripped.trim().trim_start_matches('-').trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ResponseClassifier {
        ResponseClassifier::new("Not a Public Servant").unwrap()
    }

    fn id(raw: &str) -> Identifier {
        Identifier::new(raw).unwrap()
    }

    #[test]
    fn test_negative_panel_is_no_match() {
        let response = ExtractedResponse {
            negative: Some("Not a Public Servant".to_string()),
            positive: None,
        };
        let result = classifier().classify(&id("8001015009087"), &response);
        assert_eq!(
            result,
            Classification::Resolved(Resolution {
                category: Category::NoMatch,
                detail: "8001015009087 - Not a Public Servant".to_string(),
            })
        );
    }

    #[test]
    fn test_negative_panel_wins_over_positive() {
        let response = ExtractedResponse {
            negative: Some(String::new()),
            positive: Some("Health: Nursing".to_string()),
        };
        match classifier().classify(&id("1"), &response) {
            Classification::Resolved(r) => assert_eq!(r.category, Category::NoMatch),
            other => panic!("期望 NoMatch，实际: {:?}", other),
        }
    }

    #[test]
    fn test_positive_panel_strips_digits() {
        let response = ExtractedResponse {
            negative: None,
            positive: Some("Department X: Unit 12".to_string()),
        };
        let result = classifier().classify(&id("1"), &response);
        assert_eq!(
            result,
            Classification::Resolved(Resolution {
                category: Category::MatchFound,
                detail: "Department X: Unit".to_string(),
            })
        );
    }

    #[test]
    fn test_normalize_keeps_first_two_segments_only() {
        let c = classifier();
        assert_eq!(c.normalize_sector("Gauteng: Health: Clinic 7"), "Gauteng: Health");
        assert_eq!(c.normalize_sector("Education"), "Education");
    }

    #[test]
    fn test_normalize_strips_leading_hyphen() {
        let c = classifier();
        assert_eq!(c.normalize_sector("123 - Police Service"), "Police Service");
        assert_eq!(c.normalize_sector("  -- Correctional 4: Services"), "Correctional : Services");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let c = classifier();
        for raw in [
            "Department X: Unit 12",
            "12 - Health: Nursing 3: Ward 9",
            "-Education 2020",
            "Plain",
        ] {
            let once = c.normalize_sector(raw);
            assert_eq!(c.normalize_sector(&once), once, "输入: {}", raw);
        }
    }

    #[test]
    fn test_codes_only_labels_collide() {
        let c = classifier();
        assert_eq!(c.normalize_sector("Health: Unit 1"), c.normalize_sector("Health: Unit 2"));
    }

    #[test]
    fn test_no_panel_is_not_terminal() {
        let result = classifier().classify(&id("1"), &ExtractedResponse::default());
        assert_eq!(result, Classification::NoResultRegion);
    }
}
