use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 待核验的证件号
///
/// 不透明的字符串，既是工作单元也是幂等键。读入后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// 从原始输入创建，去掉所有空白（证件号里不会有空格）；空串返回 `None`
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let compact: String = raw.as_ref().split_whitespace().collect();
        if compact.is_empty() {
            None
        } else {
            Some(Self(compact))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 本轮还需要处理的证件号
///
/// 保持输入源的顺序，重复项只保留第一次出现。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    items: Vec<Identifier>,
}

impl PendingSet {
    /// 从全部证件号中去掉已完成的部分
    pub fn compute(all: Vec<Identifier>, completed: &HashSet<Identifier>) -> Self {
        let mut seen = HashSet::new();
        let items = all
            .into_iter()
            .filter(|id| !completed.contains(id))
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { items }
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.items.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Identifier> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<Identifier> {
        raw.iter().filter_map(Identifier::new).collect()
    }

    #[test]
    fn test_identifier_trims_and_rejects_blank() {
        assert_eq!(Identifier::new("  8001015009087 ").unwrap().as_str(), "8001015009087");
        assert!(Identifier::new("   ").is_none());
        assert!(Identifier::new("").is_none());
    }

    #[test]
    fn test_identifier_drops_inner_whitespace() {
        assert_eq!(Identifier::new("800101 5009087").unwrap().as_str(), "8001015009087");
        assert_eq!(Identifier::new("800101\n\t5009087").unwrap().as_str(), "8001015009087");
    }

    #[test]
    fn test_pending_set_keeps_order_and_drops_completed() {
        let completed: HashSet<Identifier> = ids(&["B"]).into_iter().collect();
        let pending = PendingSet::compute(ids(&["C", "A", "B", "A"]), &completed);

        assert_eq!(pending.to_vec(), ids(&["C", "A"]));
        assert!(!pending.contains(&Identifier::new("B").unwrap()));
    }
}
