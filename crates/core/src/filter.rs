//! 按条件筛选需要脱敏的预测行

use crate::PredictionRow;
use pagemask_rules::RedactionCriteria;

pub struct PredictionFilter<'c> {
    criteria: &'c RedactionCriteria,
}

impl<'c> PredictionFilter<'c> {
    pub fn new(criteria: &'c RedactionCriteria) -> Self {
        Self { criteria }
    }

    /// 返回命中的行，保持原表顺序
    ///
    /// 标签命中与正则命中取并集，同一行只出现一次。
    /// 不因坐标是否越界而排除任何行。
    pub fn select<'r>(&self, rows: &'r [PredictionRow]) -> Vec<&'r PredictionRow> {
        if self.criteria.is_disabled() {
            return Vec::new();
        }

        let selected: Vec<&PredictionRow> = rows
            .iter()
            .filter(|row| self.criteria.matches(&row.label, row.normalized_text()))
            .collect();

        log::debug!("[Filter] {} / {} 行命中", selected.len(), rows.len());
        selected
    }
}
