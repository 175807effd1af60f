//! Token 合并引擎接口
//!
//! 合并引擎本身在外部实现，这里只定义它的调用方式和参数。

use crate::{PredictionRow, Result};
use serde::{Deserialize, Serialize};

/// 一个文档的合并结果
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPredictions {
    pub doc_id: String,
    pub rows: Vec<PredictionRow>,
}

/// 合并参数，原样传给外部引擎
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeOptions {
    pub token_merge_type: String,
    pub token_merge_xdist_regular: f64,
    pub label_merge_x_regular: String,
    pub token_merge_xydist_regular: f64,
    pub label_merge_xy_regular: String,
    pub token_merge_xdist_wide: f64,
    pub label_merge_x_wide: String,
    pub output_labels: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            token_merge_type: "MIXED_MERGE".to_string(),
            token_merge_xdist_regular: 1.0,
            label_merge_x_regular: "ALL".to_string(),
            token_merge_xydist_regular: 1.0,
            label_merge_xy_regular: "address".to_string(),
            token_merge_xdist_wide: 1.5,
            label_merge_x_wide: "phone|fax".to_string(),
            output_labels: "INCLUDE_O".to_string(),
        }
    }
}

/// 把原始 token 预测合并为字段级预测行
pub trait MergeEngine {
    type Document;

    /// 返回按文档分组的合并结果
    fn merge(
        &self,
        doc: &Self::Document,
        doc_id: &str,
        options: &MergeOptions,
    ) -> Result<Vec<DocumentPredictions>>;
}

/// 输入已经是合并后的预测行，只做分组
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedMerge;

impl PrecomputedMerge {
    /// 解析 JSON 数组形式的预测行
    pub fn rows_from_json(raw: &str) -> Result<Vec<PredictionRow>> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl MergeEngine for PrecomputedMerge {
    type Document = Vec<PredictionRow>;

    /// 按 `doc_id` 首次出现的顺序分组；缺少 `doc_id` 的行归入 `doc_id` 参数
    fn merge(
        &self,
        doc: &Self::Document,
        doc_id: &str,
        _options: &MergeOptions,
    ) -> Result<Vec<DocumentPredictions>> {
        let mut groups: Vec<DocumentPredictions> = Vec::new();

        for row in doc {
            let mut row = row.clone();
            if row.doc_id.is_empty() {
                row.doc_id = doc_id.to_string();
            }

            match groups.iter_mut().find(|g| g.doc_id == row.doc_id) {
                Some(group) => group.rows.push(row),
                None => groups.push(DocumentPredictions {
                    doc_id: row.doc_id.clone(),
                    rows: vec![row],
                }),
            }
        }

        Ok(groups)
    }
}
