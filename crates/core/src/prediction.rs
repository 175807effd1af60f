//! 合并后的预测行

use pagemask_render::Region;
use serde::{Deserialize, Deserializer, Serialize};

/// 一条识别出的文本片段（token 合并之后）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub label: String,
    pub text: String,
    #[serde(deserialize_with = "pixel")]
    pub xmin: i32,
    #[serde(deserialize_with = "pixel")]
    pub ymin: i32,
    #[serde(deserialize_with = "pixel")]
    pub xmax: i32,
    #[serde(deserialize_with = "pixel")]
    pub ymax: i32,
    #[serde(deserialize_with = "string_or_number")]
    pub page_id: String,
    #[serde(default)]
    pub doc_id: String,
    /// 文档内唯一；输入中缺省时由 [`assign_ids`] 补齐
    #[serde(default)]
    pub id: String,
}

impl PredictionRow {
    pub fn region(&self) -> Region {
        Region::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }

    /// 去掉首尾空白后的文本，匹配和拼接都使用它
    pub fn normalized_text(&self) -> &str {
        self.text.trim()
    }
}

/// 就地去掉每行文本的首尾空白
pub fn normalize_rows(rows: &mut [PredictionRow]) {
    for row in rows.iter_mut() {
        let trimmed = row.text.trim();
        if trimmed.len() != row.text.len() {
            row.text = trimmed.to_string();
        }
    }
}

/// 为没有 id 的行分配 UUID v4
pub fn assign_ids(rows: &mut [PredictionRow]) {
    for row in rows.iter_mut().filter(|row| row.id.is_empty()) {
        row.id = uuid::Uuid::new_v4().to_string();
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
    Float(f64),
}

/// 整数或浮点坐标，浮点向零截断，超出 i32 的值饱和
fn pixel<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(v) => v,
        RawNumber::Float(v) if v.is_finite() => v.trunc() as i64,
        RawNumber::Float(v) => {
            return Err(serde::de::Error::custom(format!(
                "coordinate must be finite, got {v}"
            )))
        }
    };
    Ok(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Int(v) => v.to_string(),
        RawId::Float(v) if v.fract() == 0.0 && v.is_finite() => (v as i64).to_string(),
        RawId::Float(v) => v.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn row(doc_id: &str, page_id: &str, label: &str, text: &str, bbox: [i32; 4]) -> PredictionRow {
    PredictionRow {
        label: label.to_string(),
        text: text.to_string(),
        xmin: bbox[0],
        ymin: bbox[1],
        xmax: bbox[2],
        ymax: bbox[3],
        page_id: page_id.to_string(),
        doc_id: doc_id.to_string(),
        id: String::new(),
    }
}
