//! 每页输出包：脱敏后的图片 + 被脱敏的文本

use crate::cache::PageImageCache;
use crate::{CoreError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 同一页多段脱敏文本之间的分隔符
pub const TEXT_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBundle {
    pub page_index: String,
    pub redacted_data: String,
    /// base64 编码的 PNG
    pub image: String,
}

/// 累积每页的脱敏文本，最后与缓存中的图片组装成输出包
#[derive(Debug, Default)]
pub struct PageBundleBuilder {
    texts: HashMap<String, Vec<String>>,
}

impl PageBundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按筛选顺序记录一段被脱敏的文本
    pub fn record(&mut self, page_index: &str, text: &str) {
        self.texts
            .entry(page_index.to_string())
            .or_default()
            .push(text.to_string());
    }

    pub fn redacted_data(&self, page_index: &str) -> String {
        self.texts
            .get(page_index)
            .map(|texts| texts.join(TEXT_SEPARATOR))
            .unwrap_or_default()
    }

    /// 缓存中每一页输出一个包，无论是否有脱敏
    ///
    /// 任何一页编码失败都会使整个文档失败，不输出部分结果。
    pub fn build(self, cache: PageImageCache) -> Result<Vec<PageBundle>> {
        let mut bundles = Vec::with_capacity(cache.len());

        for (key, image) in cache.into_pages() {
            let page_index = key.page_index();
            let png = pagemask_render::encode_png(&image).map_err(|source| CoreError::Encode {
                page_index: page_index.to_string(),
                source,
            })?;

            let redacted_data = self.redacted_data(page_index);
            log::debug!(
                "[Bundle] 页面 {}: {} 字节 PNG, {} 段文本",
                page_index,
                png.len(),
                self.texts.get(page_index).map_or(0, Vec::len)
            );

            bundles.push(PageBundle {
                page_index: page_index.to_string(),
                redacted_data,
                image: STANDARD.encode(&png),
            });
        }

        Ok(bundles)
    }
}
