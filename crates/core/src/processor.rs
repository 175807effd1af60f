//! 脱敏后处理器：串起缓存、筛选、涂黑和输出
//!
//! 每个文档独立处理，缓存和文本累积都只属于这一次调用。

use crate::bundle::{PageBundle, PageBundleBuilder};
use crate::cache::{FsPageSource, PageImageCache, PageSource};
use crate::filter::PredictionFilter;
use crate::merge::{MergeEngine, MergeOptions};
use crate::prediction::{assign_ids, normalize_rows};
use crate::{CoreError, PageKey, PredictionRow, Result};
use pagemask_render::{redact_region, Region};
use pagemask_rules::{CriteriaConfig, RedactionCriteria};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 宿主框架调用的后处理器接口
pub trait PostProcessor {
    type Document;

    /// 客户端分辨率，`None` 表示不做换算
    fn resolve_client_config(&self) -> Option<u32> {
        None
    }

    /// 预测坐标所基于的参考 DPI
    fn resolve_reference_dpi(&self) -> u32;

    /// 提取实体：每页一个输出包
    fn extract_entities(&self, doc: &Self::Document, doc_id: &str) -> Result<Vec<PageBundle>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessorConfig {
    /// 页面图片所在目录
    pub resource_dir: PathBuf,
    /// 页面图片扩展名（含点）
    pub image_extension: String,
    pub reference_dpi: u32,
    /// 没有标注模型时不输出任何实体
    pub labelling_model: bool,
    pub merge: MergeOptions,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("."),
            image_extension: ".png".to_string(),
            reference_dpi: 300,
            labelling_model: true,
            merge: MergeOptions::default(),
        }
    }
}

/// 一次实际执行的涂黑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRedaction {
    pub page_index: String,
    pub region: Region,
}

/// 单个文档的处理结果
#[derive(Debug, Clone, Default)]
pub struct DocumentReport {
    pub bundles: Vec<PageBundle>,
    pub redactions: Vec<AppliedRedaction>,
}

pub struct RedactionPostProcessor<M, S> {
    config: ProcessorConfig,
    criteria: RedactionCriteria,
    engine: M,
    source: S,
}

impl<M: MergeEngine> RedactionPostProcessor<M, FsPageSource> {
    /// 从资源目录读取页面图片；正则在这里编译，无效时立即失败
    pub fn from_config(
        config: ProcessorConfig,
        criteria: &CriteriaConfig,
        engine: M,
    ) -> Result<Self> {
        let criteria = criteria.compile()?;
        let source = FsPageSource::new(config.resource_dir.clone());
        Ok(Self::new(config, criteria, engine, source))
    }
}

impl<M, S> RedactionPostProcessor<M, S>
where
    M: MergeEngine,
    S: PageSource,
{
    pub fn new(config: ProcessorConfig, criteria: RedactionCriteria, engine: M, source: S) -> Self {
        Self {
            config,
            criteria,
            engine,
            source,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// 处理一个文档的全部预测行
    pub fn process_document(&self, mut rows: Vec<PredictionRow>) -> Result<DocumentReport> {
        if rows.is_empty() {
            return Ok(DocumentReport::default());
        }

        normalize_rows(&mut rows);
        assign_ids(&mut rows);

        // 先按完整预测表加载页面，筛选之后才涂黑
        let mut cache = PageImageCache::new(self.config.image_extension.as_str());
        cache.preload(&self.source, &rows)?;

        let selected = PredictionFilter::new(&self.criteria).select(&rows);
        let mut builder = PageBundleBuilder::new();
        let mut redactions = Vec::with_capacity(selected.len());

        for row in selected {
            let key = PageKey::for_row(row)?;
            // 命中行的页面必须已在缓存中，否则整个文档失败
            let Some(image) = cache.get_mut(&key) else {
                log::error!("[Redact] 页面 {} 不在缓存中，行 {} 无法脱敏", key, row.id);
                return Err(CoreError::MissingPage {
                    doc_id: key.doc_id().to_string(),
                    page_id: key.page_id().to_string(),
                });
            };

            let region = row.region();
            redact_region(image, region);
            builder.record(key.page_index(), row.normalized_text());
            redactions.push(AppliedRedaction {
                page_index: key.page_index().to_string(),
                region,
            });
        }

        let bundles = builder.build(cache)?;
        log::info!(
            "[Redact] 文档处理完成: {} 页, {} 处脱敏",
            bundles.len(),
            redactions.len()
        );

        Ok(DocumentReport {
            bundles,
            redactions,
        })
    }

    /// 合并后逐个文档处理，返回所有文档的报告
    pub fn process(&self, doc: &M::Document, doc_id: &str) -> Result<Vec<DocumentReport>> {
        if !self.config.labelling_model {
            log::info!("[Redact] 未配置标注模型，跳过 {}", doc_id);
            return Ok(Vec::new());
        }

        let groups = self.engine.merge(doc, doc_id, &self.config.merge)?;
        groups
            .into_iter()
            .map(|group| {
                log::info!("[Redact] 处理文档 {} ({} 行)", group.doc_id, group.rows.len());
                self.process_document(group.rows)
            })
            .collect()
    }
}

impl<M, S> PostProcessor for RedactionPostProcessor<M, S>
where
    M: MergeEngine,
    S: PageSource,
{
    type Document = M::Document;

    fn resolve_reference_dpi(&self) -> u32 {
        self.config.reference_dpi
    }

    fn extract_entities(&self, doc: &Self::Document, doc_id: &str) -> Result<Vec<PageBundle>> {
        Ok(self
            .process(doc, doc_id)?
            .into_iter()
            .flat_map(|report| report.bundles)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{blank, MemorySource};
    use crate::merge::{DocumentPredictions, PrecomputedMerge};
    use crate::prediction::row;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use image::{Rgb, RgbImage};
    use pagemask_render::FILL;

    fn criteria(labels: Option<&[&str]>, patterns: Option<&[&str]>) -> RedactionCriteria {
        CriteriaConfig {
            labels: labels.map(|l| l.iter().map(|s| s.to_string()).collect()),
            patterns: patterns.map(|p| p.iter().map(|s| s.to_string()).collect()),
        }
        .compile()
        .unwrap()
    }

    fn processor(
        criteria: RedactionCriteria,
        source: MemorySource,
    ) -> RedactionPostProcessor<PrecomputedMerge, MemorySource> {
        RedactionPostProcessor::new(ProcessorConfig::default(), criteria, PrecomputedMerge, source)
    }

    fn decode(bundle: &PageBundle) -> RgbImage {
        let png = STANDARD.decode(&bundle.image).unwrap();
        pagemask_render::decode_page(&png).unwrap()
    }

    fn all_fill(img: &RgbImage, xs: std::ops::RangeInclusive<u32>, ys: std::ops::RangeInclusive<u32>) -> bool {
        ys.clone()
            .all(|y| xs.clone().all(|x| *img.get_pixel(x, y) == FILL))
    }

    /// 带点纹理的页面，保证"未改动"检查有意义
    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 251) as u8 + 1, (y * 13 % 251) as u8 + 1, 200])
        })
    }

    #[test]
    fn test_anchored_pattern_redacts_only_match() {
        let page = textured(120, 20);
        let source = MemorySource::default().with_page("doc+1.png", &page);
        let p = processor(criteria(None, Some(&[r"^\d{3} \d{3} \d{3}$"])), source);

        let rows = vec![
            row("doc.tif", "1", "O", "123 456 789", [0, 0, 50, 10]),
            row("doc.tif", "1", "O", "hello", [60, 0, 100, 10]),
        ];
        let report = p.process_document(rows).unwrap();

        assert_eq!(report.bundles.len(), 1);
        let bundle = &report.bundles[0];
        assert_eq!(bundle.page_index, "1");
        assert_eq!(bundle.redacted_data, "123 456 789");

        let out = decode(bundle);
        assert!(all_fill(&out, 0..=50, 0..=10));
        for y in 0..=10 {
            for x in 60..=100 {
                assert_eq!(out.get_pixel(x, y), page.get_pixel(x, y));
            }
        }
        assert_eq!(report.redactions.len(), 1);
    }

    #[test]
    fn test_disabled_criteria_emits_untouched_pages() {
        let page1 = textured(30, 30);
        let page2 = textured(40, 20);
        let source = MemorySource::default()
            .with_page("doc.pdf+1.png", &page1)
            .with_page("doc.pdf+2.png", &page2);
        let p = processor(RedactionCriteria::disabled(), source);

        let rows = vec![
            row("doc.pdf", "1", "ssn", "123 456 789", [0, 0, 10, 10]),
            row("doc.pdf", "2", "ssn", "987 654 321", [0, 0, 10, 10]),
        ];
        let report = p.process_document(rows).unwrap();

        assert_eq!(report.bundles.len(), 2);
        assert!(report.bundles.iter().all(|b| b.redacted_data.is_empty()));
        assert_eq!(decode(&report.bundles[0]), page1);
        assert_eq!(decode(&report.bundles[1]), page2);
        assert!(report.redactions.is_empty());
    }

    #[test]
    fn test_pages_are_independent() {
        let source = MemorySource::default()
            .with_page("doc.pdf+1.png", &blank(60, 20))
            .with_page("doc.pdf+2.png", &blank(60, 20));
        let p = processor(criteria(None, Some(&[r"\b\d{9}\b"])), source);

        let rows = vec![
            row("doc.pdf", "1", "O", "111222333", [0, 0, 20, 5]),
            row("doc.pdf", "2", "O", "444555666", [10, 10, 30, 15]),
            row("doc.pdf", "1", "O", "ref 777888999", [30, 0, 50, 5]),
        ];
        let report = p.process_document(rows).unwrap();

        assert_eq!(report.bundles.len(), 2);
        assert_eq!(report.bundles[0].redacted_data, "111222333 | ref 777888999");
        assert_eq!(report.bundles[1].redacted_data, "444555666");

        let page2 = decode(&report.bundles[1]);
        assert!(all_fill(&page2, 10..=30, 10..=15));
        assert_eq!(*page2.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_unmatched_page_still_emitted() {
        let page2 = textured(20, 20);
        let source = MemorySource::default()
            .with_page("doc+1.png", &blank(20, 20))
            .with_page("doc+2.png", &page2);
        let p = processor(criteria(Some(&["ssn"]), None), source);

        let rows = vec![
            row("doc.png", "1", "ssn", "secret", [0, 0, 5, 5]),
            row("doc.png", "2", "O", "public", [0, 0, 5, 5]),
        ];
        let report = p.process_document(rows).unwrap();

        assert_eq!(report.bundles.len(), 2);
        assert_eq!(report.bundles[1].page_index, "2");
        assert_eq!(report.bundles[1].redacted_data, "");
        assert_eq!(decode(&report.bundles[1]), page2);
    }

    #[test]
    fn test_label_and_pattern_counted_once() {
        let source = MemorySource::default().with_page("doc+1.png", &blank(20, 20));
        let p = processor(criteria(Some(&["ssn"]), Some(&[r"\d{3}"])), source);

        let rows = vec![
            row("doc", "1", "ssn", " 123 ", [0, 0, 5, 5]),
            row("doc", "1", "O", "456", [6, 6, 9, 9]),
        ];
        let report = p.process_document(rows).unwrap();
        assert_eq!(report.bundles[0].redacted_data, "123 | 456");
        assert_eq!(report.redactions.len(), 2);
    }

    #[test]
    fn test_matched_row_on_unloaded_page_fails_document() {
        let source = MemorySource::default().with_page("doc+1.png", &blank(20, 20));
        let p = processor(criteria(Some(&["ssn"]), None), source);

        let rows = vec![
            row("doc", "1", "ssn", "a", [0, 0, 5, 5]),
            row("doc", "2", "ssn", "b", [0, 0, 5, 5]),
        ];
        match p.process_document(rows) {
            Err(CoreError::MissingPage { doc_id, page_id }) => {
                assert_eq!(doc_id, "doc");
                assert_eq!(page_id, "2");
            }
            other => panic!("expected MissingPage, got {:?}", other.map(|r| r.bundles.len())),
        }
    }

    #[test]
    fn test_unmatched_row_on_unloaded_page_is_fine() {
        let source = MemorySource::default().with_page("doc+1.png", &blank(20, 20));
        let p = processor(criteria(Some(&["ssn"]), None), source);

        let rows = vec![
            row("doc", "1", "ssn", "a", [0, 0, 5, 5]),
            row("doc", "2", "O", "b", [0, 0, 5, 5]),
        ];
        let report = p.process_document(rows).unwrap();
        assert_eq!(report.bundles.len(), 1);
        assert_eq!(report.bundles[0].redacted_data, "a");
    }

    #[test]
    fn test_empty_document() {
        let p = processor(criteria(Some(&["ssn"]), None), MemorySource::default());
        let report = p.process_document(Vec::new()).unwrap();
        assert!(report.bundles.is_empty());
    }

    #[test]
    fn test_plus_in_doc_id_is_error() {
        let p = processor(RedactionCriteria::disabled(), MemorySource::default());
        let rows = vec![row("a+b", "1", "O", "x", [0, 0, 1, 1])];
        assert!(matches!(
            p.process_document(rows),
            Err(CoreError::InvalidPageKey { .. })
        ));
    }

    #[test]
    fn test_extract_entities_over_documents() {
        let source = MemorySource::default()
            .with_page("a+1.png", &blank(10, 10))
            .with_page("b.pdf+1.png", &blank(10, 10));
        let p = processor(criteria(Some(&["ssn"]), None), source);

        let rows = vec![
            row("a.jpg", "1", "ssn", "first", [0, 0, 2, 2]),
            row("b.pdf", "1", "ssn", "second", [0, 0, 2, 2]),
        ];
        let bundles = p.extract_entities(&rows, "unused").unwrap();

        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].redacted_data, "first");
        assert_eq!(bundles[1].redacted_data, "second");
        assert_eq!(p.resolve_reference_dpi(), 300);
        assert_eq!(p.resolve_client_config(), None);
    }

    #[test]
    fn test_no_labelling_model_returns_nothing() {
        let source = MemorySource::default().with_page("a+1.png", &blank(10, 10));
        let config = ProcessorConfig {
            labelling_model: false,
            ..ProcessorConfig::default()
        };
        let p = RedactionPostProcessor::new(config, RedactionCriteria::disabled(), PrecomputedMerge, source);
        let rows = vec![row("a", "1", "O", "x", [0, 0, 1, 1])];
        assert!(p.extract_entities(&rows, "a").unwrap().is_empty());
    }

    struct FailingMerge;

    impl MergeEngine for FailingMerge {
        type Document = ();

        fn merge(&self, _: &(), _: &str, _: &MergeOptions) -> Result<Vec<DocumentPredictions>> {
            Err(CoreError::Merge("model unavailable".into()))
        }
    }

    #[test]
    fn test_merge_failure_propagates() {
        let p = RedactionPostProcessor::new(
            ProcessorConfig::default(),
            RedactionCriteria::disabled(),
            FailingMerge,
            MemorySource::default(),
        );
        assert!(matches!(p.extract_entities(&(), "x"), Err(CoreError::Merge(_))));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let criteria = CriteriaConfig {
            labels: None,
            patterns: Some(vec!["[".to_string()]),
        };
        let result =
            RedactionPostProcessor::from_config(ProcessorConfig::default(), &criteria, PrecomputedMerge);
        assert!(matches!(result, Err(CoreError::Rules(_))));
    }
}
