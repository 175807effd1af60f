//! Core orchestration for page redaction.
//!
//! 从合并后的预测行出发：预加载页面图片、按条件筛选行、
//! 在图片上涂黑对应区域，最后每页输出一个 [`PageBundle`]。

pub mod bundle;
pub mod cache;
pub mod filter;
pub mod merge;
pub mod page_key;
pub mod prediction;
pub mod processor;

pub use bundle::{PageBundle, PageBundleBuilder, TEXT_SEPARATOR};
pub use cache::{FsPageSource, PageImageCache, PageSource};
pub use filter::PredictionFilter;
pub use merge::{DocumentPredictions, MergeEngine, MergeOptions, PrecomputedMerge};
pub use page_key::PageKey;
pub use prediction::PredictionRow;
pub use processor::{
    AppliedRedaction, DocumentReport, PostProcessor, ProcessorConfig, RedactionPostProcessor,
};

pub use pagemask_render::Region;
pub use pagemask_rules::{CriteriaConfig, RedactionCriteria, RulesError};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid page key: doc_id {doc_id:?} / page_id {page_id:?} must not contain '+'")]
    InvalidPageKey { doc_id: String, page_id: String },
    #[error("page {page_id} of {doc_id} was never loaded into the image cache")]
    MissingPage { doc_id: String, page_id: String },
    #[error("failed to encode page {page_index}: {source}")]
    Encode {
        page_index: String,
        #[source]
        source: image::ImageError,
    },
    #[error("merge engine failed: {0}")]
    Merge(String),
    #[error("invalid predictions: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Rules(#[from] RulesError),
}
