//! 页面键与页面图片文件名推导
//!
//! 页面图片按 `{文档名}+{页号}{扩展名}` 命名。加载图片和输出
//! `pageIndex` 都只通过 [`PageKey`] 推导，不再各自拆字符串。

use crate::{CoreError, PredictionRow, Result};

/// 文档名与页号之间的分隔符，两者都不允许包含它
pub const SEPARATOR: char = '+';

/// 多页容器文档的标记：带此标记的文档名原样保留
const CONTAINER_MARKER: &str = ".pdf";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    doc_id: String,
    page_id: String,
}

impl PageKey {
    pub fn new(doc_id: impl Into<String>, page_id: impl Into<String>) -> Result<Self> {
        let doc_id = doc_id.into();
        let page_id = page_id.into();
        if doc_id.contains(SEPARATOR) || page_id.contains(SEPARATOR) {
            return Err(CoreError::InvalidPageKey { doc_id, page_id });
        }
        Ok(Self { doc_id, page_id })
    }

    pub fn for_row(row: &PredictionRow) -> Result<Self> {
        Self::new(row.doc_id.as_str(), row.page_id.as_str())
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// 输出中的 `pageIndex`
    pub fn page_index(&self) -> &str {
        &self.page_id
    }

    /// 资源目录下页面图片的文件名
    ///
    /// - 文档名含 `.pdf`：`{doc_id}+{page_id}{ext}`
    /// - 否则先去掉文档名自身的扩展名：`{stem}+{page_id}{ext}`
    pub fn file_name(&self, extension: &str) -> String {
        let prefix = if self.doc_id.contains(CONTAINER_MARKER) {
            self.doc_id.as_str()
        } else {
            strip_extension(&self.doc_id)
        };
        format!("{prefix}{SEPARATOR}{}{extension}", self.page_id)
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.doc_id, self.page_id)
    }
}

/// 去掉最后一个路径分量的扩展名
///
/// `.bashrc` 这类只有前导点的名字不算扩展名。
fn strip_extension(name: &str) -> &str {
    let Some(dot) = name.rfind('.') else {
        return name;
    };
    let start = name.rfind('/').map_or(0, |sep| sep + 1);
    if dot <= start {
        return name;
    }
    if name[start..dot].bytes().all(|b| b == b'.') {
        return name;
    }
    &name[..dot]
}
