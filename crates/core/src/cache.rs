//! 页面图片缓存
//!
//! 每个文档一份缓存：预测表里出现过的每一页都尝试加载一次，
//! 加载失败的页面直接缺席，不报错。

use crate::{PageKey, PredictionRow, Result};
use image::RgbImage;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;

/// 页面图片字节的来源
pub trait PageSource {
    fn read(&self, file_name: &str) -> io::Result<Vec<u8>>;
}

/// 从资源目录读取 `{root}/{file_name}`
#[derive(Debug, Clone)]
pub struct FsPageSource {
    root: PathBuf,
}

impl FsPageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PageSource for FsPageSource {
    fn read(&self, file_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(file_name))
    }
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn read(&self, file_name: &str) -> io::Result<Vec<u8>> {
        (**self).read(file_name)
    }
}

pub struct PageImageCache {
    extension: String,
    /// 首次引用顺序
    pages: Vec<(PageKey, RgbImage)>,
    index: HashMap<PageKey, usize>,
    /// 已尝试过的页面（包括失败的），每页只读一次
    attempted: HashSet<PageKey>,
}

impl PageImageCache {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            pages: Vec::new(),
            index: HashMap::new(),
            attempted: HashSet::new(),
        }
    }

    /// 加载预测表中引用到的所有页面
    ///
    /// 必须传入完整的预测表，而不是筛选后的子集：
    /// 没有命中任何条件的页面同样要输出。
    pub fn preload<S: PageSource>(&mut self, source: &S, rows: &[PredictionRow]) -> Result<()> {
        for row in rows {
            let key = PageKey::for_row(row)?;
            self.load(source, key);
        }
        log::info!(
            "[Cache] 已加载 {} 页，尝试 {} 页",
            self.pages.len(),
            self.attempted.len()
        );
        Ok(())
    }

    fn load<S: PageSource>(&mut self, source: &S, key: PageKey) {
        if self.attempted.contains(&key) {
            return;
        }
        self.attempted.insert(key.clone());

        let file_name = key.file_name(&self.extension);
        let bytes = match source.read(&file_name) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[Cache] 无法读取页面图片 {}: {}", file_name, e);
                return;
            }
        };

        match pagemask_render::decode_page(&bytes) {
            Ok(image) => {
                log::debug!(
                    "[Cache] {} -> {}x{}",
                    file_name,
                    image.width(),
                    image.height()
                );
                self.index.insert(key.clone(), self.pages.len());
                self.pages.push((key, image));
            }
            Err(e) => {
                log::warn!("[Cache] 无法解码页面图片 {}: {}", file_name, e);
            }
        }
    }

    pub fn get_mut(&mut self, key: &PageKey) -> Option<&mut RgbImage> {
        let i = *self.index.get(key)?;
        Some(&mut self.pages[i].1)
    }

    pub fn contains(&self, key: &PageKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PageKey> {
        self.pages.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 按首次引用顺序取出所有页面，缓存随之销毁
    pub fn into_pages(self) -> impl Iterator<Item = (PageKey, RgbImage)> {
        self.pages.into_iter()
    }
}
