use pagemask_core::{CriteriaConfig, MergeOptions, ProcessorConfig};
use pagemask_verify::VerifyOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    // ============ 脱敏条件 ============
    /// 需要脱敏的模型标签，必须是模型的类别标签
    pub labels: Option<Vec<String>>,
    /// 需要脱敏的文本正则，例如 `^\d{3} \d{3} \d{3}$`
    pub patterns: Option<Vec<String>>,

    // ============ 页面图片 ============
    /// 页面图片目录
    pub resource_dir: Option<PathBuf>,
    /// 页面图片扩展名，默认 `.png`
    pub image_extension: Option<String>,
    /// 参考 DPI
    pub reference_dpi: Option<u32>,
    /// 是否有标注模型
    pub labelling_model: Option<bool>,

    // ============ 其他 ============
    pub merge: Option<MergeOptions>,
    pub verify: Option<VerifyOptions>,
}

impl AppConfig {
    pub fn criteria(&self) -> CriteriaConfig {
        CriteriaConfig {
            labels: self.labels.clone(),
            patterns: self.patterns.clone(),
        }
    }

    pub fn processor(&self) -> ProcessorConfig {
        let defaults = ProcessorConfig::default();
        ProcessorConfig {
            resource_dir: self.resource_dir.clone().unwrap_or(defaults.resource_dir),
            image_extension: self
                .image_extension
                .clone()
                .unwrap_or(defaults.image_extension),
            reference_dpi: self.reference_dpi.unwrap_or(defaults.reference_dpi),
            labelling_model: self.labelling_model.unwrap_or(defaults.labelling_model),
            merge: self.merge.clone().unwrap_or(defaults.merge),
        }
    }

    pub fn verify_options(&self) -> VerifyOptions {
        self.verify.clone().unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 未指定 `--config` 时查找的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "pagemask.json";

/// 读取显式指定的配置文件，文件不存在即报错
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// 读取隐式配置文件，不存在时使用默认配置（不脱敏任何内容）
pub fn load_config_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        log::info!("[Config] {} 不存在，使用默认配置", path.display());
        return Ok(AppConfig::default());
    }
    load_config(path)
}
