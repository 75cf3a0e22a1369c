// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/model/source.rs - 模型文件来源
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{borrow::Cow, path::PathBuf, sync::Arc};

use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::ModelLoadError, url_to_path};

/// 随程序分发的模型文件名。
pub const DEFAULT_MODEL_FILE: &str = "weather_model.onnx";

/// 模型字节的来源。每次加载都会重新读取，`close` 之后可以再次加载。
#[derive(Debug, Clone)]
pub enum ModelSource {
  File(PathBuf),
  Memory(Arc<[u8]>),
}

impl Default for ModelSource {
  fn default() -> Self {
    ModelSource::File(PathBuf::from(DEFAULT_MODEL_FILE))
  }
}

impl From<PathBuf> for ModelSource {
  fn from(path: PathBuf) -> Self {
    ModelSource::File(path)
  }
}

impl From<Vec<u8>> for ModelSource {
  fn from(bytes: Vec<u8>) -> Self {
    ModelSource::Memory(bytes.into())
  }
}

impl FromUrlWithScheme for ModelSource {
  const SCHEME: &'static str = "file";
}

impl FromUrl for ModelSource {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "模型路径方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ModelLoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = url_to_path(url);
    if path.as_os_str().is_empty() || url.path() == "/" {
      return Err(ModelLoadError::ModelPathError(format!(
        "模型路径为空: {}",
        url
      )));
    }

    Ok(ModelSource::File(path))
  }
}

impl ModelSource {
  pub fn read(&self) -> Result<Cow<'_, [u8]>, ModelLoadError> {
    match self {
      ModelSource::File(path) => {
        info!("加载模型文件: {}", path.display());
        let data = std::fs::read(path)?;
        debug!(
          "模型文件大小: {:.2} MB",
          data.len() as f64 / (1024.0 * 1024.0)
        );
        Ok(Cow::Owned(data))
      }
      ModelSource::Memory(bytes) => {
        debug!("使用内存中的模型数据: {} 字节", bytes.len());
        Ok(Cow::Borrowed(&bytes[..]))
      }
    }
  }
}
