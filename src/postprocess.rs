// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/postprocess.rs - 模型输出后处理
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

use tracing::debug;

use crate::{
  config::ClassifierConfig,
  model::{Classification, ClassificationResult, ScoreVector},
};

/// 把原始分数转换成带标签的结果。
///
/// 低于阈值（含 NaN）的条目被丢弃，其余按分数降序稳定排序，
/// 分数相同时保持规范标签顺序，最后截断到 `max_results` 条。
pub fn interpret(scores: &ScoreVector, config: &ClassifierConfig) -> ClassificationResult {
  debug!("后处理模型输出");
  let threshold = config.threshold();

  let mut items: Vec<Classification> = scores
    .labeled()
    .filter(|&(_, score)| score >= threshold)
    .map(|(label, score)| Classification { label, score })
    .collect();

  items.sort_by(|a, b| b.score.total_cmp(&a.score));
  items.truncate(config.max_results());

  debug!("分类结果: {:?}", items);
  ClassificationResult {
    items: items.into_boxed_slice(),
    ..Default::default()
  }
}
