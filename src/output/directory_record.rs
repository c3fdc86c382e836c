// 该文件是 Huolong （火龙） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};

use crate::engine::AnalysisResult;
use crate::output::Render;
use crate::output::draw::{draw_bbox, draw_detections};
use crate::{FromUrl, FromUrlWithScheme};

const SEGMENTATION_COLOR: [u8; 3] = [255, 255, 255];

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// `folder:///records`：按 `年/月/日` 保存标注图与 JSON 结果
///
/// - `?raw` 保存原图而非标注图
/// - `?always` 无效结果也保存
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  raw: bool,
  always: bool,
  counter: Mutex<u16>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      error!("URI 方案不匹配: 期望 '{}'，实际 '{}'", Self::SCHEME, uri.scheme());
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }
    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      raw: uri.query_pairs().any(|(k, _)| k == "raw"),
      always: uri.query_pairs().any(|(k, _)| k == "always"),
      counter: Mutex::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn record_id(&self) -> u16 {
    let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
    *counter = counter.wrapping_add(1);
    *counter
  }

  /// 不带扩展名的记录路径
  fn record_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;
    Ok(directory.join(format!("{}-{:04X}", now.format("%H-%M-%S"), self.record_id())))
  }

  fn annotate(&self, frame: &RgbImage, result: &AnalysisResult) -> RgbImage {
    let mut image = frame.clone();
    if !self.raw {
      draw_detections(&mut image, &result.detections, &result.disease_detections);
      draw_bbox(&mut image, &result.segmentation_bbox, SEGMENTATION_COLOR);
    }
    image
  }
}

impl Render<RgbImage, AnalysisResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &AnalysisResult) -> Result<(), Self::Error> {
    if !self.always && !result.is_valid_fruit {
      debug!("结果 {} 无效，不保存", result.id);
      return Ok(());
    }
    let path = self.record_path()?;
    self.annotate(frame, result).save(path.with_extension("png"))?;
    std::fs::write(path.with_extension("json"), serde_json::to_vec_pretty(result)?)?;
    debug!("结果 {} 已保存到 {}", result.id, path.display());
    Ok(())
  }
}
