// 该文件是 Huolong （火龙） 项目的一部分。
// src/input.rs - 输入定义
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

use image::RgbImage;
use thiserror::Error;
use tracing::warn;

use crate::{FromUrl, FromUrlWithScheme};
use crate::detection::{Detection, load_detections};
use crate::engine::ScanRequest;

mod directory;
mod read_image_file;

pub use self::directory::{DirectoryInput, DirectoryInputError};
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, load_image};

/// 一幅待分析的图像及其扫描参数
#[derive(Debug, Clone)]
pub struct ScanInput {
  pub path: PathBuf,
  pub image: RgbImage,
  pub request: ScanRequest,
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("目录输入错误: {0}")]
  DirectoryInputError(#[from] DirectoryInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// URL 查询参数中的扫描选项：`batch`、`lat`、`lon`、`trusted`
pub fn request_from_query(url: &url::Url) -> ScanRequest {
  let mut request = ScanRequest::default();
  for (k, v) in url.query_pairs() {
    match k.as_ref() {
      "batch" if !v.is_empty() => request.batch_id = Some(v.into_owned()),
      "lat" => request.lat = v.parse().ok(),
      "lon" => request.lon = v.parse().ok(),
      "trusted" => request.trusted = v.is_empty() || v == "1" || v == "true",
      _ => {}
    }
  }
  request
}

/// 图像旁的检测文件：`<stem>.<kind>.json`
pub fn sidecar_detections(image_path: &Path, kind: &str) -> Option<Vec<Detection>> {
  let path = image_path.with_extension(format!("{kind}.json"));
  if !path.exists() {
    return None;
  }
  match load_detections(&path) {
    Ok(detections) => Some(detections),
    Err(e) => {
      warn!("检测文件 {} 读取失败，忽略: {}", path.display(), e);
      None
    }
  }
}

/// 补全旁路检测后的扫描参数
pub(crate) fn request_for(image_path: &Path, template: &ScanRequest) -> ScanRequest {
  ScanRequest {
    fruit_detections: sidecar_detections(image_path, "fruit"),
    disease_detections: sidecar_detections(image_path, "disease"),
    ..template.clone()
  }
}

pub enum InputWrapper {
  ImageFile(ImageFileInput),
  Directory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?)),
      DirectoryInput::SCHEME => Ok(InputWrapper::Directory(DirectoryInput::from_url(url)?)),
      _ => {
        warn!("不支持的输入: {}", url);
        Err(InputError::SchemeMismatch)
      }
    }
  }
}

pub enum InputWrapperIter {
  ImageFile(std::option::IntoIter<ScanInput>),
  Directory(self::directory::DirectoryInputIter),
}

impl IntoIterator for InputWrapper {
  type Item = ScanInput;
  type IntoIter = InputWrapperIter;

  fn into_iter(self) -> Self::IntoIter {
    match self {
      InputWrapper::ImageFile(input) => InputWrapperIter::ImageFile(input.into_iter()),
      InputWrapper::Directory(input) => InputWrapperIter::Directory(input.into_iter()),
    }
  }
}

impl Iterator for InputWrapperIter {
  type Item = ScanInput;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapperIter::ImageFile(iter) => iter.next(),
      InputWrapperIter::Directory(iter) => iter.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_sets_scan_options() {
    let url = url::Url::parse("folder:///tmp/in?batch=b7&trusted&lat=14.5&lon=x").unwrap();
    let request = request_from_query(&url);
    assert_eq!(request.batch_id.as_deref(), Some("b7"));
    assert!(request.trusted);
    assert_eq!(request.lat, Some(14.5));
    assert_eq!(request.lon, None);
  }

  #[test]
  fn wrapper_dispatches_on_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    assert!(matches!(InputWrapper::from_url(&url), Ok(InputWrapper::Directory(_))));

    let rtsp = url::Url::parse("rtsp://127.0.0.1/cam").unwrap();
    assert!(matches!(InputWrapper::from_url(&rtsp), Err(InputError::SchemeMismatch)));
  }

  #[test]
  fn sidecar_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("a.png");
    assert!(sidecar_detections(&image, "fruit").is_none());
    std::fs::write(
      dir.path().join("a.fruit.json"),
      r#"[{"x0":1,"y0":2,"x1":30,"y1":40,"conf":0.8,"cls":0}]"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("a.disease.json"), "not json").unwrap();
    let request = request_for(&image, &ScanRequest::default());
    assert_eq!(request.fruit_detections.map(|d| d.len()), Some(1));
    assert!(request.disease_detections.is_none());
  }
}
