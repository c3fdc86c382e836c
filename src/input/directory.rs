// 该文件是 Huolong （火龙） 项目的一部分。
// src/input/directory.rs - 图像目录批量输入
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

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use super::{ScanInput, load_image, request_for, request_from_query};
use crate::engine::ScanRequest;
use crate::{FromUrl, FromUrlWithScheme};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不是目录: {0}")]
  NotADirectory(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

fn is_image(path: &Path) -> bool {
  path.is_file()
    && path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// `folder:///path/to/images?batch=...`，按文件名顺序逐幅读取
pub struct DirectoryInput {
  files: Vec<PathBuf>,
  template: ScanRequest,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!("URI 方案不匹配: 期望 '{}'，实际 '{}'", Self::SCHEME, url.scheme());
      return Err(DirectoryInputError::SchemeMismatch);
    }
    let directory = PathBuf::from(url.path());
    if !directory.is_dir() {
      return Err(DirectoryInputError::NotADirectory(directory));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if is_image(&path) {
        files.push(path);
      }
    }
    files.sort();
    info!("目录 {} 中共有 {} 幅图像", directory.display(), files.len());

    Ok(DirectoryInput {
      files,
      template: request_from_query(url),
    })
  }
}

impl DirectoryInput {
  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

pub struct DirectoryInputIter {
  files: std::vec::IntoIter<PathBuf>,
  template: ScanRequest,
}

impl IntoIterator for DirectoryInput {
  type Item = ScanInput;
  type IntoIter = DirectoryInputIter;

  fn into_iter(self) -> Self::IntoIter {
    DirectoryInputIter {
      files: self.files.into_iter(),
      template: self.template,
    }
  }
}

impl Iterator for DirectoryInputIter {
  type Item = ScanInput;

  /// 无法解码的文件跳过
  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      match load_image(&path) {
        Ok(image) => {
          let request = request_for(&path, &self.template);
          return Some(ScanInput {
            path,
            image,
            request,
          });
        }
        Err(e) => warn!("跳过 {}: {}", path.display(), e),
      }
    }
    None
  }
}
