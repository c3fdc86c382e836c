// 该文件是 Huolong （火龙） 项目的一部分。
// src/input/read_image_file.rs - 单幅图像文件输入
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

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use super::{ScanInput, request_for, request_from_query};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 解码图像并按 EXIF 方向摆正
pub fn load_image(path: &Path) -> Result<RgbImage, ImageFileInputError> {
  let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
  let orientation = decoder.orientation()?;
  let mut image = DynamicImage::from_decoder(decoder)?;
  image.apply_orientation(orientation);
  debug!("读取图像 {}: {}x{}", path.display(), image.width(), image.height());
  Ok(image.to_rgb8())
}

/// `image:///path/to/fruit.jpg?batch=...`，同名 `.fruit.json` / `.disease.json` 作为检测结果
pub struct ImageFileInput {
  input: Option<ScanInput>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!("URI 方案不匹配: 期望 '{}'，实际 '{}'", Self::SCHEME, url.scheme());
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = PathBuf::from(url.path());
    let image = load_image(&path)?;
    let request = request_for(&path, &request_from_query(url));

    Ok(ImageFileInput {
      input: Some(ScanInput {
        path,
        image,
        request,
      }),
    })
  }
}

impl IntoIterator for ImageFileInput {
  type Item = ScanInput;
  type IntoIter = std::option::IntoIter<ScanInput>;

  fn into_iter(self) -> Self::IntoIter {
    self.input.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn reads_png_with_query_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fruit.png");
    RgbImage::from_pixel(12, 9, Rgb([210, 50, 110])).save(&path).unwrap();

    let mut url = Url::from_file_path(&path).unwrap();
    url.set_query(Some("batch=b1"));
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();

    let inputs: Vec<_> = ImageFileInput::from_url(&url).unwrap().into_iter().collect();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].image.dimensions(), (12, 9));
    assert_eq!(inputs[0].request.batch_id.as_deref(), Some("b1"));
    assert!(inputs[0].request.fruit_detections.is_none());
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp/x.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch)
    ));
  }
}
