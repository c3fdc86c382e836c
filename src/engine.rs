// 该文件是 Huolong （火龙） 项目的一部分。
// src/engine.rs - 分级定价引擎：快照状态、单次扫描流程、人工修正与重新校准
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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{NaiveDate, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calibration::{CalibrationOutcome, CalibrationProfile, calibrate};
use crate::config::EngineConfig;
use crate::detection::{Detection, DetectionSummary, Detector, filter_confident};
use crate::features::{
  FeatureExtractor, FeatureVector, FruitStatus, FruitVariety, ImageQuality, RegionFeatures,
  RiskLevel,
};
use crate::grading::{
  Decision, DecisionEngine, DiseaseEvidence, Grade, MarketValue, ShelfLife,
  check_validity, disease_description, recommendations,
};
use crate::history::{BatchReport, DateRangeReport, History, HistorySummary};
use crate::output::draw::preview_base64;
use crate::pricing::{
  BaselineInputs, ModelSummary, ModelUpdate, PriceBounds, PriceEstimate, PriceModel, PricingError,
  retrain, training_rows,
};
use crate::segment::{ColorCues, FusedMask, MaskFuser, SegmentationMask};
use crate::selftrain::{SampleCollector, SampleMeta, should_collect};
use crate::store::{CorrectionRecord, ScanRecord, ScanStore, StoreError};
use crate::utils::round_to;
use crate::{FromUrl, FromUrlWithScheme};

mod result;

pub use self::result::{AnalysisResult, ColorAnalysis, DetectionBackend};

const DEGENERATE_WARNING: &str = "Image statistics are degenerate; please rescan";
const NOT_APPLICABLE: &str = "Not applicable";

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("数据目录错误: {0}")]
  StoreError(#[from] StoreError),
  #[error("价格模型错误: {0}")]
  PricingError(#[from] PricingError),
  #[error("修正请求无效: {0}")]
  InvalidCorrection(String),
}

/// 单次扫描的调用方参数
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
  pub batch_id: Option<String>,
  pub lat: Option<f64>,
  pub lon: Option<f64>,
  /// 可信采集路径，放宽有效性门限
  pub trusted: bool,
  /// 调用方已有的果实检测；`None` 时使用注入的检测器
  pub fruit_detections: Option<Vec<Detection>>,
  /// 调用方已有的病害检测；`None` 时使用注入的检测器
  pub disease_detections: Option<Vec<Detection>>,
}

/// 人工修正请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRequest {
  pub analysis_id: Uuid,
  #[serde(default)]
  pub correct_grade: Option<Grade>,
  #[serde(default)]
  pub correct_weight_grams: Option<f64>,
  #[serde(default)]
  pub correct_price_per_kg: Option<f64>,
  #[serde(default)]
  pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrainStatus {
  /// 修正不含价格
  NotRequested,
  Updated { n_samples: usize },
  NoUpdate { rows: usize, need: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionOutcome {
  pub analysis_id: Uuid,
  /// 修正是否命中了内存历史或扫描日志中的记录
  pub matched: bool,
  pub total_labeled: usize,
  pub retrain: RetrainStatus,
  pub price_model: ModelSummary,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot<T>(slot: &RwLock<Arc<T>>) -> Arc<T> {
  slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn swap<T>(slot: &RwLock<Arc<T>>, value: T) {
  *slot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(value);
}

struct EngineState {
  config: EngineConfig,
  store: ScanStore,
  fruit_detector: Option<Box<dyn Detector>>,
  disease_detector: Option<Box<dyn Detector>>,
  collector: Option<SampleCollector>,
  calibration: RwLock<Arc<CalibrationProfile>>,
  model: RwLock<Arc<PriceModel>>,
  history: Mutex<History<AnalysisResult>>,
  scan_counter: AtomicUsize,
  recalibrating: AtomicBool,
  /// 修正与重训练串行执行
  label_lock: Mutex<()>,
}

pub struct EngineBuilder {
  store: ScanStore,
  config: EngineConfig,
  fruit_detector: Option<Box<dyn Detector>>,
  disease_detector: Option<Box<dyn Detector>>,
}

impl FromUrlWithScheme for EngineBuilder {
  const SCHEME: &'static str = ScanStore::SCHEME;
}

impl FromUrl for EngineBuilder {
  type Error = EngineError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    Ok(EngineBuilder::new(ScanStore::from_url(url)?))
  }
}

impl EngineBuilder {
  pub fn new(store: ScanStore) -> Self {
    EngineBuilder {
      store,
      config: EngineConfig::default(),
      fruit_detector: None,
      disease_detector: None,
    }
  }

  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_currency(mut self, currency: &str) -> Self {
    self.config.currency = currency.to_string();
    self
  }

  pub fn with_fruit_detector(mut self, detector: impl Detector + 'static) -> Self {
    self.fruit_detector = Some(Box::new(detector));
    self
  }

  pub fn with_disease_detector(mut self, detector: impl Detector + 'static) -> Self {
    self.disease_detector = Some(Box::new(detector));
    self
  }

  /// 加载价格模型并基于扫描日志完成首次校准
  pub fn build(self) -> Result<Engine, EngineError> {
    let mut config = self.config;
    config.currency = config.currency.trim().to_ascii_uppercase();

    let model = PriceModel::load_or_default(&self.store.model_path(), &config.currency);
    if !model.currency.eq_ignore_ascii_case(&config.currency) {
      warn!(
        "价格模型货币 {} 与配置货币 {} 不一致",
        model.currency, config.currency
      );
    }

    let records = self.store.scans().read_all()?;
    let outcome = calibrate(records.iter().filter(|r| r.is_valid()).map(|r| &r.features));
    if let CalibrationOutcome::NoUpdate(skip) = &outcome {
      info!("初始校准未更新，使用默认阈值: {:?}", skip);
    }
    let profile = outcome.into_profile();

    let collector = config.selftrain.enabled.then(|| {
      info!("自训练样本收集已开启: {}", self.store.upload_dir().display());
      SampleCollector::new(self.store.upload_dir(), self.store.selftrain_queue_path())
    });

    info!(
      "引擎就绪: 数据目录 {}, 货币 {}, 果实检测器 {}, 病害检测器 {}",
      self.store.root().display(),
      config.currency,
      self.fruit_detector.is_some(),
      self.disease_detector.is_some()
    );

    Ok(Engine {
      state: Arc::new(EngineState {
        history: Mutex::new(History::with_capacity(config.history_capacity)),
        config,
        store: self.store,
        fruit_detector: self.fruit_detector,
        disease_detector: self.disease_detector,
        collector,
        calibration: RwLock::new(Arc::new(profile)),
        model: RwLock::new(Arc::new(model)),
        scan_counter: AtomicUsize::new(0),
        recalibrating: AtomicBool::new(false),
        label_lock: Mutex::new(()),
      }),
    })
  }
}

/// 可在线程间共享的引擎句柄
#[derive(Clone)]
pub struct Engine {
  state: Arc<EngineState>,
}

/// 一次扫描中判定之前的全部中间量
struct Observation {
  fruit: Vec<Detection>,
  disease: Vec<Detection>,
  backend: DetectionBackend,
  summary: DetectionSummary,
  relevance: f64,
  fused: FusedMask,
  features: RegionFeatures,
  quality: ImageQuality,
}

impl Engine {
  pub fn config(&self) -> &EngineConfig {
    &self.state.config
  }

  pub fn store(&self) -> &ScanStore {
    &self.state.store
  }

  /// 当前价格模型快照
  pub fn price_model(&self) -> Arc<PriceModel> {
    snapshot(&self.state.model)
  }

  /// 当前校准阈值快照
  pub fn calibration(&self) -> Arc<CalibrationProfile> {
    snapshot(&self.state.calibration)
  }

  /// 内存历史，最近优先
  pub fn history(&self) -> Vec<AnalysisResult> {
    lock(&self.state.history).iter().cloned().collect()
  }

  fn detect(
    &self,
    provided: Option<&Vec<Detection>>,
    detector: Option<&dyn Detector>,
    image: &RgbImage,
    kind: &str,
  ) -> Option<Vec<Detection>> {
    if let Some(detections) = provided {
      return Some(detections.clone());
    }
    match detector?.predict(image) {
      Ok(detections) => Some(detections),
      Err(e) => {
        warn!("{}检测器失败，退回颜色线索: {}", kind, e);
        None
      }
    }
  }

  fn observe(&self, image: &RgbImage, request: &ScanRequest) -> (Observation, bool, Option<String>) {
    let config = &self.state.config;
    let (width, height) = image.dimensions();

    let raw_fruit = self.detect(
      request.fruit_detections.as_ref(),
      self.state.fruit_detector.as_deref(),
      image,
      "果实",
    );
    let backend = if raw_fruit.is_some() {
      DetectionBackend::Detector
    } else {
      DetectionBackend::Heuristic
    };
    let raw_fruit = raw_fruit.unwrap_or_default();
    let raw_disease = self
      .detect(
        request.disease_detections.as_ref(),
        self.state.disease_detector.as_deref(),
        image,
        "病害",
      )
      .unwrap_or_default();

    let fruit = filter_confident(raw_fruit.clone(), config.min_detection_confidence);
    let disease = filter_confident(raw_disease, config.min_detection_confidence);
    let summary = DetectionSummary::of(&fruit, width, height);

    let cues = ColorCues::from_image(image);
    let relevance = cues.relevance_ratio();
    // 可信路径按未过滤的置信度判定
    let validity = if request.trusted {
      let raw_summary = DetectionSummary::of(&raw_fruit, width, height);
      check_validity(width, height, &raw_summary, relevance, true)
    } else {
      check_validity(width, height, &summary, relevance, false)
    };

    let detector_mask =
      (!fruit.is_empty()).then(|| SegmentationMask::from_detections(&fruit, width, height));
    let fused = MaskFuser.fuse(&cues, summary.primary_bbox.as_ref(), detector_mask.as_ref());
    let features = FeatureExtractor::default()
      .with_heuristic_defect_ceiling(config.heuristic_defect_ceiling)
      .extract(image, &fused, !disease.is_empty());
    let quality = ImageQuality::measure(image);

    debug!(
      "观测: 果实检测 {}, 病害检测 {}, 颜色占比 {:.3}, 掩码来源 {:?}, 面积 {:.3}",
      fruit.len(),
      disease.len(),
      relevance,
      fused.source,
      fused.area_ratio()
    );

    (
      Observation {
        fruit,
        disease,
        backend,
        summary,
        relevance,
        fused,
        features,
        quality,
      },
      validity.valid,
      validity.warning,
    )
  }

  /// 对一幅图像完成分割、特征、判定与定价，并写入历史与扫描日志
  pub fn analyze(&self, image: &RgbImage, request: &ScanRequest) -> Result<AnalysisResult, EngineError> {
    // 单次扫描内只读取一次快照
    let profile = self.calibration();
    let model = self.price_model();

    let (obs, valid, mut warning) = self.observe(image, request);
    let decision = if valid {
      let primary = obs.summary.primary_bbox.unwrap_or(obs.fused.bbox);
      let evidence = DiseaseEvidence::from_detections(&obs.disease, &primary);
      match DecisionEngine::new(&profile).decide(&obs.features, obs.summary.best_conf as f64, &evidence) {
        Ok(decision) => Some(decision),
        Err(e) => {
          warn!("判定失败，按无效结果处理: {}", e);
          warning = Some(DEGENERATE_WARNING.to_string());
          None
        }
      }
    } else {
      None
    };

    let result = self.assemble(image, request, &obs, decision.as_ref(), warning, &model);
    info!(
      "扫描 {}: 有效 {}, 等级 {}, 价格 {:.2} {}/kg",
      result.id,
      result.is_valid_fruit,
      result.grade.map_or("N/A", |g| g.as_str()),
      result.estimated_price_per_kg,
      result.currency
    );

    self.state.store.scans().append(&ScanRecord {
      id: result.id,
      timestamp: result.timestamp,
      features: result.features,
      prediction: result.prediction(),
    })?;
    lock(&self.state.history).push(result.clone());

    self.collect_sample(image, &obs, &result);
    self.schedule_recalibration();
    Ok(result)
  }

  fn assemble(
    &self,
    image: &RgbImage,
    request: &ScanRequest,
    obs: &Observation,
    decision: Option<&Decision>,
    warning: Option<String>,
    model: &PriceModel,
  ) -> AnalysisResult {
    let config = &self.state.config;
    let f = &obs.features;
    let (width, height) = image.dimensions();

    let grade = decision.map(|d| d.resolution.grade);
    let features = FeatureVector::new(f, grade);
    let (defect, insect) = decision.map_or((RiskLevel::Low, RiskLevel::Low), |d| {
      (d.defect_level, d.insect_level)
    });

    let price = match grade {
      Some(grade) => PriceEstimate::blend(
        model,
        &features,
        PriceBounds::per_kg(grade, defect, true, insect),
        &BaselineInputs {
          quality_score: f.quality_score,
          ripeness_score: f.ripeness_score,
          defect_probability: f.defect_probability,
          insect_score: f.insect.score,
        },
      ),
      None => PriceEstimate::INVALID,
    };
    let shelf = ShelfLife::of(grade, defect, insect);
    let market = MarketValue::of(grade, defect, insect);
    let tips = recommendations(f.ripeness_score, defect, insect, f.size_category, market.label);

    let preview = if config.preview {
      preview_base64(image, &obs.fused.mask, &obs.fused.bbox)
        .inspect_err(|e| warn!("分割预览生成失败: {}", e))
        .ok()
    } else {
      None
    };

    let (fruit_type, fruit_status, disease_status, disease_text, notes) = match (decision, grade) {
      (Some(d), Some(g)) => (
        f.variety,
        f.fruit_status,
        d.disease_status,
        disease_description(d.disease_status),
        format!("Grade {} {}. {}.", g, f.variety.as_str(), f.wings_condition.as_str()),
      ),
      _ => (
        FruitVariety::Unknown,
        FruitStatus::Unknown,
        RiskLevel::Low,
        NOT_APPLICABLE,
        warning.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()),
      ),
    };

    let valid = decision.is_some();
    let [r, g, b] = f.mean_rgb.map(|c| c.round().clamp(0.0, 255.0) as u8);

    AnalysisResult {
      id: Uuid::new_v4(),
      timestamp: Utc::now(),
      batch_id: request.batch_id.clone(),
      lat: request.lat,
      lon: request.lon,
      image_width: width,
      image_height: height,
      is_valid_fruit: valid,
      warning_message: warning,
      fruit_type,
      fruit_status,
      grade,
      grade_trace: decision.map(|d| d.resolution.trace.clone()).unwrap_or_default(),
      size_category: valid.then_some(f.size_category),
      weight_grams_est: if valid { f.weight_grams } else { 0 },
      ripeness_score: round_to(f.ripeness_score, 2),
      quality_score: round_to(f.quality_score, 2),
      quality_index: decision.map_or(0.0, |d| round_to(d.quality_index, 2)),
      defect_probability: round_to(f.defect_probability, 2),
      defect_level: decision.map(|d| d.defect_level),
      shape_quality: f.shape_quality,
      wing_tip_signal: round_to(f.wing_tip_signal, 2),
      wings_condition: f.wings_condition,
      disease_status,
      disease_description: disease_text,
      insect_risk_score: round_to(f.insect.score, 2),
      insect_risk_level: if valid { insect } else { f.insect.level },
      shelf_life_days: shelf.days,
      shelf_life_label: shelf.label,
      fruit_area_ratio: round_to(f.fruit_area_ratio, 4),
      segmentation_bbox: obs.fused.bbox,
      segmentation_source: obs.fused.source,
      segmentation_preview_base64: preview,
      market_value_label: market.label,
      market_value_score: market.score,
      sorting_lane: market.lane,
      estimated_price_per_kg: price.price_per_kg,
      price_breakdown: price,
      currency: config.currency.clone(),
      price_model: model.summary(),
      detections: obs.fruit.clone(),
      disease_detections: obs.disease.clone(),
      detection_backend: obs.backend,
      detection_summary: obs.summary.clone(),
      image_quality: obs.quality,
      color_analysis: ColorAnalysis {
        r,
        g,
        b,
        score: round_to(f.color_score, 2),
      },
      features,
      recommendations: tips,
      notes,
      label_corrected: false,
    }
  }

  fn collect_sample(&self, image: &RgbImage, obs: &Observation, result: &AnalysisResult) {
    let Some(collector) = &self.state.collector else {
      return;
    };
    let decision = should_collect(&self.state.config.selftrain, &obs.fruit, obs.relevance, &obs.quality);
    if !decision.collect {
      return;
    }
    let prediction = result.prediction();
    let meta = SampleMeta {
      analysis_id: result.id,
      reasons: &decision.reasons,
      relevance_ratio: obs.relevance,
      image_quality: obs.quality,
      detections: &obs.fruit,
      prediction: &prediction,
    };
    if let Err(e) = collector.save(image, meta) {
      warn!("自训练样本保存失败: {}", e);
    }
  }

  fn schedule_recalibration(&self) {
    let Some(every) = self.state.config.recalibrate_every.filter(|n| *n > 0) else {
      return;
    };
    let count = self.state.scan_counter.fetch_add(1, Ordering::Relaxed) + 1;
    if count % every != 0 || self.state.recalibrating.swap(true, Ordering::AcqRel) {
      return;
    }

    let engine = self.clone();
    let spawned = std::thread::Builder::new()
      .name("huolong-calibrate".to_string())
      .spawn(move || {
        if let Err(e) = engine.recalibrate() {
          warn!("后台校准失败: {}", e);
        }
        engine.state.recalibrating.store(false, Ordering::Release);
      });
    if let Err(e) = spawned {
      warn!("无法启动后台校准线程: {}", e);
      self.state.recalibrating.store(false, Ordering::Release);
    }
  }

  /// 由扫描日志中的有效记录重新计算阈值；样本不足时保留当前阈值
  pub fn recalibrate(&self) -> Result<CalibrationOutcome, EngineError> {
    let records = self.state.store.scans().read_all()?;
    let outcome = calibrate(records.iter().filter(|r| r.is_valid()).map(|r| &r.features));
    match &outcome {
      CalibrationOutcome::Updated(profile) => {
        info!("校准完成: 样本 {}, 阈值 {:?}", profile.sample_count, profile.thresholds());
        swap(&self.state.calibration, profile.clone());
      }
      CalibrationOutcome::NoUpdate(skip) => info!("校准未更新: {:?}", skip),
    }
    Ok(outcome)
  }

  /// 记录人工修正；含价格时用全部修正重训练价格模型
  pub fn apply_correction(&self, label: &LabelRequest) -> Result<CorrectionOutcome, EngineError> {
    if label.correct_price_per_kg.is_some_and(|p| !p.is_finite() || p <= 0.0) {
      return Err(EngineError::InvalidCorrection("价格必须为正数".to_string()));
    }
    if label.correct_weight_grams.is_some_and(|w| !w.is_finite() || w <= 0.0) {
      return Err(EngineError::InvalidCorrection("重量必须为正数".to_string()));
    }

    let _guard = lock(&self.state.label_lock);
    let currency = label
      .currency
      .as_deref()
      .map(|c| c.trim().to_ascii_uppercase())
      .unwrap_or_else(|| self.state.config.currency.clone());

    // 无效扫描不携带特征，避免成为价格训练样本
    let in_memory = lock(&self.state.history)
      .find_mut(|r| r.id == label.analysis_id)
      .map(|item| {
        item.apply_label(
          label.correct_grade,
          label.correct_weight_grams,
          label.correct_price_per_kg,
          &currency,
        );
        item.is_valid_fruit.then_some(item.features)
      });
    let (matched, features) = match in_memory {
      Some(features) => (true, features),
      None => match self.state.store.find_scan(label.analysis_id)? {
        Some(record) if record.is_valid() => {
          debug!("修正目标 {} 已不在内存历史，使用扫描日志中的特征", label.analysis_id);
          let mut features = record.features;
          if let Some(grade) = label.correct_grade {
            features.grade_ordinal = Grade::ordinal_of(Some(grade));
          }
          (true, Some(features))
        }
        Some(_) => (true, None),
        None => (false, None),
      },
    };
    if !matched {
      warn!("修正目标 {} 不存在，仅记录修正", label.analysis_id);
    } else if features.is_none() {
      info!("修正目标 {} 不是有效果实，不作为训练样本", label.analysis_id);
    }

    self.state.store.labels().append(&CorrectionRecord {
      analysis_id: label.analysis_id,
      correct_grade: label.correct_grade,
      correct_weight_grams: label.correct_weight_grams,
      correct_price_per_kg: label.correct_price_per_kg,
      currency: Some(currency.clone()),
      timestamp: Utc::now(),
      features,
    })?;
    let corrections = self.state.store.labels().read_all()?;

    let retrain = if label.correct_price_per_kg.is_some() {
      self.retrain_from(&corrections)?
    } else {
      RetrainStatus::NotRequested
    };

    Ok(CorrectionOutcome {
      analysis_id: label.analysis_id,
      matched,
      total_labeled: corrections.len(),
      retrain,
      price_model: self.price_model().summary(),
    })
  }

  fn retrain_from(&self, corrections: &[CorrectionRecord]) -> Result<RetrainStatus, EngineError> {
    let current = self.price_model();
    let rows = training_rows(corrections, &self.state.config.currency);
    match retrain(&current, &rows)? {
      ModelUpdate::Updated(model) => {
        model.save(&self.state.store.model_path())?;
        let n_samples = model.n_samples;
        swap(&self.state.model, model);
        info!("价格模型已更新并保存: 样本 {}", n_samples);
        Ok(RetrainStatus::Updated { n_samples })
      }
      ModelUpdate::NoUpdate { rows, need } => Ok(RetrainStatus::NoUpdate { rows, need }),
    }
  }

  /// 用当前全部修正重训练价格模型
  pub fn retrain_price_model(&self) -> Result<RetrainStatus, EngineError> {
    let _guard = lock(&self.state.label_lock);
    let corrections = self.state.store.labels().read_all()?;
    self.retrain_from(&corrections)
  }

  pub fn history_summary(&self) -> HistorySummary {
    HistorySummary::of(lock(&self.state.history).iter())
  }

  pub fn batch_report(&self, batch_id: &str) -> BatchReport {
    BatchReport::of(batch_id, lock(&self.state.history).iter())
  }

  pub fn date_range_report(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> DateRangeReport {
    DateRangeReport::of(from, to, lock(&self.state.history).iter())
  }

  /// 基于扫描日志（不受内存容量限制）的汇总
  pub fn logged_summary(&self) -> Result<HistorySummary, EngineError> {
    let records = self.state.store.scans().read_all()?;
    Ok(HistorySummary::of(&records))
  }

  pub fn logged_batch_report(&self, batch_id: &str) -> Result<BatchReport, EngineError> {
    let records = self.state.store.scans().read_all()?;
    Ok(BatchReport::of(batch_id, &records))
  }

  pub fn logged_date_range_report(
    &self,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
  ) -> Result<DateRangeReport, EngineError> {
    let records = self.state.store.scans().read_all()?;
    Ok(DateRangeReport::of(from, to, &records))
  }
}

impl std::fmt::Debug for Engine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Engine")
      .field("root", &self.state.store.root())
      .field("config", &self.state.config)
      .finish_non_exhaustive()
  }
}
