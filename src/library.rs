//! 手势库: 加载 + 相似模板检索
//!
//! 每个库对应目录下一个文件 (库名空格替换为下划线 + `.json`)，
//! 每行一个 RawGesture JSON。坏行跳过并计数，不影响整体加载。
//!
//! 检索: 按录制距离与目标距离之差排序 → 容差内为可用集合 →
//! 从最接近的一小批中随机取一个，避免相近距离的运动总是同一条轨迹。

use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::gesture::{self, NormalizedTemplate, RawGesture};

#[derive(Error, Debug)]
pub enum LibraryError {
    /// 库文件不存在 (区别于 "库存在但为空")
    #[error("gesture library not found: {name} (searched {dir})")]
    NotFound { name: String, dir: PathBuf },

    #[error("failed to read gesture library {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 库名 → 文件名
pub fn library_file_name(name: &str) -> String {
    format!("{}.json", name.replace(' ', "_"))
}

/// 一个已加载的手势库，加载后只读
#[derive(Debug, Clone)]
pub struct GestureLibrary {
    name: String,
    source: Option<PathBuf>,
    templates: Vec<NormalizedTemplate>,
}

impl GestureLibrary {
    pub fn from_templates(name: impl Into<String>, templates: Vec<NormalizedTemplate>) -> Self {
        Self {
            name: name.into(),
            source: None,
            templates,
        }
    }

    /// 从库目录加载并归一化
    pub fn load(dir: &Path, name: &str) -> Result<Self, LibraryError> {
        let path = resolve(dir, name)?;
        info!("📂 加载手势库: {}", path.display());

        let file = File::open(&path).map_err(|source| LibraryError::Io {
            path: path.clone(),
            source,
        })?;
        let templates = read_templates(BufReader::new(file), &path)?;

        Ok(Self {
            name: name.to_string(),
            source: Some(path),
            templates,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn templates(&self) -> &[NormalizedTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// 为目标距离挑选模板
    pub fn select<R: Rng + ?Sized>(
        &self,
        target_distance: f64,
        config: &SelectionConfig,
        rng: &mut R,
    ) -> Option<&NormalizedTemplate> {
        select_template(&self.templates, target_distance, config, rng)
    }
}

/// 查找库文件: 先精确匹配，再扫描目录找后缀匹配的文件
fn resolve(dir: &Path, name: &str) -> Result<PathBuf, LibraryError> {
    let file_name = library_file_name(name);
    let direct = dir.join(&file_name);
    if direct.is_file() {
        return Ok(direct);
    }

    let not_found = || LibraryError::NotFound {
        name: name.to_string(),
        dir: dir.to_path_buf(),
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("无法读取手势库目录 {}: {e}", dir.display());
            return Err(not_found());
        }
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&file_name))
        })
        .collect();
    // read_dir 顺序不确定
    matches.sort();
    matches.into_iter().next().ok_or_else(not_found)
}

fn read_templates<R: BufRead>(reader: R, path: &Path) -> Result<Vec<NormalizedTemplate>, LibraryError> {
    let mut templates = Vec::new();
    let mut skipped = 0usize;

    // 按字节切行: 单行编码损坏只跳过该行
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<RawGesture>(line) {
            Ok(raw) => match gesture::normalize(&raw) {
                Some(tpl) => templates.push(tpl),
                None => {
                    debug!("跳过退化手势: {}:{}", path.display(), idx + 1);
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!("⚠️ 跳过格式错误的手势: {}:{}: {e}", path.display(), idx + 1);
                skipped += 1;
            }
        }
    }

    info!(
        "✅ 已加载 {}/{} 条手势: {}",
        templates.len(),
        templates.len() + skipped,
        path.display()
    );
    Ok(templates)
}

/// 列出目录下可用的库名 (文件名去掉 .json)
pub fn list_libraries(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_owned))
        .collect();
    names.sort();
    names
}

// =====================================================================
// 相似度检索
// =====================================================================

/// 按距离相似度挑选模板
///
/// 没有点的模板无法回放，不参与检索; 只有候选中没有任何可回放模板时返回 None。
pub fn select_template<'a, R: Rng + ?Sized>(
    candidates: &'a [NormalizedTemplate],
    target_distance: f64,
    config: &SelectionConfig,
    rng: &mut R,
) -> Option<&'a NormalizedTemplate> {
    let mut sorted: Vec<&NormalizedTemplate> = candidates.iter().filter(|t| !t.is_empty()).collect();
    if sorted.is_empty() {
        warn!("⚠️ 候选中没有可回放的手势 ({} 个)", candidates.len());
        return None;
    }

    let gap = |t: &NormalizedTemplate| (t.original_distance - target_distance).abs();

    sorted.sort_by(|a, b| gap(a).total_cmp(&gap(b)));

    let tolerance = (target_distance * config.tolerance_ratio).max(config.min_tolerance_px);
    // 已排序，可用集合为前缀
    let viable = sorted.iter().take_while(|t| gap(t) <= tolerance).count();

    let pool_size = if viable == 0 {
        debug!(
            "无容差内模板 (目标 {target_distance:.1}px, 容差 {tolerance:.1}px), 从最接近的 {} 个中选择",
            config.fallback_pool
        );
        config.fallback_pool.max(1).min(sorted.len())
    } else {
        let top = (viable as f64 * config.pool_ratio).ceil() as usize;
        let size = top.max(viable.min(config.min_pool)).clamp(1, viable);
        debug!("可用模板 {viable} 个, 从前 {size} 个中随机选择");
        size
    };

    Some(sorted[rng.gen_range(0..pool_size)])
}
