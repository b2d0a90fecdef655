//! 结果输出
//!
//! 每个 (实验, 指标) 一个输出，实验开始前打开（截断），整个运行期间持有。
//! 文件格式：每行两列，空白分隔：`<秒> <数值>`。
//!
//! 每个输出只有一个写入者（某个订阅回调或吞吐量采样器），通过 `SeriesHandle` 写入。
//! 运行期间的 I/O 错误先记录下来，在 `finish` 时统一报告。

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::error::EmitError;
use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cwnd,
    Ssthresh,
    Throughput,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cwnd, Metric::Ssthresh, Metric::Throughput];

    /// 输出文件扩展名
    pub fn extension(self) -> &'static str {
        match self {
            Metric::Cwnd => "cwnd",
            Metric::Ssthresh => "ssthresh",
            Metric::Throughput => "throughput",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub at: SimTime,
    pub metric: Metric,
    pub value: f64,
}

/// 一个指标的输出目的地
pub trait SampleSink: Send {
    fn write(&mut self, at: SimTime, value: f64) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// 文本文件输出
pub struct FileSink {
    out: BufWriter<File>,
}

impl FileSink {
    /// 创建（截断）文件
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }
}

impl SampleSink for FileSink {
    fn write(&mut self, at: SimTime, value: f64) -> io::Result<()> {
        writeln!(self.out, "{} {}", at.as_secs_f64(), value)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// 内存输出，测试用；多个指标可以共享同一个 Vec
#[derive(Clone)]
pub struct MemorySink {
    metric: Metric,
    samples: Arc<Mutex<Vec<Sample>>>,
}

impl SampleSink for MemorySink {
    fn write(&mut self, at: SimTime, value: f64) -> io::Result<()> {
        lock(&self.samples).push(Sample {
            at,
            metric: self.metric,
            value,
        });
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Series {
    metric: Metric,
    sink: Box<dyn SampleSink>,
    count: u64,
    last_at: Option<SimTime>,
    error: Option<io::Error>,
}

impl Series {
    fn record(&mut self, at: SimTime, value: f64) {
        debug_assert!(
            self.last_at.is_none_or(|last| last <= at),
            "{} samples must be time-ordered",
            self.metric.extension()
        );
        if self.error.is_some() {
            return;
        }
        match self.sink.write(at, value) {
            Ok(()) => {
                self.count += 1;
                self.last_at = Some(at);
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn finish(&mut self) -> Result<u64, EmitError> {
        let metric = self.metric.extension();
        if let Some(source) = self.error.take() {
            return Err(EmitError::Write { metric, source });
        }
        self.sink
            .flush()
            .map_err(|source| EmitError::Write { metric, source })?;
        Ok(self.count)
    }
}

/// 某个指标输出的写入句柄；可移动进事件或订阅回调
#[derive(Clone)]
pub struct SeriesHandle(Arc<Mutex<Series>>);

impl SeriesHandle {
    pub fn record(&self, at: SimTime, value: f64) {
        lock(&self.0).record(at, value);
    }

    pub fn count(&self) -> u64 {
        lock(&self.0).count
    }
}

/// 每个指标已写出的样本数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCounts {
    pub cwnd: u64,
    pub ssthresh: u64,
    pub throughput: u64,
}

pub struct ResultEmitter {
    series: [SeriesHandle; 3],
    paths: Vec<PathBuf>,
    memory: Option<Arc<Mutex<Vec<Sample>>>>,
}

impl ResultEmitter {
    /// 在 `out_dir` 下创建 `<prefix>.cwnd`、`<prefix>.ssthresh`、`<prefix>.throughput`
    pub fn create(out_dir: &Path, prefix: &str) -> Result<Self, EmitError> {
        fs::create_dir_all(out_dir).map_err(|source| EmitError::CreateDir {
            path: out_dir.to_path_buf(),
            source,
        })?;
        let open = |metric: Metric| -> Result<(SeriesHandle, PathBuf), EmitError> {
            let path = out_dir.join(format!("{prefix}.{}", metric.extension()));
            let sink = FileSink::create(&path).map_err(|source| EmitError::Open {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "打开输出文件");
            Ok((Self::series(metric, Box::new(sink)), path))
        };
        let (cwnd, cwnd_path) = open(Metric::Cwnd)?;
        let (ssthresh, ssthresh_path) = open(Metric::Ssthresh)?;
        let (throughput, throughput_path) = open(Metric::Throughput)?;
        Ok(Self {
            series: [cwnd, ssthresh, throughput],
            paths: vec![cwnd_path, ssthresh_path, throughput_path],
            memory: None,
        })
    }

    /// 所有指标写入同一个内存 Vec
    pub fn in_memory() -> Self {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let series = Metric::ALL.map(|metric| {
            Self::series(
                metric,
                Box::new(MemorySink {
                    metric,
                    samples: Arc::clone(&samples),
                }),
            )
        });
        Self {
            series,
            paths: Vec::new(),
            memory: Some(samples),
        }
    }

    fn series(metric: Metric, sink: Box<dyn SampleSink>) -> SeriesHandle {
        SeriesHandle(Arc::new(Mutex::new(Series {
            metric,
            sink,
            count: 0,
            last_at: None,
            error: None,
        })))
    }

    pub fn handle(&self, metric: Metric) -> SeriesHandle {
        self.series[metric.index()].clone()
    }

    pub fn emit(&self, metric: Metric, at: SimTime, value: f64) {
        self.series[metric.index()].record(at, value);
    }

    /// 已打开的输出文件
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// 内存模式下已收集的样本（写入顺序）
    pub fn samples(&self) -> Vec<Sample> {
        self.memory
            .as_ref()
            .map(|m| lock(m).clone())
            .unwrap_or_default()
    }

    /// 刷新所有输出；运行期间遇到的第一个 I/O 错误在这里返回
    pub fn finish(&self) -> Result<SampleCounts, EmitError> {
        let mut counts = [0u64; 3];
        for (i, handle) in self.series.iter().enumerate() {
            counts[i] = lock(&handle.0).finish()?;
        }
        let counts = SampleCounts {
            cwnd: counts[0],
            ssthresh: counts[1],
            throughput: counts[2],
        };
        info!(?counts, "💾 结果已写出");
        Ok(counts)
    }
}
