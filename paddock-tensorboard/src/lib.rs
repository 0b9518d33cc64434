#![warn(missing_docs)]
//! [`Recorder`] writing TensorBoard event files.
use anyhow::Result;
use log::{trace, warn};
use paddock_core::record::{Record, RecordStorage, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Key of the step in records given to [`TensorboardRecorder`].
pub const STEP_KEY: &str = "num_timesteps";

/// Write records to TFRecord.
///
/// Records given to [`Recorder::write`] must carry the step in [`STEP_KEY`]; records
/// without it are dropped with a warning. [`Recorder::flush`] writes the aggregate of
/// the stored records at the given step.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    storage: RecordStorage,
    step_key: String,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`, which is created if needed.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Result<Self> {
        std::fs::create_dir_all(&logdir)?;
        Ok(Self {
            writer: SummaryWriter::new(logdir),
            storage: RecordStorage::new(),
            step_key: STEP_KEY.to_string(),
        })
    }

    fn write_at(&mut self, record: &Record, step: usize) {
        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::Array2(data, shape) => {
                    let (data, shape) = grayscale(data, shape);
                    self.writer.add_image(k, data.as_slice(), &shape, step)
                }
                _ => trace!("Skip value of {} not supported by tensorboard", k),
            }
        }
    }
}

// Min-max scaled to bytes and repeated over 3 channels.
fn grayscale(data: &[f32], shape: &[usize; 2]) -> (Vec<u8>, [usize; 3]) {
    let min = data.iter().fold(f32::MAX, |m, v| v.min(m));
    let scale = data.iter().fold(f32::MIN, |m, v| v.max(m)) - min;
    let channel = data
        .iter()
        .map(|&e| match scale > 0.0 {
            true => ((e - min) / scale * 255f32) as u8,
            false => 0,
        })
        .collect::<Vec<_>>();
    (channel.repeat(3), [3, shape[0], shape[1]])
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] and [RecordValue::Array2] in the
    /// [Record]. Other variants will be ignored.
    fn write(&mut self, record: Record) {
        match record.get_scalar(&self.step_key) {
            Ok(step) => self.write_at(&record, step as usize),
            Err(e) => warn!("Record without step dropped: {}", e),
        }
    }

    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        if self.storage.is_empty() {
            return;
        }
        let record = self.storage.aggregate();
        self.write_at(&record, step.max(0) as usize);
        self.writer.flush();
    }
}
