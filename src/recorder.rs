//! Frame recording.
//!
//! Frames are written as binary PPM (`P6`) images, one directory per episode:
//! `<dir>/episode_<n>/frame_<t>.ppm`. Observations with one channel are
//! written as grey, with three channels as RGB. Values are clamped to 0..=255.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;
use ndarray::ArrayView3;

use crate::error::{DuelError, Result};

pub struct FrameRecorder {
    root: PathBuf,
    episode_dir: Option<PathBuf>,
    frames: usize,
}

impl FrameRecorder {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(FrameRecorder {
            root: root.as_ref().to_path_buf(),
            episode_dir: None,
            frames: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Frames written for the current episode.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn start_episode(&mut self, episode: usize) -> Result<()> {
        let dir = self.root.join(format!("episode_{}", episode));
        fs::create_dir_all(&dir)?;
        self.episode_dir = Some(dir);
        self.frames = 0;
        Ok(())
    }

    pub fn record_frame(&mut self, frame: ArrayView3<f32>) -> Result<PathBuf> {
        let dir = self.episode_dir.as_ref().ok_or_else(|| {
            DuelError::Environment("record_frame called before start_episode".to_string())
        })?;
        let path = dir.join(format!("frame_{}.ppm", self.frames));
        write_ppm(&path, frame)?;
        self.frames += 1;
        Ok(path)
    }

    /// Like [`FrameRecorder::start_episode`], but failures only log a warning.
    pub fn try_start_episode(&mut self, episode: usize) {
        if let Err(err) = self.start_episode(episode) {
            warn!("recording disabled for episode {}: {}", episode, err);
            self.episode_dir = None;
        }
    }

    /// Like [`FrameRecorder::record_frame`], but failures only log a warning.
    pub fn try_record_frame(&mut self, frame: ArrayView3<f32>) {
        if self.episode_dir.is_none() {
            return;
        }
        if let Err(err) = self.record_frame(frame) {
            warn!("failed to record frame {}: {}", self.frames, err);
        }
    }
}

/// Write a `[height, width, channels]` frame as a binary PPM.
pub fn write_ppm(path: &Path, frame: ArrayView3<f32>) -> Result<()> {
    let (height, width, channels) = frame.dim();
    if channels != 1 && channels != 3 {
        return Err(DuelError::dimension_mismatch(
            "1 or 3 channels".to_string(),
            format!("{}", channels),
        ));
    }

    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", width, height)?;
    let mut pixels = Vec::with_capacity(height * width * 3);
    for row in 0..height {
        for col in 0..width {
            for c in 0..3 {
                let value = frame[[row, col, if channels == 1 { 0 } else { c }]];
                pixels.push(value.clamp(0.0, 255.0) as u8);
            }
        }
    }
    out.write_all(&pixels)?;
    out.flush()?;
    Ok(())
}
