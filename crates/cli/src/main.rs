use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use facesight_core::alignment::face_aligner::{AlignerConfig, AlignmentResult, FaceAligner};
use facesight_core::detection::detection::{BoundingBox, ComponentId, Detection};
use facesight_core::detection::landmarks::FaceLandmarks;
use facesight_core::pipeline::frame_filter::FrameFilter;
use facesight_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use facesight_core::shared::constants::{
    MIN_FACE_SIZE, POOL_CAPACITY, SCORE_THRESHOLD, UNTRACKED_ID,
};
use facesight_core::shared::frame::SourceFrame;
use facesight_core::tracking::identity_tracker::{IdentityTracker, TrackerConfig};

/// Face-sighting dedup and alignment over recorded detection streams.
#[derive(Parser)]
#[command(name = "facesight")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded detection stream through the identity tracker.
    Replay {
        /// JSON Lines file, one frame record per line.
        detections: PathBuf,

        /// Minimum face box size in pixels (primary detections).
        #[arg(long, default_value_t = MIN_FACE_SIZE)]
        min_face_size: f64,

        /// Max unknown-identity candidates per window.
        #[arg(long, default_value_t = POOL_CAPACITY)]
        pool_capacity: usize,

        /// Candidate pool flush window in milliseconds.
        #[arg(long, default_value = "1000")]
        window_ms: u64,

        /// Faces come from the primary (full-frame) detector.
        #[arg(long)]
        full_frame: bool,
    },
    /// Align face chips in a still image from recorded detector output.
    Align {
        /// Source image (any format the image crate decodes).
        image: PathBuf,

        /// JSON file with the raw NMS output for that image.
        detections: PathBuf,

        /// Directory to write aligned chips into.
        #[arg(long, default_value = "chips")]
        out_dir: PathBuf,

        /// Score threshold; detections are truncated at the first miss.
        #[arg(long, default_value_t = SCORE_THRESHOLD)]
        threshold: f32,

        /// Detector network input size (square).
        #[arg(long, default_value = "640")]
        network_size: u32,
    },
}

/// One frame of a recorded stream.
#[derive(Deserialize)]
struct FrameRecord {
    frame: u64,
    /// Capture time offset; defaults to 30 fps pacing when absent.
    #[serde(default)]
    time_ms: Option<u64>,
    detections: Vec<DetectionRecord>,
}

#[derive(Deserialize)]
struct DetectionRecord {
    #[serde(default = "untracked")]
    track_id: u64,
    /// `[left, top, width, height]` in source-image pixels.
    bbox: [f64; 4],
    score: f64,
    #[serde(default)]
    landmarks: Option<[f64; 10]>,
    #[serde(default)]
    class_id: i32,
    /// Inference stage: 1 = primary, 2 = secondary, 3 = tertiary.
    #[serde(default = "primary_component")]
    component_id: u8,
    #[serde(default)]
    parent_track_id: Option<u64>,
}

fn untracked() -> u64 {
    UNTRACKED_ID
}

fn primary_component() -> u8 {
    1
}

/// Raw NMS output for one image, as dumped by the detector harness.
#[derive(Deserialize)]
struct RawDetectionFile {
    num_detections: usize,
    boxes: Vec<f32>,
    scores: Vec<f32>,
    landmarks: Vec<f32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Replay {
            detections,
            min_face_size,
            pool_capacity,
            window_ms,
            full_frame,
        } => run_replay(
            &detections,
            min_face_size,
            pool_capacity,
            window_ms,
            full_frame,
        ),
        Command::Align {
            image,
            detections,
            out_dir,
            threshold,
            network_size,
        } => run_align(&image, &detections, &out_dir, threshold, network_size),
    }
}

fn run_replay(
    detections: &Path,
    min_face_size: f64,
    pool_capacity: usize,
    window_ms: u64,
    full_frame: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if pool_capacity == 0 {
        return Err("Pool capacity must be at least 1".into());
    }
    if window_ms == 0 {
        return Err("Window must be at least 1 ms".into());
    }

    let tracker = IdentityTracker::new(TrackerConfig {
        min_face_size,
        pool_capacity,
        pool_window: Duration::from_millis(window_ms),
    });
    let face_component = if full_frame {
        ComponentId::Primary
    } else {
        ComponentId::Secondary
    };
    let mut filter = FrameFilter::new(tracker, face_component);
    let mut logger = StdoutPipelineLogger::new();

    let base = Instant::now();
    let reader = BufReader::new(File::open(detections)?);
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {e}", line_number + 1))?;

        let parsed: Vec<Detection> = record
            .detections
            .iter()
            .map(to_detection)
            .collect::<Result<_, _>>()
            .map_err(|e| format!("line {}: {e}", line_number + 1))?;

        // Recorded capture times drive the flush window, not wall clock
        let offset = record.time_ms.unwrap_or(record.frame * 1000 / 30);
        let admission = filter.process(&parsed, record.frame, base + Duration::from_millis(offset));

        for det in &admission.admitted {
            println!("frame {}: admit track {}", record.frame, det.track_id);
        }
        logger.frame(record.frame, &admission);
    }

    logger.summary(filter.tracker().identity_count());
    println!(
        "{}",
        logger
            .summary_string(filter.tracker().identity_count())
            .unwrap_or_else(|| "No frames replayed".into())
    );
    Ok(())
}

fn to_detection(record: &DetectionRecord) -> Result<Detection, String> {
    let component_id = match record.component_id {
        1 => ComponentId::Primary,
        2 => ComponentId::Secondary,
        3 => ComponentId::Tertiary,
        other => return Err(format!("unknown component id {other}")),
    };
    let landmarks = match &record.landmarks {
        Some(values) => {
            let mut points = [(0.0, 0.0); 5];
            for (i, p) in points.iter_mut().enumerate() {
                *p = (values[i * 2], values[i * 2 + 1]);
            }
            FaceLandmarks::new(points)
        }
        None => FaceLandmarks::new([(0.0, 0.0); 5]),
    };
    Ok(Detection {
        track_id: record.track_id,
        bbox: BoundingBox {
            left: record.bbox[0],
            top: record.bbox[1],
            width: record.bbox[2],
            height: record.bbox[3],
        },
        score: record.score,
        landmarks,
        class_id: record.class_id,
        component_id,
        parent_track_id: record.parent_track_id,
    })
}

fn run_align(
    image_path: &Path,
    detections: &Path,
    out_dir: &Path,
    threshold: f32,
    network_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("Threshold must be between 0.0 and 1.0, got {threshold}").into());
    }
    if network_size == 0 {
        return Err("Network size must be positive".into());
    }

    let rgb = image::open(image_path)?.into_rgb8();
    let (width, height) = rgb.dimensions();
    let frame = SourceFrame::from_rgb(rgb.into_raw(), width, height)
        .ok_or("Image buffer size mismatch")?;

    let raw: RawDetectionFile = serde_json::from_reader(File::open(detections)?)?;
    let aligner = FaceAligner::new(AlignerConfig {
        network_input: (network_size, network_size),
        score_threshold: threshold,
        ..AlignerConfig::default()
    });
    let result = aligner.align_batch(
        &frame,
        raw.num_detections,
        &raw.boxes,
        &raw.scores,
        &raw.landmarks,
    )?;

    if is_placeholder(&result) {
        log::info!("No detections above threshold {threshold}");
        println!("No faces retained");
        return Ok(());
    }

    fs::create_dir_all(out_dir)?;
    for i in 0..result.len() {
        let path = out_dir.join(format!("chip_{i:03}.png"));
        write_chip(&result, i, &path)?;
        println!(
            "chip {i}: score {:.3}, box [{:.1}, {:.1}, {:.1}, {:.1}] -> {}",
            result.scores[i],
            result.boxes[[i, 0]],
            result.boxes[[i, 1]],
            result.boxes[[i, 2]],
            result.boxes[[i, 3]],
            path.display()
        );
    }
    log::info!("Wrote {} chips to {}", result.len(), out_dir.display());
    Ok(())
}

fn is_placeholder(result: &AlignmentResult) -> bool {
    result.len() == 1 && result.scores[0] == 0.0 && result.boxes.iter().all(|&v| v == 0.0)
}

/// Maps one chip back from [-1, 1] CHW to an 8-bit PNG.
fn write_chip(
    result: &AlignmentResult,
    index: usize,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = result.chips.shape()[2];
    let mut out = image::RgbImage::new(size as u32, size as u32);
    for y in 0..size {
        for x in 0..size {
            let mut rgb = [0u8; 3];
            for (c, value) in rgb.iter_mut().enumerate() {
                let v = (result.chips[[index, c, y, x]] * 0.5 + 0.5) * 255.0;
                *value = v.round().clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(x as u32, y as u32, image::Rgb(rgb));
        }
    }
    out.save(path)?;
    Ok(())
}
