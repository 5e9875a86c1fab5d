// Line chart rendering of a price series into a PNG artifact

mod canvas;

use image::{Rgb, RgbImage};
use shared::models::ChartArtifact;
use shared::utils::millis_to_datetime;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::analysis::to_finite_array;
use crate::config::{ChartBackend, ChartSettings};
use crate::error::EngineError;

pub use canvas::PlotArea;

pub const FILENAME_STEM: &str = "price_chart";
pub const DATE_AXIS_LABEL: &str = "date";
pub const INDEX_AXIS_LABEL: &str = "time index";
pub const Y_AXIS_LABEL: &str = "price";
const MIN_POINTS: usize = 2;
const MAX_NAME_ATTEMPTS: usize = 8;
const METERS_PER_INCH: f64 = 0.0254;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// X axis chosen for a render.
#[derive(Debug, Clone, PartialEq)]
enum XAxis {
    Dates { first_ms: i64, last_ms: i64 },
    Index { last: usize },
}

impl XAxis {
    fn label(&self) -> &'static str {
        match self {
            XAxis::Dates { .. } => DATE_AXIS_LABEL,
            XAxis::Index { .. } => INDEX_AXIS_LABEL,
        }
    }

    /// Text under the left and right ends of the x axis.
    fn end_ticks(&self) -> (String, String) {
        match self {
            XAxis::Dates { first_ms, last_ms } => {
                let pattern = if last_ms - first_ms < 2 * MILLIS_PER_DAY {
                    "%Y-%m-%d %H:%M"
                } else {
                    "%Y-%m-%d"
                };
                let fmt = |ms: i64| {
                    millis_to_datetime(ms)
                        .map(|dt| dt.format(pattern).to_string())
                        .unwrap_or_default()
                };
                (fmt(*first_ms), fmt(*last_ms))
            }
            XAxis::Index { last } => ("0".to_string(), last.to_string()),
        }
    }
}

/// Renders price series to PNG files. Every instance carries its own
/// settings, including the output backend.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    settings: ChartSettings,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(ChartSettings::default())
    }
}

impl ChartRenderer {
    pub fn new(settings: ChartSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    /// Plots `prices` as a single line and writes one new PNG under `out_dir`.
    ///
    /// Timestamps (milliseconds) drive a date axis only when their count equals
    /// the count of `prices` as given; otherwise points are placed by position.
    /// Low data and write failures come back as [`ChartArtifact::Skipped`].
    pub fn plot_prices_png(
        &self,
        timestamps_ms: Option<&[i64]>,
        prices: &[f64],
        title: &str,
        out_dir: &Path,
    ) -> ChartArtifact {
        if let Err(e) = fs::create_dir_all(out_dir) {
            tracing::error!(dir = %out_dir.display(), error = %e, "Cannot create chart output directory");
            return ChartArtifact::skipped(format!(
                "cannot create output directory '{}': {}",
                out_dir.display(),
                e
            ));
        }

        let finite = to_finite_array(prices).len();
        if finite < MIN_POINTS {
            tracing::warn!(points = finite, "Too few points to plot");
            return ChartArtifact::skipped(format!("too few points to plot (minimum: {})", MIN_POINTS));
        }

        let (axis, points) = select_axis(timestamps_ms, prices);
        let image = self.rasterize(&points, title, &axis);

        match self.write_png(&image, title, &axis, out_dir) {
            Ok((filename, file_path)) => {
                tracing::info!(path = %file_path.display(), axis = axis.label(), "Chart written");
                ChartArtifact::Rendered { filename, file_path }
            }
            Err(e) => {
                tracing::error!(dir = %out_dir.display(), error = %e, "Chart could not be written");
                ChartArtifact::skipped(format!("chart could not be written: {}", e))
            }
        }
    }

    fn rasterize(&self, points: &[(f64, f64)], title: &str, axis: &XAxis) -> RgbImage {
        let s = &self.settings;
        let mut img = RgbImage::from_pixel(s.width, s.height, Rgb(s.background));
        let area = PlotArea::for_canvas(s.width, s.height, points);
        canvas::draw_grid(&mut img, &area, 5, canvas::GRID);
        canvas::draw_frame(&mut img, &area, canvas::AXIS);

        let stroke = (s.dpi / 100).max(1);
        for pair in points.windows(2) {
            let (x0, y0) = area.to_pixel(pair[0]);
            let (x1, y1) = area.to_pixel(pair[1]);
            canvas::draw_segment(&mut img, (x0, y0), (x1, y1), stroke, Rgb(s.line_color));
        }

        self.annotate(&mut img, &area, points, title, axis);
        img
    }

    // Title above the plot, end ticks and axis labels around it.
    fn annotate(&self, img: &mut RgbImage, area: &PlotArea, points: &[(f64, f64)], title: &str, axis: &XAxis) {
        let title_scale = (self.settings.height / 200).max(1);
        let label_scale = title_scale.saturating_sub(1).max(1);
        let line = i64::from(canvas::GLYPH * label_scale);
        let gap = i64::from(2 * label_scale);
        let (left, right) = (i64::from(area.left), i64::from(area.right));
        let (top, bottom) = (i64::from(area.top), i64::from(area.bottom));

        let title_w = i64::from(canvas::text_width(title, title_scale));
        let title_h = i64::from(canvas::GLYPH * title_scale);
        let title_x = (i64::from(self.settings.width) - title_w) / 2;
        canvas::draw_text(img, title_x.max(0), ((top - title_h) / 2).max(0), title, title_scale, canvas::TEXT);

        let (first, last) = axis.end_ticks();
        let tick_y = bottom + gap;
        canvas::draw_text(img, left, tick_y, &first, label_scale, canvas::TEXT);
        let last_w = i64::from(canvas::text_width(&last, label_scale));
        canvas::draw_text(img, right - last_w, tick_y, &last, label_scale, canvas::TEXT);

        let x_label = axis.label();
        let x_label_w = i64::from(canvas::text_width(x_label, label_scale));
        canvas::draw_text(
            img,
            (left + right - x_label_w) / 2,
            tick_y + line + gap,
            x_label,
            label_scale,
            canvas::TEXT,
        );

        let (low, high) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
        if low.is_finite() && high.is_finite() {
            let x_ref = points.first().map(|p| p.0).unwrap_or_default();
            for value in [low, high] {
                let text = format_price(value);
                let (_, y) = area.to_pixel((x_ref, value));
                let w = i64::from(canvas::text_width(&text, label_scale));
                canvas::draw_text(img, left - gap - w, y - line / 2, &text, label_scale, canvas::TEXT);
            }
        }

        let y_label_w = i64::from(canvas::text_width(Y_AXIS_LABEL, label_scale));
        canvas::draw_text_vertical(img, gap, (top + bottom + y_label_w) / 2, Y_AXIS_LABEL, label_scale, canvas::TEXT);
    }

    fn write_png(
        &self,
        img: &RgbImage,
        title: &str,
        axis: &XAxis,
        out_dir: &Path,
    ) -> Result<(String, PathBuf), EngineError> {
        let (filename, file_path, file) = create_unique_file(out_dir)?;
        let written = match self.settings.backend {
            ChartBackend::HeadlessPng => self.encode(file, img, title, axis),
        };
        if let Err(e) = written {
            // Leave no truncated image behind.
            let _ = fs::remove_file(&file_path);
            return Err(e);
        }
        Ok((filename, file_path))
    }

    fn encode(&self, file: File, img: &RgbImage, title: &str, axis: &XAxis) -> Result<(), EngineError> {
        let mut out = BufWriter::new(file);
        let mut encoder = png::Encoder::new(&mut out, img.width(), img.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let ppm = (f64::from(self.settings.dpi) / METERS_PER_INCH).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));

        encoder.add_text_chunk("Title".to_string(), latin1(title))?;
        encoder.add_text_chunk("X-Label".to_string(), axis.label().to_string())?;
        encoder.add_text_chunk("Y-Label".to_string(), Y_AXIS_LABEL.to_string())?;
        if let XAxis::Dates { first_ms, last_ms } = axis {
            if let (Some(first), Some(last)) = (millis_to_datetime(*first_ms), millis_to_datetime(*last_ms)) {
                encoder.add_text_chunk(
                    "Period".to_string(),
                    format!("{} / {}", first.to_rfc3339(), last.to_rfc3339()),
                )?;
            }
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
        writer.finish()?;
        // A failed flush (full disk) must not pass for a written chart.
        out.flush()?;
        Ok(())
    }
}

/// Renders with default settings.
pub fn plot_prices_png(
    timestamps_ms: Option<&[i64]>,
    prices: &[f64],
    title: &str,
    out_dir: &Path,
) -> ChartArtifact {
    ChartRenderer::default().plot_prices_png(timestamps_ms, prices, title, out_dir)
}

/// `price_chart_<8 hex>.png`
pub fn random_filename() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}.png", FILENAME_STEM, &token[..8])
}

// Draws fresh names until one does not exist yet; never overwrites.
fn create_unique_file(out_dir: &Path) -> Result<(String, PathBuf, File), EngineError> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let filename = random_filename();
        let path = out_dir.join(&filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((filename, path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(%filename, "Chart filename taken, drawing another");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(EngineError::ChartError(format!(
        "no free chart filename after {} attempts",
        MAX_NAME_ATTEMPTS
    )))
}

// Pairs each finite price with its x coordinate. Timestamps and prices are
// cleaned together so the axes stay aligned.
fn select_axis(timestamps_ms: Option<&[i64]>, prices: &[f64]) -> (XAxis, Vec<(f64, f64)>) {
    if let Some(ts) = timestamps_ms.filter(|ts| !ts.is_empty() && ts.len() == prices.len()) {
        let pairs: Vec<(i64, f64)> = ts
            .iter()
            .copied()
            .zip(prices.iter().copied())
            .filter(|(_, p)| p.is_finite())
            .collect();
        let convertible = pairs.iter().all(|(t, _)| millis_to_datetime(*t).is_some());
        if convertible {
            let first_ms = pairs.iter().map(|(t, _)| *t).min().unwrap_or_default();
            let last_ms = pairs.iter().map(|(t, _)| *t).max().unwrap_or_default();
            let points = pairs.into_iter().map(|(t, p)| (t as f64, p)).collect();
            return (XAxis::Dates { first_ms, last_ms }, points);
        }
        tracing::warn!("Timestamps outside the calendar range, plotting by position");
    }

    let points: Vec<(f64, f64)> = to_finite_array(prices)
        .into_iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p))
        .collect();
    let last = points.len().saturating_sub(1);
    (XAxis::Index { last }, points)
}

fn format_price(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else if value.abs() >= 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    }
}

fn latin1(text: &str) -> String {
    text.chars().map(|c| if (c as u32) < 0x100 { c } else { '?' }).collect()
}
