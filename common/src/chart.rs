//! Thin layer over `plotters` for the figures drawn by the plots: a titled
//! bitmap figure split into panels, line series with legends, and the few
//! overlays (spans, markers, arrows) the phase charts need.

use std::{ops::Range, path::Path};

use eyre::Result;
use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
    series::DashedLineSeries,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::config::Settings;

#[macro_export]
macro_rules! hexcolour {
    ($colour:literal) => {
        ::plotters::style::RGBColor(
            (($colour & 0xFF0000) >> 16) as u8,
            (($colour & 0x00FF00) >> 8) as u8,
            ($colour & 0x0000FF) as u8,
        )
    };
}

pub const GREY: RGBColor = hexcolour!(0x808080);
pub const ORANGE: RGBColor = hexcolour!(0xFFA500);

/// Line advance for multi-line labels, relative to the font size
const LINE_SPACING: f64 = 1.3;
/// Pixels between an arrow tail and its label
const LABEL_GAP: i32 = 4;

pub type Figure<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
pub type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Solid,
    /// Solid line with a filled circle on every point
    Markers,
    /// Dashed line drawn at reduced opacity
    Dashed,
}

/// One labelled series in a panel.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub colour: RGBColor,
    pub kind: LineKind,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, colour: RGBColor, kind: LineKind) -> Self {
        Self {
            label: label.into(),
            colour,
            kind,
            points: Vec::new(),
        }
    }

    pub fn with_points(mut self, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        self.points = points.into_iter().collect();
        self
    }
}

/// Creates the white bitmap for `path` and returns the area below the title.
pub fn figure<'a>(path: &'a Path, settings: &Settings, title: &str) -> Result<Figure<'a>> {
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled(
        title,
        (settings.font_family.as_str(), settings.title_font_size)
            .into_font()
            .style(FontStyle::Bold),
    )?;
    Ok(body)
}

/// Builds an empty panel with mesh, axis descriptions and optional caption.
pub fn panel<'a, 'b>(
    area: &'a Figure<'b>,
    settings: &Settings,
    caption: Option<&str>,
    x_range: Range<f64>,
    y_range: Range<f64>,
    x_desc: &str,
    y_desc: &str,
) -> Result<Chart<'a, 'b>> {
    let font = settings.font_family.as_str();
    let mut builder = ChartBuilder::on(area);
    builder
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90);
    if let Some(caption) = caption {
        builder.caption(caption, (font, settings.caption_font_size));
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style((font, settings.label_font_size))
        .label_style((font, settings.label_font_size))
        .bold_line_style(BLACK.mix(0.3).stroke_width(1))
        .light_line_style(BLACK.mix(0.08).stroke_width(1))
        .draw()?;
    Ok(chart)
}

pub fn draw_series(chart: &mut Chart<'_, '_>, series: &Series, settings: &Settings) -> Result<()> {
    let colour = series.colour;
    let width = settings.line_width;
    match series.kind {
        LineKind::Solid | LineKind::Markers => {
            chart
                .draw_series(LineSeries::new(
                    series.points.iter().copied(),
                    colour.stroke_width(width),
                ))?
                .label(series.label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(width))
                });
            if series.kind == LineKind::Markers {
                let size = settings.marker_size;
                chart.draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| Circle::new(p, size, colour.filled())),
                )?;
            }
        }
        LineKind::Dashed => {
            let style = colour.mix(0.5).stroke_width(width);
            chart
                .draw_series(DashedLineSeries::new(
                    series.points.iter().copied(),
                    10,
                    6,
                    style,
                ))?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }
    Ok(())
}

pub fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>, settings: &Settings) -> Result<()> {
    chart
        .configure_series_labels()
        .label_font((settings.font_family.as_str(), settings.label_font_size))
        .background_style(WHITE.mix(0.8).filled())
        .border_style(BLACK.stroke_width(1))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    Ok(())
}

/// Shades `[start, end]` across the whole y-range of the panel.
pub fn draw_span(
    chart: &mut Chart<'_, '_>,
    start: f64,
    end: f64,
    colour: RGBColor,
    opacity: f64,
) -> Result<()> {
    let y = chart.y_range();
    chart.plotting_area().draw(&Rectangle::new(
        [(start, y.start), (end, y.end)],
        colour.mix(opacity).filled(),
    ))?;
    Ok(())
}

/// Dashed vertical marker at `x` with a rotated label near the top of the
/// panel, ending at the marker.
pub fn draw_vline(
    chart: &mut Chart<'_, '_>,
    x: f64,
    label: &str,
    settings: &Settings,
) -> Result<()> {
    let y = chart.y_range();
    chart.draw_series(DashedLineSeries::new(
        [(x, y.start), (x, y.end)],
        8,
        6,
        GREY.mix(0.5).stroke_width(1),
    ))?;

    let top = y.end - (y.end - y.start) * 0.05;
    chart.plotting_area().draw(&Text::new(
        label.to_owned(),
        (x, top),
        marker_label_style(settings),
    ))?;
    Ok(())
}

fn marker_label_style(settings: &Settings) -> TextStyle<'_> {
    (settings.font_family.as_str(), settings.label_font_size)
        .into_font()
        .transform(FontTransform::Rotate90)
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Top))
}

fn annotation_style<'a>(settings: &'a Settings, colour: &RGBColor) -> TextStyle<'a> {
    (settings.font_family.as_str(), settings.label_font_size)
        .into_font()
        .color(colour)
        .pos(Pos::new(HPos::Right, VPos::Top))
}

/// Arrow from `from` to `to` (both in data coordinates). The text block is
/// right-aligned and hangs below the tail, away from the arrow.
pub fn draw_annotation(
    chart: &mut Chart<'_, '_>,
    from: (f64, f64),
    to: (f64, f64),
    lines: &[String],
    colour: RGBColor,
    settings: &Settings,
) -> Result<()> {
    let area = chart.plotting_area().strip_coord_spec();
    let (base_x, base_y) = area.get_base_pixel();
    let relative = |(px, py): (i32, i32)| (px - base_x, py - base_y);
    let tail = relative(chart.backend_coord(&from));
    let tip = relative(chart.backend_coord(&to));

    area.draw(&PathElement::new(vec![tail, tip], colour.stroke_width(2)))?;
    if let Some(head) = arrow_head(tail, tip, 14.0, 6.0) {
        area.draw(&Polygon::new(head.to_vec(), colour.filled()))?;
    }

    let style = annotation_style(settings, &colour);
    let min_height = (settings.label_font_size * LINE_SPACING).ceil() as i32;
    let heights = lines
        .iter()
        .map(|line| {
            area.estimate_text_size(line, &style)
                .map(|(_, h)| (h as i32).max(min_height))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let anchor = (tail.0 - LABEL_GAP, tail.1 + LABEL_GAP);
    for (line, pos) in lines.iter().zip(stack_lines(anchor, &heights)) {
        area.draw(&Text::new(line.clone(), pos, style.clone()))?;
    }
    Ok(())
}

/// Top anchor of each line of a text block starting at `anchor` and growing
/// downwards.
fn stack_lines(anchor: (i32, i32), heights: &[i32]) -> Vec<(i32, i32)> {
    heights
        .iter()
        .scan(anchor.1, |y, h| {
            let top = *y;
            *y += h;
            Some((anchor.0, top))
        })
        .collect()
}

/// Triangle for an arrow pointing at `tip`, or `None` when the arrow has no length.
fn arrow_head(
    tail: (i32, i32),
    tip: (i32, i32),
    length: f64,
    half_width: f64,
) -> Option<[(i32, i32); 3]> {
    let dx = (tip.0 - tail.0) as f64;
    let dy = (tip.1 - tail.1) as f64;
    let len = dx.hypot(dy);
    if len < 1.0 {
        return None;
    }
    let (ux, uy) = (dx / len, dy / len);
    let bx = tip.0 as f64 - ux * length;
    let by = tip.1 as f64 - uy * length;
    Some([
        tip,
        ((bx - uy * half_width).round() as i32, (by + ux * half_width).round() as i32),
        ((bx + uy * half_width).round() as i32, (by - ux * half_width).round() as i32),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexcolour_splits_channels() {
        assert_eq!(hexcolour!(0xFF6347), RGBColor(0xFF, 0x63, 0x47));
        assert_eq!(GREY, RGBColor(128, 128, 128));
    }

    #[test]
    fn arrow_head_points_at_tip() {
        let head = arrow_head((0, 0), (100, 0), 10.0, 5.0).unwrap();
        assert_eq!(head[0], (100, 0));
        assert_eq!(head[1], (90, 5));
        assert_eq!(head[2], (90, -5));
        assert!(arrow_head((3, 3), (3, 3), 10.0, 5.0).is_none());
    }

    #[test]
    fn labels_are_right_aligned() {
        let settings = Settings::default();
        let right_top = Pos::new(HPos::Right, VPos::Top);
        assert_eq!(marker_label_style(&settings).pos, right_top);
        assert_eq!(annotation_style(&settings, &RED).pos, right_top);
    }

    #[test]
    fn stacked_lines_do_not_overlap() {
        let heights = [21, 25];
        let tops = stack_lines((200, 50), &heights);
        assert_eq!(tops, vec![(200, 50), (200, 71)]);
        for (pair, h) in tops.windows(2).zip(heights) {
            assert!(pair[1].1 >= pair[0].1 + h);
        }
        assert!(tops.iter().all(|&(_, y)| y >= 50));
        assert!(stack_lines((0, 0), &[]).is_empty());
    }

    #[test]
    fn series_builder_collects_points() {
        let series = Series::new("Throughput", BLUE, LineKind::Solid)
            .with_points([(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.label, "Throughput");
    }
}
