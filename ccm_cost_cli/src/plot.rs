use std::cell::Cell;
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ccm_cost::{CostCategory, CostCurves};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use tracing::debug;

const CHART_SIZE: (u32, u32) = (1280, 760);

/// Matplotlib's default cycle, so the stacks read like the reference figures.
const CATEGORY_COLORS: [RGBColor; 7] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartKind::Png => "png",
            ChartKind::Svg => "svg",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chart {
    TotalCost,
    BreakdownPerM2,
    BreakdownPerKw,
}

impl Chart {
    pub const ALL: [Chart; 3] = [Chart::TotalCost, Chart::BreakdownPerM2, Chart::BreakdownPerKw];

    pub fn file_stem(&self) -> &'static str {
        match self {
            Chart::TotalCost => "total_cost",
            Chart::BreakdownPerM2 => "cost_breakdown_m2",
            Chart::BreakdownPerKw => "cost_breakdown_kw",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Chart::TotalCost => "Total Production Cost",
            Chart::BreakdownPerM2 => "Catalyst-Coated Membrane Production Cost (per m2)",
            Chart::BreakdownPerKw => "Catalyst-Coated Membrane Production Cost (per kW)",
        }
    }

    pub fn path_in(&self, dir: &Path, kind: ChartKind) -> PathBuf {
        dir.join(format!("{}.{}", self.file_stem(), kind.extension()))
    }
}

/// Render one chart, turning backend errors and panics into a message for the caller to log.
pub fn render_chart_guard(
    curves: &CostCurves,
    chart: Chart,
    path: &Path,
    kind: ChartKind,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_chart(curves, chart, path, kind).map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_chart(curves: &CostCurves, chart: Chart, path: &Path, kind: ChartKind) -> Result<()> {
    if curves.is_empty() {
        return Ok(());
    }
    match kind {
        ChartKind::Png => {
            let backend = BitMapBackend::new(path, CHART_SIZE);
            draw(FontSafeBackend::new(backend).into_drawing_area(), curves, chart)
        }
        ChartKind::Svg => {
            let backend = SVGBackend::new(path, CHART_SIZE);
            draw(FontSafeBackend::new(backend).into_drawing_area(), curves, chart)
        }
    }
}

fn draw<DB>(root: DrawingArea<DB, Shift>, curves: &CostCurves, chart: Chart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    match chart {
        Chart::TotalCost => draw_total_chart(root, curves, chart.title()),
        Chart::BreakdownPerM2 => draw_breakdown_chart(root, curves, chart.title()),
        Chart::BreakdownPerKw => draw_breakdown_chart(root, &curves.per_kw(), chart.title()),
    }
}

fn x_range(curves: &CostCurves) -> (f64, f64) {
    let x_min = curves.units.first().copied().unwrap_or(0.0);
    let mut x_max = curves.units.last().copied().unwrap_or(1.0);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    (x_min, x_max)
}

fn y_max(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    if !max.is_finite() || max <= 0.0 {
        1.0
    } else {
        max * 1.05
    }
}

fn draw_total_chart<DB>(root: DrawingArea<DB, Shift>, curves: &CostCurves, title: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_min, x_max) = x_range(curves);
    let y_top = y_max(curves.total.as_slice().unwrap_or(&[]));

    let area = root;
    area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&area)
        .margin(25)
        .caption(title, FontDesc::new(FontFamily::SansSerif, 26.0, FontStyle::Normal))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_min..x_max, 0.0..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Production Size (Units/Year)")
        .y_desc(format!("Cost of Production ({})", curves.unit.label()))
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .label_style(FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal))
        .draw()?;

    let style = ShapeStyle {
        color: CATEGORY_COLORS[0].to_rgba(),
        filled: false,
        stroke_width: 2,
    };
    chart.draw_series(LineSeries::new(
        curves.units.iter().copied().zip(curves.total.iter().copied()),
        style,
    ))?;

    area.present()?;
    Ok(())
}

fn draw_breakdown_chart<DB>(
    root: DrawingArea<DB, Shift>,
    curves: &CostCurves,
    title: &str,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_min, x_max) = x_range(curves);
    let layers = curves.cumulative();
    let top = layers.last().and_then(|l| l.as_slice()).unwrap_or(&[]);
    let y_top = y_max(top);

    let area = root;
    area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&area)
        .margin(25)
        .caption(title, FontDesc::new(FontFamily::SansSerif, 26.0, FontStyle::Normal))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_min..x_max, 0.0..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Production Size (Units/Year)")
        .y_desc(format!("Cost of Production ({})", curves.unit.label()))
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .label_style(FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal))
        .draw()?;

    let xs: Vec<f64> = curves.units.to_vec();
    let zeros = vec![0.0; xs.len()];
    for (idx, category) in CostCategory::ALL.iter().enumerate() {
        let upper = layers[idx].to_vec();
        let lower = if idx == 0 {
            zeros.clone()
        } else {
            layers[idx - 1].to_vec()
        };
        // Band between this layer and the one below: along the top, back along the bottom.
        let mut band: Vec<(f64, f64)> = xs.iter().copied().zip(upper).collect();
        band.extend(xs.iter().copied().zip(lower).rev());

        let color = CATEGORY_COLORS[idx % CATEGORY_COLORS.len()];
        chart
            .draw_series(std::iter::once(Polygon::new(band, color.filled())))?
            .label(category.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 18, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .label_font(FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    area.present()?;
    Ok(())
}

/// Wraps a backend so a host without usable system fonts still gets the plot, just
/// without text.
struct FontSafeBackend<DB> {
    inner: DB,
    fonts_missing: Cell<bool>,
}

impl<DB> FontSafeBackend<DB> {
    fn new(inner: DB) -> Self {
        Self {
            inner,
            fonts_missing: Cell::new(false),
        }
    }

    fn mark_fonts_missing(&self, reason: &str) {
        if !self.fonts_missing.replace(true) {
            debug!("Dropping chart text, fonts unavailable: {}", reason);
        }
    }
}

impl<DB: DrawingBackend> DrawingBackend for FontSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        if self.fonts_missing.get() {
            return Ok(());
        }
        let inner = &mut self.inner;
        match panic::catch_unwind(panic::AssertUnwindSafe(|| inner.draw_text(text, style, pos))) {
            Ok(Err(DrawingErrorKind::FontError(err))) => {
                self.mark_fonts_missing(&err.to_string());
                Ok(())
            }
            Ok(result) => result,
            Err(_) => {
                self.mark_fonts_missing("font backend panicked");
                Ok(())
            }
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        if !self.fonts_missing.get() {
            match panic::catch_unwind(panic::AssertUnwindSafe(|| {
                self.inner.estimate_text_size(text, style)
            })) {
                Ok(Err(DrawingErrorKind::FontError(err))) => {
                    self.mark_fonts_missing(&err.to_string())
                }
                Ok(result) => return result,
                Err(_) => self.mark_fonts_missing("font backend panicked"),
            }
        }
        // Rough sans-serif metrics keep the layout sane once text is dropped.
        let size = style.size().max(1.0);
        let width = text.chars().count() as f64 * size * 0.6;
        Ok((width.ceil() as u32, size.ceil() as u32))
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }
}
